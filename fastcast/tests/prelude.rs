//! Facade smoke test: the prelude alone is enough to wire a feed from
//! delivery to decoded messages.

use bytes::Bytes;
use fastcast::prelude::*;

#[test]
fn prelude_covers_end_to_end_wiring() {
    let mut registry = TemplateRegistry::new();
    registry
        .register(Template::new(
            5,
            "Heartbeat",
            vec![Instruction::Field(
                FieldInstruction::new("interval", PrimitiveType::UInt64).with_operator(
                    OperatorSpec::new(Operator::Default).with_initial(InitialValue::UInt(30)),
                ),
            )],
        ))
        .unwrap();

    let mut encoder = Encoder::new();
    encoder.encode_pmap(&[true, false]);
    encoder.encode_uint(5);
    let message = encoder.finish();
    let mut packet = (message.len() as u16).to_be_bytes().to_vec();
    packet.extend(message);

    let (tx, rx) = buffer_queue();
    let mut service = PacketDecodeService::new(
        Decoder::new(registry.into_shared()),
        Box::new(NoHeader),
        Box::new(FixedSizeHeader::new(HeaderConfig::new(2, true))),
        rx,
    );

    tx.send(Bytes::from(packet)).unwrap();
    drop(tx);

    let mut collector = MessageCollector::new();
    service.run(&mut collector).unwrap();

    assert_eq!(collector.messages().len(), 1);
    assert_eq!(
        collector.messages()[0]
            .get("interval")
            .unwrap()
            .as_u64()
            .unwrap(),
        30
    );
    assert!(collector.stopped());
}
