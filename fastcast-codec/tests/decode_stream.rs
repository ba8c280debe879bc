//! End-to-end decode scenarios: framed blocks of operator-compressed
//! market-data messages driven through the header analyzer and the
//! template-driven decoder.

use fastcast_codec::header::{Analysis, FixedSizeHeader, HeaderAnalyzer, HeaderConfig};
use fastcast_codec::{Decoder, Encoder};
use fastcast_core::{BufferSource, ByteSource, Fetch, MessageCollector};
use fastcast_templates::{
    FieldInstruction, InitialValue, Instruction, Operator, OperatorSpec, PrimitiveType,
    SequenceInstruction, Template, TemplateRegistry,
};
use std::sync::Arc;

/// An incremental-refresh style template: copy-compressed symbol, delta
/// sequence number, default venue, decimal price, sized book levels.
fn incremental_template() -> Template {
    Template::new(
        11,
        "MDIncremental",
        vec![
            Instruction::Field(
                FieldInstruction::new("seq", PrimitiveType::UInt64)
                    .with_operator(OperatorSpec::new(Operator::Delta)),
            ),
            Instruction::Field(
                FieldInstruction::new("symbol", PrimitiveType::Ascii)
                    .with_operator(OperatorSpec::new(Operator::Copy)),
            ),
            Instruction::Field(
                FieldInstruction::new("venue", PrimitiveType::Ascii).with_operator(
                    OperatorSpec::new(Operator::Default)
                        .with_initial(InitialValue::Text("XOFF".to_string())),
                ),
            ),
            Instruction::Field(FieldInstruction::new("price", PrimitiveType::Decimal)),
            Instruction::Sequence(SequenceInstruction::new(
                "levels",
                vec![
                    Instruction::Field(FieldInstruction::new("px", PrimitiveType::Decimal)),
                    Instruction::Field(FieldInstruction::new("qty", PrimitiveType::UInt64)),
                ],
            )),
        ],
    )
}

fn registry() -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    registry.register(incremental_template()).unwrap();
    registry.into_shared()
}

struct Update {
    seq_delta: i64,
    symbol: Option<&'static str>, // None reuses the previous symbol
    venue: Option<&'static str>,  // None takes the template default
    price: (i64, i32),
    levels: Vec<((i64, i32), u64)>,
}

fn encode_update(encoder: &mut Encoder, carry_template_id: bool, update: &Update) {
    encoder.encode_pmap(&[
        carry_template_id,
        update.symbol.is_some(),
        update.venue.is_some(),
    ]);
    if carry_template_id {
        encoder.encode_uint(11);
    }
    encoder.encode_int(update.seq_delta);
    if let Some(symbol) = update.symbol {
        encoder.encode_ascii(symbol);
    }
    if let Some(venue) = update.venue {
        encoder.encode_ascii(venue);
    }
    encoder.encode_decimal(update.price.0, update.price.1);
    encoder.encode_uint(update.levels.len() as u64);
    for ((mantissa, exponent), qty) in &update.levels {
        encoder.encode_pmap(&[]);
        encoder.encode_decimal(*mantissa, *exponent);
        encoder.encode_uint(*qty);
    }
}

fn sample_feed() -> Vec<u8> {
    let mut encoder = Encoder::new();
    encode_update(
        &mut encoder,
        true,
        &Update {
            seq_delta: 100,
            symbol: Some("EURUSD"),
            venue: None,
            price: (108250, -5),
            levels: vec![((108249, -5), 1_000_000), ((108248, -5), 2_500_000)],
        },
    );
    encode_update(
        &mut encoder,
        false,
        &Update {
            seq_delta: 1,
            symbol: None,
            venue: Some("EBS"),
            price: (108251, -5),
            levels: vec![],
        },
    );
    encode_update(
        &mut encoder,
        false,
        &Update {
            seq_delta: 1,
            symbol: Some("USDJPY"),
            venue: None,
            price: (1573125, -4),
            levels: vec![((1573120, -4), 3_000_000)],
        },
    );
    encoder.finish()
}

#[test]
fn decodes_operator_compressed_feed() {
    let mut decoder = Decoder::new(registry());
    let mut collector = MessageCollector::new();

    let feed = sample_feed();
    let count = decoder.decode_each(&feed, &mut collector, 0).unwrap();
    assert_eq!(count, 3);

    let messages = collector.into_messages();

    let seqs: Vec<u64> = messages
        .iter()
        .map(|m| m.get("seq").unwrap().as_u64().unwrap())
        .collect();
    assert_eq!(seqs, vec![100, 101, 102]);

    let symbols: Vec<&str> = messages
        .iter()
        .map(|m| m.get("symbol").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(symbols, vec!["EURUSD", "EURUSD", "USDJPY"]);

    let venues: Vec<&str> = messages
        .iter()
        .map(|m| m.get("venue").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(venues, vec!["XOFF", "EBS", "XOFF"]);

    let first_levels = messages[0].get("levels").unwrap().as_sequence().unwrap();
    assert_eq!(first_levels.len(), 2);
    assert_eq!(
        first_levels
            .get(1)
            .unwrap()
            .get("qty")
            .unwrap()
            .as_u64()
            .unwrap(),
        2_500_000
    );
    assert!(
        messages[1]
            .get("levels")
            .unwrap()
            .as_sequence()
            .unwrap()
            .is_empty()
    );
}

#[test]
fn decimal_survives_encode_decode_round_trip() {
    let template = Template::new(
        1,
        "Px",
        vec![Instruction::Field(FieldInstruction::new(
            "price",
            PrimitiveType::Decimal,
        ))],
    );
    let mut registry = TemplateRegistry::new();
    registry.register(template).unwrap();
    let mut decoder = Decoder::new(registry.into_shared());

    let mut encoder = Encoder::new();
    encoder.encode_pmap(&[true]);
    encoder.encode_uint(1);
    encoder.encode_decimal(12345, -2);
    let data = encoder.finish();

    let mut collector = MessageCollector::new();
    let mut offset = 0;
    decoder
        .decode_message(&data, &mut offset, &mut collector)
        .unwrap();

    let messages = collector.into_messages();
    let price = messages[0].get("price").unwrap().as_decimal().unwrap();
    assert_eq!((price.mantissa, price.exponent), (12345, -2));
    assert_eq!(price.to_decimal().unwrap().to_string(), "123.45");
}

#[test]
fn framed_blocks_decode_identically_to_unframed() {
    let config = HeaderConfig::new(2, true).with_prefix(1).with_suffix(1);
    let feed = sample_feed();

    // Frame the whole feed as one block.
    let mut framed = vec![0xAA];
    framed.extend((feed.len() as u16).to_be_bytes());
    framed.push(0xBB);
    framed.extend_from_slice(&feed);

    let mut analyzer = FixedSizeHeader::new(config);
    let mut source = BufferSource::new(framed);
    let Analysis::Header { block_size, skip } = analyzer.analyze(&mut source).unwrap() else {
        panic!("expected a complete header");
    };
    assert!(!skip);
    assert_eq!(block_size, feed.len());

    let block = source.take(block_size).unwrap();
    assert_eq!(source.next_byte().unwrap(), Fetch::End);

    let mut decoder = Decoder::new(registry());
    let mut collector = MessageCollector::new();
    decoder.decode_each(&block, &mut collector, 0).unwrap();
    assert_eq!(collector.messages().len(), 3);
}

#[test]
fn strict_and_tolerant_modes_differ_on_overlong_encodings() {
    let template = Template::new(
        2,
        "Seq",
        vec![Instruction::Field(FieldInstruction::new(
            "seq",
            PrimitiveType::UInt64,
        ))],
    );
    let mut registry = TemplateRegistry::new();
    registry.register(template).unwrap();
    let registry = registry.into_shared();

    // Overlong unsigned: 0x00 0x81 encodes 1 in two bytes.
    let mut encoder = Encoder::new();
    encoder.encode_pmap(&[true]);
    encoder.encode_uint(2);
    let mut data = encoder.finish();
    data.extend_from_slice(&[0x00, 0x81]);

    let mut strict = Decoder::new(Arc::clone(&registry));
    let mut collector = MessageCollector::new();
    let mut offset = 0;
    assert!(
        strict
            .decode_message(&data, &mut offset, &mut collector)
            .is_err()
    );

    let mut tolerant = Decoder::new(registry).with_strict(false);
    let mut collector = MessageCollector::new();
    let mut offset = 0;
    tolerant
        .decode_message(&data, &mut offset, &mut collector)
        .unwrap();
    assert_eq!(
        collector.messages()[0].get("seq").unwrap().as_u64().unwrap(),
        1
    );
}
