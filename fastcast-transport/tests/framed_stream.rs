//! Transport-level scenarios: async block framing feeding the decoder, and
//! multi-threaded receiver-to-decoder hand-off.

use bytes::Bytes;
use fastcast_codec::header::{FixedSizeHeader, HeaderConfig};
use fastcast_codec::{Decoder, Encoder};
use fastcast_core::MessageCollector;
use fastcast_templates::{
    FieldInstruction, Instruction, Operator, OperatorSpec, PrimitiveType, Template,
    TemplateRegistry,
};
use fastcast_transport::{BlockCodec, PacketDecodeService, StreamDecodeService, buffer_queue};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::Decoder as _;

/// Reads a socket-like stream in small chunks and frames it with the codec.
async fn collect_frames(
    mut reader: tokio::io::DuplexStream,
    mut codec: BlockCodec,
) -> Vec<Bytes> {
    let mut accumulated = bytes::BytesMut::new();
    let mut frames = Vec::new();
    let mut chunk = [0u8; 16];
    loop {
        let read = reader.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        accumulated.extend_from_slice(&chunk[..read]);
        while let Some(frame) = codec.decode(&mut accumulated).unwrap() {
            frames.push(frame.freeze());
        }
    }
    frames
}

fn trade_registry() -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    registry
        .register(Template::new(
            21,
            "Trade",
            vec![
                Instruction::Field(
                    FieldInstruction::new("seq", PrimitiveType::UInt64)
                        .with_operator(OperatorSpec::new(Operator::Increment)),
                ),
                Instruction::Field(FieldInstruction::new("px", PrimitiveType::Decimal)),
            ],
        ))
        .unwrap();
    registry.into_shared()
}

fn encode_trade(seq: Option<u64>, mantissa: i64, exponent: i32) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.encode_pmap(&[true, seq.is_some()]);
    encoder.encode_uint(21);
    if let Some(seq) = seq {
        encoder.encode_uint(seq);
    }
    encoder.encode_decimal(mantissa, exponent);
    encoder.finish()
}

#[tokio::test]
async fn block_codec_frames_async_stream() {
    let config = HeaderConfig::new(2, true).with_prefix(1).with_suffix(1);

    let messages = vec![
        encode_trade(Some(1), 10050, -2),
        encode_trade(None, 10075, -2),
        encode_trade(None, 10100, -2),
    ];
    let mut wire = bytes::BytesMut::new();
    let mut writer = BlockCodec::new(config);
    for message in &messages {
        use tokio_util::codec::Encoder as _;
        writer.encode(&message[..], &mut wire).unwrap();
    }

    let (mut sender, receiver) = tokio::io::duplex(64);
    let writer_task = tokio::spawn(async move {
        sender.write_all(&wire).await.unwrap();
        sender.shutdown().await.unwrap();
    });

    let frames = collect_frames(receiver, BlockCodec::new(config)).await;
    writer_task.await.unwrap();
    assert_eq!(frames.len(), 3);

    let mut decoder = Decoder::new(trade_registry());
    let mut collector = MessageCollector::new();
    for frame in &frames {
        decoder.decode_each(frame, &mut collector, 0).unwrap();
    }

    let seqs: Vec<u64> = collector
        .messages()
        .iter()
        .map(|m| m.get("seq").unwrap().as_u64().unwrap())
        .collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn io_thread_to_decode_thread_hand_off() {
    let (tx, rx) = buffer_queue();
    let mut service = StreamDecodeService::new(
        Decoder::new(trade_registry()),
        Box::new(FixedSizeHeader::new(HeaderConfig::new(2, true))),
        rx,
    );

    // The "I/O thread" delivers framed bytes in deliberately misaligned
    // slices; ownership of each buffer passes through the channel.
    let producer = std::thread::spawn(move || {
        let mut wire = Vec::new();
        for (seq, mantissa) in [(Some(7u64), 100i64), (None, 101), (None, 102)] {
            let message = encode_trade(seq, mantissa, 0);
            wire.extend((message.len() as u16).to_be_bytes());
            wire.extend(message);
        }
        for slice in wire.chunks(3) {
            tx.send(Bytes::copy_from_slice(slice)).unwrap();
        }
    });

    let mut collector = MessageCollector::new();
    service.run(&mut collector).unwrap();
    producer.join().unwrap();

    assert_eq!(service.message_count(), 3);
    let seqs: Vec<u64> = collector
        .messages()
        .iter()
        .map(|m| m.get("seq").unwrap().as_u64().unwrap())
        .collect();
    assert_eq!(seqs, vec![7, 8, 9]);
    assert!(collector.stopped());
}

#[test]
fn packet_service_skips_flagged_packets() {
    let (tx, rx) = buffer_queue();
    // Every 2nd packet header raises the skip flag.
    let packet_header = FixedSizeHeader::new(
        HeaderConfig::new(2, true).with_skip_cadence(2),
    );
    let mut service = PacketDecodeService::new(
        Decoder::new(trade_registry()),
        Box::new(packet_header),
        Box::new(fastcast_codec::header::NoHeader),
        rx,
    );

    for (seq, mantissa) in [(1u64, 100i64), (2, 200), (3, 300), (4, 400)] {
        let message = encode_trade(Some(seq), mantissa, 0);
        let mut packet = (message.len() as u16).to_be_bytes().to_vec();
        packet.extend(message);
        tx.send(Bytes::from(packet)).unwrap();
    }
    drop(tx);

    let mut collector = MessageCollector::new();
    service.run(&mut collector).unwrap();

    let seqs: Vec<u64> = collector
        .messages()
        .iter()
        .map(|m| m.get("seq").unwrap().as_u64().unwrap())
        .collect();
    assert_eq!(seqs, vec![1, 3]);
}
