//! Simulated market-data feed.
//!
//! A producer thread encodes FAST-compressed ticks, frames them with a
//! fixed-size header, and delivers the packets over a buffer queue; the
//! decode thread drives a packet-aligned service and logs every decoded
//! message.

use anyhow::Result;
use bytes::Bytes;
use fastcast::prelude::*;
use tracing::info;

const TEMPLATE_ID: u32 = 30;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

fn tick_template() -> Template {
    Template::new(
        TEMPLATE_ID,
        "Tick",
        vec![
            Instruction::Field(
                FieldInstruction::new("seq", PrimitiveType::UInt64)
                    .with_operator(OperatorSpec::new(Operator::Increment)),
            ),
            Instruction::Field(
                FieldInstruction::new("symbol", PrimitiveType::Ascii)
                    .with_operator(OperatorSpec::new(Operator::Copy)),
            ),
            Instruction::Field(FieldInstruction::new("price", PrimitiveType::Decimal)),
            Instruction::Field(FieldInstruction::new("size", PrimitiveType::UInt64)),
        ],
    )
}

/// Builder that logs each message instead of retaining it.
#[derive(Default)]
struct LoggingBuilder {
    current: Vec<String>,
    template_id: u32,
}

impl MessageBuilder for LoggingBuilder {
    fn start_message(&mut self, template_id: u32, _name: &str) {
        self.template_id = template_id;
        self.current.clear();
    }

    fn field(&mut self, name: &str, field: Field) -> std::result::Result<(), BuildError> {
        self.current.push(format!("{}={}", name, field));
        Ok(())
    }

    fn start_group(&mut self, _name: &str) {}
    fn end_group(&mut self) {}
    fn start_sequence(&mut self, _name: &str, _length: usize) {}
    fn start_sequence_entry(&mut self) {}
    fn end_sequence_entry(&mut self) {}
    fn end_sequence(&mut self) {}

    fn end_message(&mut self) {
        info!(template = self.template_id, "{}", self.current.join(" "));
    }

    fn decoding_stopped(&mut self) {
        info!("decoding stopped");
    }
}

fn encode_tick(
    encoder: &mut Encoder,
    seq: Option<u64>,
    symbol: Option<&str>,
    price: (i64, i32),
    size: u64,
) {
    encoder.encode_pmap(&[true, seq.is_some(), symbol.is_some()]);
    encoder.encode_uint(u64::from(TEMPLATE_ID));
    if let Some(seq) = seq {
        encoder.encode_uint(seq);
    }
    if let Some(symbol) = symbol {
        encoder.encode_ascii(symbol);
    }
    encoder.encode_decimal(price.0, price.1);
    encoder.encode_uint(size);
}

fn main() -> Result<()> {
    init_logging();

    let mut registry = TemplateRegistry::new();
    registry.register(tick_template())?;

    let (tx, rx) = buffer_queue();
    let mut service = PacketDecodeService::new(
        Decoder::new(registry.into_shared()),
        Box::new(NoHeader),
        Box::new(FixedSizeHeader::new(HeaderConfig::new(2, true))),
        rx,
    )
    .with_message_limit(100);

    let producer = std::thread::spawn(move || {
        let ticks = [
            (Some(1), Some("EURUSD"), (108250i64, -5i32), 1_000_000u64),
            (None, None, (108251, -5), 250_000),
            (None, None, (108249, -5), 500_000),
            (None, Some("USDJPY"), (1573125, -4), 2_000_000),
            (None, None, (1573130, -4), 750_000),
        ];
        for (seq, symbol, price, size) in ticks {
            let mut encoder = Encoder::new();
            encode_tick(&mut encoder, seq, symbol, price, size);
            let message = encoder.finish();

            let mut packet = (message.len() as u16).to_be_bytes().to_vec();
            packet.extend(message);
            if tx.send(Bytes::from(packet)).is_err() {
                break;
            }
        }
    });

    let mut builder = LoggingBuilder::default();
    service.run(&mut builder)?;
    producer.join().expect("producer thread panicked");

    info!(
        messages = service.message_count(),
        bytes = service.byte_count(),
        "feed drained"
    );
    Ok(())
}
