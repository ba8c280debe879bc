//! Decode a FAST file captured with fixed-size block framing.
//!
//! Reads the whole file into memory, frames it block by block through the
//! header analyzer, and prints every decoded message. Pass the file path
//! and optionally the header layout:
//!
//! ```text
//! framed_file <capture.fast> [size_bytes] [prefix_bytes] [suffix_bytes]
//! ```

use anyhow::{Context, Result};
use fastcast::prelude::*;
use tracing::{info, warn};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

/// A generic depth-of-book template; adjust to the venue's template file.
fn book_template() -> Template {
    Template::new(
        1,
        "DepthSnapshot",
        vec![
            Instruction::Field(FieldInstruction::new("symbol", PrimitiveType::Ascii)),
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

fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: framed_file <capture.fast>")?;
    let size_bytes: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(2);
    let prefix_bytes: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    let suffix_bytes: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);

    let data = std::fs::read(&path).with_context(|| format!("reading {}", path))?;

    let mut registry = TemplateRegistry::new();
    registry.register(book_template())?;
    let mut decoder = Decoder::new(registry.into_shared()).with_strict(false);

    let config = HeaderConfig::new(size_bytes, true)
        .with_prefix(prefix_bytes)
        .with_suffix(suffix_bytes);
    let mut analyzer = FixedSizeHeader::new(config);
    let mut source = BufferSource::new(data);

    let mut collector = MessageCollector::new();
    let mut blocks = 0usize;
    loop {
        match analyzer.analyze(&mut source) {
            Ok(Analysis::Header { block_size, skip }) => {
                let take = if block_size == 0 {
                    source.remaining()
                } else {
                    block_size
                };
                let Some(block) = source.take(take) else {
                    warn!(declared = block_size, "truncated final block");
                    break;
                };
                if skip {
                    continue;
                }
                if block.is_empty() {
                    break;
                }
                decoder.decode_each(&block, &mut collector, 0)?;
                blocks += 1;
            }
            Ok(Analysis::NeedData) => break,
            Err(err) => return Err(err.into()),
        }
    }

    for message in collector.messages() {
        let fields: Vec<String> = message
            .iter()
            .map(|(name, field)| format!("{}={}", name, field))
            .collect();
        info!(template = ?message.template_id(), "{}", fields.join(" "));
    }
    info!(blocks, messages = collector.messages().len(), "done");
    Ok(())
}
