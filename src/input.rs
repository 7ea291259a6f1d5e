use std::{borrow::Cow, fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use encoding_rs::{Encoding, UTF_8};

use crate::address::Record;

/// Look up an encoding by its WHATWG label, e.g. "euc-kr" or "utf-8".
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| anyhow!("Unknown text encoding {label:?}"))
}

/// Read the CSV file at `path`, decoding it with `encoding` and falling back
/// to UTF-8 if that fails.
pub fn load_records(
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<Record>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let text = decode(&bytes, encoding)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let records = parse_records(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Decode raw bytes. A byte order mark wins over the requested encoding.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    if let Some((bom_encoding, bom_len)) = Encoding::for_bom(bytes) {
        return strict_decode(bom_encoding, &bytes[bom_len..])
            .map(Cow::into_owned)
            .with_context(|| {
                format!("Input is not valid {}", bom_encoding.name())
            });
    }
    if let Some(text) = strict_decode(encoding, bytes) {
        return Ok(text.into_owned());
    }
    if encoding == UTF_8 {
        return Err(anyhow!("Input is not valid UTF-8"));
    }
    log::warn!(
        "Input is not valid {}, retrying as UTF-8",
        encoding.name()
    );
    strict_decode(UTF_8, bytes)
        .map(Cow::into_owned)
        .with_context(|| {
            format!("Input is neither valid {} nor UTF-8", encoding.name())
        })
}

fn strict_decode<'a>(
    encoding: &'static Encoding,
    bytes: &'a [u8],
) -> Option<Cow<'a, str>> {
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// Columns every input file must have.
const REQUIRED_COLUMNS: [&str; 2] = ["province", "city"];

/// Parse CSV text with a header row. Unreadable rows are reported and skipped,
/// but a header without the required columns is an error.
pub fn parse_records(text: &str) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let headers = rdr.headers().context("Failed to read the CSV header")?;
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            bail!("The CSV header has no {column:?} column");
        }
    }
    let mut records = vec![];
    for (i, result) in rdr.deserialize::<Record>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!(
                    "Failed to parse CSV record {} with error {e}. Continuing.",
                    i + 1
                );
            }
        }
    }
    Ok(records)
}
