use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read the clippings export. Any failure here is fatal to the run.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    decode_source(&bytes).with_context(|| format!("decoding {}", path.display()))
}

/// UTF-8 with an optional byte-order mark.
pub fn decode_source(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = simdutf8::basic::from_utf8(bytes).map_err(|_| anyhow!("input is not valid UTF-8"))?;
    Ok(text.to_string())
}
