use crate::clipping::Clipping;
use crate::locale::{self, Locale};
use crate::metadata::{self, Metadata};
use crate::title;
use log::debug;
use thiserror::Error;

/// Record separator line of the export.
pub const RECORD_DELIMITER: &str = "==========";
// title, metadata, blank separator
const MIN_BLOCK_LINES: usize = 3;

/// Structural problems that make a whole block unusable.
/// Missing optional fields are never reported here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("block has {found} lines, at least 3 required")]
    TooFewLines { found: usize },
    #[error("title line yields an empty title")]
    EmptyTitle,
    #[error("metadata line is blank")]
    BlankMetadata,
}

/// How the metadata line's language is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocaleMode {
    /// Detect per metadata line, falling back to English.
    #[default]
    Auto,
    Fixed(Locale),
}

impl LocaleMode {
    pub fn from_arg(arg: &str) -> Option<Self> {
        if arg.trim().eq_ignore_ascii_case("auto") {
            return Some(LocaleMode::Auto);
        }
        Locale::by_name(arg).map(LocaleMode::Fixed)
    }

    fn resolve(&self, line: &str) -> Locale {
        match self {
            LocaleMode::Fixed(l) => *l,
            LocaleMode::Auto => Locale::detect(line).unwrap_or(locale::ENGLISH),
        }
    }
}

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub clippings: Vec<Clipping>,
    /// Non-empty blocks dropped as malformed.
    pub malformed: usize,
}

pub fn parse_clippings(content: &str, mode: LocaleMode) -> Vec<Clipping> {
    parse_document(content, mode).clippings
}

/// Parse the whole export. Malformed blocks are skipped and counted;
/// file order is preserved.
pub fn parse_document(content: &str, mode: LocaleMode) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for (idx, block) in content.split(RECORD_DELIMITER).enumerate() {
        if block.trim().is_empty() {
            continue;
        }
        // Trailing blank lines are kept: a bookmark is title, metadata, blank, empty.
        let block = block.trim_start();
        match parse_block(block, mode) {
            Ok(clipping) => outcome.clippings.push(clipping),
            Err(e) => {
                debug!("skipping block #{idx}: {e}");
                outcome.malformed += 1;
            }
        }
    }
    outcome
}

/// Assemble one clipping from a non-empty block starting at its title line.
pub fn parse_block(block: &str, mode: LocaleMode) -> Result<Clipping, ParseError> {
    let lines: Vec<&str> = block.lines().collect();
    if lines.len() < MIN_BLOCK_LINES {
        return Err(ParseError::TooFewLines { found: lines.len() });
    }

    let (book_title, authors) = title::extract_title_and_authors(lines[0]);
    if book_title.is_empty() {
        return Err(ParseError::EmptyTitle);
    }

    let meta_line = lines[1].trim();
    if meta_line.is_empty() {
        return Err(ParseError::BlankMetadata);
    }
    let Metadata {
        page,
        position,
        date,
    } = metadata::parse_metadata(meta_line, &mode.resolve(meta_line));

    let highlight = lines[MIN_BLOCK_LINES..].join("\n").trim().to_string();

    Ok(Clipping {
        book_title,
        authors,
        page,
        position,
        date,
        highlight,
    })
}
