use crate::book::{BookGroup, BookId};
use crate::clipping::Clipping;
use unicode_normalization::UnicodeNormalization;

const FRONT_MATTER: &str = "---";
pub const NOTE_EXTENSION: &str = "md";
/// Cover reference written when no image is available.
pub const NO_COVER: &str = "none";

const INVALID_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// The machine-readable part of an existing note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHeader {
    pub id: BookId,
    pub cover: Option<String>,
    pub book: Option<String>,
    /// `None` when the field is missing or not a number.
    pub clippings: Option<usize>,
}

/// Render the whole note: header followed by one quote per clipping,
/// oldest first with undated clippings leading.
pub fn render_note(group: &BookGroup, cover: &str) -> String {
    let mut clippings: Vec<&Clipping> = group.clippings.iter().collect();
    clippings.sort_by_key(|c| c.date);

    let last_clipping = clippings
        .last()
        .and_then(|c| c.date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str(FRONT_MATTER);
    out.push('\n');
    out.push_str(&format!("ID: {}\n", group.id));
    out.push_str(&format!("Cover: {cover}\n"));
    out.push_str(&format!("Book: {}\n", quote(&group.title)));
    out.push_str(&format!("Author: {}\n", quote(&group.display_authors())));
    out.push_str(&format!("Clippings: {}\n", clippings.len()));
    if last_clipping.is_empty() {
        out.push_str("Last clipping:\n");
    } else {
        out.push_str(&format!("Last clipping: {last_clipping}\n"));
    }
    out.push_str(FRONT_MATTER);
    out.push('\n');

    let entries: Vec<String> = clippings.iter().map(|c| render_entry(c)).collect();
    if !entries.is_empty() {
        out.push('\n');
        out.push_str(&entries.join("\n\n"));
        out.push('\n');
    }
    out
}

fn render_entry(c: &Clipping) -> String {
    let mut parts = Vec::new();
    if let Some(page) = &c.page {
        parts.push(format!("Page {page}"));
    }
    if let Some(position) = &c.position {
        parts.push(format!("({position})"));
    }
    if let Some(date) = c.date {
        parts.push(format!("@ {}", date.format("%Y-%m-%d %H:%M")));
    }
    let mut entry = format!("> [!quote]+ {}", parts.join(" ")).trim_end().to_string();
    for line in c.highlight.split('\n') {
        entry.push('\n');
        entry.push_str(format!("> {line}").trim_end());
    }
    entry
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    match value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Read the leading `---` block of a note. Returns `None` for files that are
/// not notes of this tool (no front matter, or no valid `ID`).
pub fn read_header(content: &str) -> Option<NoteHeader> {
    let mut lines = content.trim_start_matches('\u{feff}').lines();
    if lines.next()?.trim() != FRONT_MATTER {
        return None;
    }

    let mut id = None;
    let mut cover = None;
    let mut book = None;
    let mut clippings = None;
    for line in lines {
        let line = line.trim();
        if line == FRONT_MATTER {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value);
        match key.trim() {
            "ID" => id = id.or_else(|| BookId::parse(&value)),
            "Cover" if !value.is_empty() => cover = Some(value),
            "Book" => book = Some(value),
            "Clippings" => clippings = value.parse::<usize>().ok(),
            _ => {}
        }
    }

    Some(NoteHeader {
        id: id?,
        cover,
        book,
        clippings,
    })
}

/// Strip characters that are invalid in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .nfc()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    cleaned.trim().trim_end_matches('.').trim().to_string()
}

/// Longest stem in bytes; leaves room for an id suffix and the extension
/// under the usual 255-byte file name limit.
const MAX_STEM_BYTES: usize = 200;

fn truncate_stem(stem: &str) -> &str {
    if stem.len() <= MAX_STEM_BYTES {
        return stem;
    }
    let mut end = MAX_STEM_BYTES;
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    stem[..end].trim_end().trim_end_matches('.').trim_end()
}

fn note_stem(group: &BookGroup) -> String {
    let authors = group.display_authors();
    let stem = if authors.is_empty() {
        group.title.clone()
    } else {
        format!("{} - {}", group.title, authors)
    };
    let stem = sanitize_filename(&stem);
    let stem = truncate_stem(&stem);
    if stem.is_empty() {
        group.id.to_string()
    } else {
        stem.to_string()
    }
}

/// `"{title} - {authors}.md"`, or just the title for unknown authors.
pub fn note_file_name(group: &BookGroup) -> String {
    format!("{}.{NOTE_EXTENSION}", note_stem(group))
}

/// File names to try for a new note, in order: the plain name, then the
/// short id, the full id, and numbered full-id names. Never exhausts.
pub fn candidate_file_names(group: &BookGroup) -> impl Iterator<Item = String> {
    let stem = note_stem(group);
    let plain = format!("{stem}.{NOTE_EXTENSION}");
    let short = format!("{stem} ({}).{NOTE_EXTENSION}", group.id.short());
    let full = format!("{stem} ({})", group.id);
    [plain, short, format!("{full}.{NOTE_EXTENSION}")]
        .into_iter()
        .chain((2usize..).map(move |n| format!("{full} {n}.{NOTE_EXTENSION}")))
}
