use chrono::NaiveDateTime;

/// One highlighted passage as read from the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clipping {
    pub book_title: String,
    /// "First Last" names in source order; empty when the author is unknown.
    pub authors: Vec<String>,
    pub page: Option<String>,
    /// Verbatim `"123"` or `"123-130"`.
    pub position: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub highlight: String,
}

impl Clipping {
    /// Part of the position before any hyphen, if a position is known.
    pub fn position_start(&self) -> Option<&str> {
        let pos = self.position.as_deref()?.trim();
        if pos.is_empty() {
            return None;
        }
        Some(pos.split('-').next().unwrap_or(pos).trim())
    }

    pub fn sorted_authors(&self) -> Vec<String> {
        let mut authors = self.authors.clone();
        authors.sort();
        authors
    }

    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}
