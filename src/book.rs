use crate::clipping::Clipping;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;

/// Content-derived identity of a (title, authors) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(String);

impl BookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts the 40-char hex form written into artifact headers.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == 40 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(BookId(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-1 over `"{title}-{sorted authors joined by ';'}"`; author order
/// does not matter, clipping content never enters the hash.
pub fn compute_book_id(title: &str, authors: &[String]) -> BookId {
    let mut sorted: Vec<&str> = authors.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let joined = sorted.join(";");
    let identifier = format!("{}-{}", title.trim(), joined.trim());
    let digest = Sha1::digest(identifier.as_bytes());
    BookId(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// All clippings of one book.
#[derive(Debug, Clone)]
pub struct BookGroup {
    pub id: BookId,
    pub title: String,
    /// Author order as first seen in the export; display only.
    pub authors: Vec<String>,
    pub clippings: Vec<Clipping>,
}

impl BookGroup {
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    pub fn display_authors(&self) -> String {
        self.authors.join(", ")
    }
}

/// Partition clippings by `BookId`, keeping first-seen book order and the
/// clippings' own order inside each group.
pub fn group_by_book(clippings: Vec<Clipping>) -> Vec<BookGroup> {
    let mut groups: Vec<BookGroup> = Vec::new();
    let mut index: HashMap<BookId, usize> = HashMap::new();

    for clipping in clippings {
        let id = compute_book_id(&clipping.book_title, &clipping.authors);
        match index.get(&id) {
            Some(&idx) => groups[idx].clippings.push(clipping),
            None => {
                index.insert(id.clone(), groups.len());
                groups.push(BookGroup {
                    id,
                    title: clipping.book_title.trim().to_string(),
                    authors: clipping.authors.clone(),
                    clippings: vec![clipping],
                });
            }
        }
    }
    groups
}
