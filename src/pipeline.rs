use crate::book::{self, BookGroup};
use crate::dedup;
use crate::parser::{self, LocaleMode};
use crate::reconcile::Tally;
use log::info;
use std::fmt;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    pub locale: LocaleMode,
    pub dedup: bool,
    /// Keep clippings whose highlight is empty (bookmarks).
    pub keep_empty: bool,
}

/// Counters for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub parsed: usize,
    pub malformed: usize,
    pub empty_dropped: usize,
    pub duplicates_removed: usize,
    pub books: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn absorb(&mut self, tally: Tally) {
        self.created += tally.created;
        self.updated += tally.updated;
        self.skipped += tally.skipped;
        self.failed += tally.failed;
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} clippings parsed ({} malformed, {} empty dropped, {} duplicates removed), {} books: {} created, {} updated, {} skipped, {} failed",
            self.parsed,
            self.malformed,
            self.empty_dropped,
            self.duplicates_removed,
            self.books,
            self.created,
            self.updated,
            self.skipped,
            self.failed
        )
    }
}

/// Raw export text to book groups: parse, filter, optionally dedup, group.
pub fn prepare(content: &str, opts: &PrepareOptions) -> (Vec<BookGroup>, RunReport) {
    let mut report = RunReport::default();

    let outcome = parser::parse_document(content, opts.locale);
    report.parsed = outcome.clippings.len();
    report.malformed = outcome.malformed;

    let mut clippings = outcome.clippings;
    if !opts.keep_empty {
        let before = clippings.len();
        clippings.retain(|c| !c.highlight.is_empty());
        report.empty_dropped = before - clippings.len();
    }

    if opts.dedup {
        let before = clippings.len();
        clippings = dedup::dedup_clippings(clippings);
        report.duplicates_removed = before - clippings.len();
    }

    let groups = book::group_by_book(clippings);
    report.books = groups.len();
    info!(
        "parsed {} clippings into {} books ({} malformed blocks)",
        report.parsed, report.books, report.malformed
    );
    (groups, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
Dune (Frank Herbert)
- Your Highlight on page 1 | location 100-105 | Added on Thursday, 1 January 2015 10:00:00

first take
==========
Dune (Frank Herbert)
- Your Highlight on page 1 | location 100 | Added on Friday, 2 January 2015 10:00:00

second take
==========
Dune (Frank Herbert)
- Your Bookmark on page 9 | Added on Friday, 2 January 2015 11:00:00
x
==========
broken
==========
";

    #[test]
    fn prepare_counts_every_stage() {
        let opts = PrepareOptions {
            dedup: true,
            ..Default::default()
        };
        let (groups, report) = prepare(DOC, &opts);
        assert_eq!(report.parsed, 3);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.empty_dropped, 1);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.books, 1);
        assert_eq!(groups[0].clippings.len(), 1);
        assert_eq!(groups[0].clippings[0].highlight, "second take");
    }

    #[test]
    fn dedup_and_empty_filter_are_opt_in() {
        let opts = PrepareOptions {
            keep_empty: true,
            ..Default::default()
        };
        let (groups, report) = prepare(DOC, &opts);
        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(report.empty_dropped, 0);
        assert_eq!(groups[0].clippings.len(), 3);
    }

    #[test]
    fn bookmarks_are_empty_not_malformed() {
        let doc = "Dune (Frank Herbert)\n- Your Bookmark on page 9 | Added on Friday, 2 January 2015 11:00:00\n\n\n==========\n";
        let keep = PrepareOptions {
            keep_empty: true,
            ..Default::default()
        };
        let (groups, report) = prepare(doc, &keep);
        assert_eq!((report.parsed, report.malformed, report.books), (1, 0, 1));
        assert!(groups[0].clippings[0].highlight.is_empty());

        let (groups, report) = prepare(doc, &PrepareOptions::default());
        assert_eq!((report.parsed, report.malformed, report.empty_dropped), (1, 0, 1));
        assert!(groups.is_empty());
    }

    #[test]
    fn summary_line_mentions_all_counts() {
        let mut report = RunReport {
            parsed: 4,
            books: 2,
            ..Default::default()
        };
        report.absorb(Tally {
            created: 1,
            updated: 0,
            skipped: 1,
            failed: 0,
        });
        let line = report.to_string();
        assert!(line.starts_with("4 clippings parsed"));
        assert!(line.contains("2 books: 1 created, 0 updated, 1 skipped, 0 failed"));
    }
}
