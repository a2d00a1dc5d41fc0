use crate::clipping::Clipping;
use std::collections::HashMap;

/// (title, sorted authors, position start)
type DedupKey = (String, Vec<String>, String);

fn dedup_key(c: &Clipping) -> Option<DedupKey> {
    let start = c.position_start()?;
    Some((c.book_title.clone(), c.sorted_authors(), start.to_string()))
}

fn replaces(candidate: &Clipping, incumbent: &Clipping) -> bool {
    match (candidate.date, incumbent.date) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Keep only the most recent clipping per book position.
///
/// Clippings without a position are kept untouched. A winner takes the slot
/// of the first clipping seen for its key, so output order is stable and a
/// second pass is a no-op.
pub fn dedup_clippings(clippings: Vec<Clipping>) -> Vec<Clipping> {
    let mut slots: Vec<Clipping> = Vec::with_capacity(clippings.len());
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for clipping in clippings {
        let Some(key) = dedup_key(&clipping) else {
            slots.push(clipping);
            continue;
        };
        match index.get(&key) {
            Some(&slot) => {
                if replaces(&clipping, &slots[slot]) {
                    slots[slot] = clipping;
                }
            }
            None => {
                index.insert(key, slots.len());
                slots.push(clipping);
            }
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2020, 5, day).and_then(|d| d.and_hms_opt(12, 0, 0))
    }

    fn clip(title: &str, authors: &[&str], position: Option<&str>, date: Option<NaiveDateTime>, text: &str) -> Clipping {
        Clipping {
            book_title: title.into(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            page: None,
            position: position.map(String::from),
            date,
            highlight: text.into(),
        }
    }

    #[test]
    fn later_range_and_point_collapse_to_latest() {
        let out = dedup_clippings(vec![
            clip("Book", &["A"], Some("100-105"), at(1), "first"),
            clip("Book", &["A"], Some("100"), at(2), "second"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].highlight, "second");
    }

    #[test]
    fn earlier_candidate_loses() {
        let out = dedup_clippings(vec![
            clip("Book", &["A"], Some("7"), at(9), "newest"),
            clip("Book", &["A"], Some("7-9"), at(3), "older"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].highlight, "newest");
    }

    #[test]
    fn dated_beats_undated_and_undated_ties_keep_first() {
        let out = dedup_clippings(vec![
            clip("Book", &["A"], Some("5"), None, "undated"),
            clip("Book", &["A"], Some("5"), at(1), "dated"),
        ]);
        assert_eq!(out[0].highlight, "dated");

        let out = dedup_clippings(vec![
            clip("Book", &["A"], Some("5"), None, "one"),
            clip("Book", &["A"], Some("5"), None, "two"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].highlight, "one");
    }

    #[test]
    fn author_order_does_not_split_keys() {
        let out = dedup_clippings(vec![
            clip("Book", &["A", "B"], Some("5"), at(1), "x"),
            clip("Book", &["B", "A"], Some("5"), at(2), "y"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].highlight, "y");
    }

    #[test]
    fn positionless_clippings_are_all_kept() {
        let out = dedup_clippings(vec![
            clip("Book", &["A"], None, at(1), "x"),
            clip("Book", &["A"], None, at(1), "x"),
            clip("Other", &["A"], Some("5"), at(1), "z"),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = vec![
            clip("Book", &["A"], Some("1-2"), at(1), "a"),
            clip("Book", &["A"], Some("1"), at(4), "b"),
            clip("Book", &["A"], None, None, "c"),
            clip("Book", &["A"], Some("3"), None, "d"),
            clip("Book", &["A"], Some("3-4"), at(2), "e"),
            clip("Other", &[], Some("1"), at(3), "f"),
        ];
        let once = dedup_clippings(input);
        let twice = dedup_clippings(once.clone());
        assert_eq!(once, twice);
        let texts: Vec<_> = once.iter().map(|c| c.highlight.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "e", "f"]);
    }
}
