use once_cell::sync::Lazy;
use regex::Regex;

static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]+)\)").unwrap());
static AUTHOR_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*;\s*|\s*&\s*|\s+and\s+").unwrap());

/// Split a `"Title (Author One; Author Two)"` line into the title and the
/// authors in source order. A line without parentheses is all title.
pub fn extract_title_and_authors(line: &str) -> (String, Vec<String>) {
    let line = line.trim();
    let Some(caps) = PAREN_RE.captures_iter(line).last() else {
        return (line.to_string(), Vec::new());
    };
    let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
        return (line.to_string(), Vec::new());
    };

    let authors_raw = inner.as_str().trim();
    let mut title = line[..whole.start()].trim();
    // "Title - Author (Author)"
    if let Some(stripped) = title.strip_suffix(&format!(" - {authors_raw}")) {
        title = stripped.trim();
    }

    let authors = AUTHOR_SPLIT_RE
        .split(authors_raw)
        .filter_map(normalize_author)
        .collect();
    (title.to_string(), authors)
}

/// `"Last, First"` becomes `"First Last"`; other names are only trimmed.
pub fn normalize_author(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    if !name.contains(',') {
        return Some(name.to_string());
    }
    let parts: Vec<&str> = name
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match parts.split_first() {
        Some((last, rest)) if !rest.is_empty() => Some(format!("{} {}", rest.join(" "), last)),
        Some((only, _)) => Some(only.to_string()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_parentheses_is_whole_title() {
        let (title, authors) = extract_title_and_authors("  Meditations  ");
        assert_eq!(title, "Meditations");
        assert!(authors.is_empty());
    }

    #[test]
    fn single_author() {
        let (title, authors) = extract_title_and_authors("Dune (Frank Herbert)");
        assert_eq!(title, "Dune");
        assert_eq!(authors, vec!["Frank Herbert"]);
    }

    #[test]
    fn redundant_author_suffix_is_stripped() {
        let (title, authors) =
            extract_title_and_authors("Sapiens - Yuval Noah Harari (Yuval Noah Harari)");
        assert_eq!(title, "Sapiens");
        assert_eq!(authors, vec!["Yuval Noah Harari"]);
    }

    #[test]
    fn all_separators_keep_source_order() {
        let (_, authors) =
            extract_title_and_authors("Book (Zed Zulu; Amy Alpha & Bob Beta and Cat Charlie)");
        assert_eq!(authors, vec!["Zed Zulu", "Amy Alpha", "Bob Beta", "Cat Charlie"]);
    }

    #[test]
    fn last_first_is_reordered() {
        let (_, authors) = extract_title_and_authors("O Hobbit (Tolkien, J. R. R.; Lewis, C. S.)");
        assert_eq!(authors, vec!["J. R. R. Tolkien", "C. S. Lewis"]);
        assert!(authors.iter().all(|a| !a.contains(',')));
    }

    #[test]
    fn last_parenthesized_group_holds_authors() {
        let (title, authors) =
            extract_title_and_authors("Foundation (Foundation Series Book 1) (Asimov, Isaac)");
        assert_eq!(title, "Foundation (Foundation Series Book 1)");
        assert_eq!(authors, vec!["Isaac Asimov"]);
    }

    #[test]
    fn empty_tokens_are_dropped() {
        let (_, authors) = extract_title_and_authors("Book (Ann Smith; ; )");
        assert_eq!(authors, vec!["Ann Smith"]);
    }

    #[test]
    fn reordered_names_never_contain_commas() {
        for raw in ["Doe, John", "Doe, John, Jr.", "Doe,", ", John"] {
            let name = normalize_author(raw).unwrap();
            assert!(!name.contains(','), "{name}");
        }
        assert_eq!(normalize_author("Doe, John, Jr.").unwrap(), "John Jr. Doe");
    }
}
