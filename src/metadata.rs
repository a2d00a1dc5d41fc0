use crate::locale::{self, Locale};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// Page, position and timestamp pulled out of one metadata line.
/// Every field fails soft: absence is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub page: Option<String>,
    pub position: Option<String>,
    pub date: Option<NaiveDateTime>,
}

struct MarkerPatterns {
    locale: &'static str,
    page: Regex,
    position: Regex,
    date: Regex,
}

impl MarkerPatterns {
    fn build(l: &Locale) -> Self {
        MarkerPatterns {
            locale: l.name,
            page: Regex::new(&format!(r"(?i)\b{}\s+(\d+)", regex::escape(l.page_marker))).unwrap(),
            position: Regex::new(&format!(
                r"(?i)\b{}\s+(\d+(?:-\d+)?)",
                regex::escape(l.position_marker)
            ))
            .unwrap(),
            date: Regex::new(&format!(r"{}\s*(.*)$", regex::escape(l.date_marker))).unwrap(),
        }
    }
}

static PATTERNS: Lazy<Vec<MarkerPatterns>> =
    Lazy::new(|| locale::ALL.iter().map(MarkerPatterns::build).collect());

fn with_patterns<T>(l: &Locale, f: impl FnOnce(&MarkerPatterns) -> T) -> T {
    match PATTERNS.iter().find(|p| p.locale == l.name) {
        Some(p) => f(p),
        None => f(&MarkerPatterns::build(l)),
    }
}

const DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

pub fn parse_metadata(line: &str, l: &Locale) -> Metadata {
    Metadata {
        page: extract_page(line, l),
        position: extract_position(line, l),
        date: extract_date(line, l),
    }
}

pub fn extract_page(line: &str, l: &Locale) -> Option<String> {
    with_patterns(l, |p| {
        p.page
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Single number or `start-end` range, kept verbatim.
pub fn extract_position(line: &str, l: &Locale) -> Option<String> {
    with_patterns(l, |p| {
        p.position
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

pub fn extract_date(line: &str, l: &Locale) -> Option<NaiveDateTime> {
    let residual = with_patterns(l, |p| {
        p.date
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })?;
    // Drop the weekday ("Thursday, ...").
    let residual = match residual.split_once(',') {
        Some((_, rest)) => rest,
        None => residual.as_str(),
    };
    let tokens: Vec<&str> = residual
        .split_whitespace()
        .filter(|t| !l.is_connector(t))
        .collect();
    let [day, month, year, time] = tokens.as_slice() else {
        return None;
    };
    let month = l.month_number(month)?;
    NaiveDateTime::parse_from_str(&format!("{day}-{month}-{year} {time}"), DATE_FORMAT).ok()
}
