/// Marker words and month names for one export language.
///
/// Extraction is driven by these markers rather than by full-line patterns,
/// so each field can be found independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub name: &'static str,
    pub page_marker: &'static str,
    pub position_marker: &'static str,
    pub date_marker: &'static str,
    /// Filler words between date components ("12 de janeiro de 2017").
    pub connectors: &'static [&'static str],
    pub months: [&'static str; 12],
}

pub const ENGLISH: Locale = Locale {
    name: "en",
    page_marker: "page",
    position_marker: "location",
    date_marker: "Added on",
    connectors: &[],
    months: [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ],
};

pub const PORTUGUESE: Locale = Locale {
    name: "pt-br",
    page_marker: "página",
    position_marker: "posição",
    date_marker: "Adicionado:",
    connectors: &["de"],
    months: [
        "janeiro",
        "fevereiro",
        "março",
        "abril",
        "maio",
        "junho",
        "julho",
        "agosto",
        "setembro",
        "outubro",
        "novembro",
        "dezembro",
    ],
};

pub const ALL: [Locale; 2] = [ENGLISH, PORTUGUESE];

impl Locale {
    pub fn by_name(name: &str) -> Option<Locale> {
        let name = name.trim().to_lowercase();
        ALL.iter()
            .copied()
            .find(|l| l.name == name || (name == "pt" && l.name == "pt-br"))
    }

    /// First locale whose date, page or position marker occurs in `line`.
    pub fn detect(line: &str) -> Option<Locale> {
        let lower = line.to_lowercase();
        ALL.iter().copied().find(|l| {
            line.contains(l.date_marker)
                || contains_word(&lower, l.page_marker)
                || contains_word(&lower, l.position_marker)
        })
    }

    /// 1-based month number for a (case-insensitive) month name.
    pub fn month_number(&self, name: &str) -> Option<u32> {
        let name = name.to_lowercase();
        self.months
            .iter()
            .position(|m| *m == name)
            .map(|idx| idx as u32 + 1)
    }

    pub fn is_connector(&self, token: &str) -> bool {
        self.connectors.iter().any(|c| c.eq_ignore_ascii_case(token))
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + word.len()..].chars().next();
        !before.map(char::is_alphanumeric).unwrap_or(false)
            && !after.map(char::is_alphanumeric).unwrap_or(false)
    })
}
