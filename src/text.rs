//! Name normalization used for matching establishments, portfolios and regions
//! Folds Latin diacritics via a static table, then strips punctuation

use std::collections::HashMap;
use std::sync::LazyLock;

/// Accented character -> ASCII replacement
pub static DIACRITICS: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    for c in ['á', 'à', 'â', 'ã', 'ä', 'å'] {
        m.insert(c, "a");
    }
    for c in ['é', 'è', 'ê', 'ë'] {
        m.insert(c, "e");
    }
    for c in ['í', 'ì', 'î', 'ï'] {
        m.insert(c, "i");
    }
    for c in ['ó', 'ò', 'ô', 'õ', 'ö', 'ø'] {
        m.insert(c, "o");
    }
    for c in ['ú', 'ù', 'û', 'ü'] {
        m.insert(c, "u");
    }
    m.insert('ç', "c");
    m.insert('ñ', "n");
    m.insert('ý', "y");
    m.insert('ÿ', "y");
    m.insert('æ', "ae");
    m.insert('œ', "oe");
    m.insert('ß', "ss");

    m
});

/// Replace accented characters with their ASCII base letters (input is lower-cased first)
pub fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match DIACRITICS.get(&c) {
            Some(rep) => out.push_str(rep),
            None => out.push(c),
        }
    }
    out
}

/// Case, diacritic, punctuation and whitespace insensitive form of a name.
///
/// `"  Padaria   São-João! "` becomes `"padaria sao joao"`.
pub fn normalize_name(s: &str) -> String {
    let folded: String = fold_diacritics(s)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key used by the telemetry table: lower-cased and trimmed, nothing else
pub fn telemetry_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalized equality or containment in either direction. Empty sides never match.
pub fn loose_match(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Shorten text for display, appending "..." when cut
pub fn truncate_display(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() > max_chars {
        let head: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", head.trim_end())
    } else {
        trimmed.to_string()
    }
}
