//! URL-safe slugs for author and skill names.
use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"’]+"#).expect("valid quote regex"));
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Transliterate to ASCII, lowercase, drop quotes and collapse every run of
/// other non-alphanumerics into a single `-`.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode(name).to_lowercase();
    let unquoted = QUOTES.replace_all(&ascii, "");
    NON_ALNUM
        .replace_all(&unquoted, "-")
        .trim_matches('-')
        .to_string()
}
