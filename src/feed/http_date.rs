//! IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`) formatting and parsing.
use chrono::{DateTime, NaiveDateTime, Utc};

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn format(at: DateTime<Utc>) -> String {
    at.format(IMF_FIXDATE).to_string()
}

/// Parse an IMF-fixdate. Any other shape yields `None`.
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), IMF_FIXDATE)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_in_gmt() {
        let at = DateTime::from_timestamp_millis(784_111_777_250).unwrap();
        assert_eq!(format(at), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn parse_accepts_own_output() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(parse(&format(at)), Some(at));
    }

    #[test]
    fn parse_rejects_other_formats() {
        assert_eq!(parse("2023-11-14T22:13:20Z"), None);
        assert_eq!(parse("Sunday, 06-Nov-94 08:49:37 GMT"), None);
        assert_eq!(parse("garbage"), None);
        assert_eq!(parse(""), None);
    }
}
