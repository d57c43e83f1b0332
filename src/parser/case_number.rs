use std::sync::LazyLock;

use regex::Regex;

/// Five token shapes, tried as one alternation so matches come back
/// left-to-right and never overlap:
/// "No." citations, "MA" citations, "Diary No." citations, a looser "No."
/// spacing variant, and "Dno" abbreviations.
///
/// Digits, whitespace and the word boundary are ASCII only: a no-break space
/// or a non-Latin digit never joins a token.
static CASE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[0-9]{1,}[.]?([0-9]{1,})?[\t\n\f\r ]([0-9]{1,})?(Connected[\t\n\f\r ])?[a-zA-Z]+.[a-zA-Z]+..?([a-zA-Z]+)?.?.?[\t\n\f\r ]No.[\t\n\f\r ][0-9]{1,}-?([0-9]{1,})?/[0-9]{4}(?-u:\b)|",
        r"[0-9]{1,}[.]?([0-9]{1,})?[\t\n\f\r ]?(Connected)?[\t\n\f\r ]?MA[\t\n\f\r ][0-9]{1,}-?([0-9]{1,})?/[0-9]{4}|",
        r"[0-9]{1,}[.]?([0-9]{1,})?[\t\n\f\r ]?([0-9]{1,})?(Connected)?[\t\n\f\r ]?Diary[\t\n\f\r ]No.[\t\n\f\r ][0-9]{1,}-?/?[0-9]{4}|",
        r"[0-9]{1,}[.]?([0-9]{1,})?[\t\n\f\r ]([0-9]{1,})?[a-zA-Z]+.[a-zA-Z]+..?([a-zA-Z]+)?.?.?[\t\n\f\r ]No.[\t\n\f\r ]?.?[0-9]{1,}-?([0-9]{1,})?/[0-9]{4}|",
        r"[0-9]{1,}[.]?([0-9]{1,})?[\t\n\f\r ]?([0-9]{1,})?(Connected)?[\t\n\f\r ]?Dno[\t\n\f\r ][0-9]{1,}-?/?[0-9]{4}",
    ))
    .unwrap()
});

const CONNECTED: &str = "Connected";
const NUMBER_WIDTH: usize = 6;

/// A case-number token split into its record fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedCase {
    pub serial_no: String,
    pub case_no: String,
    pub case_no_display: String,
    pub diary_no: String,
}

/// Every case-number token in `section`, in document order.
pub fn find_case_numbers(section: &str) -> Vec<&str> {
    CASE_NUMBER_RE
        .find_iter(section)
        .map(|m| m.as_str())
        .collect()
}

/// Normalize one matched token. `None` means the token is dropped.
pub fn normalize(token: &str) -> Option<NormalizedCase> {
    // Tokens reaching back into "IA ... in SLP ..." style references are noise.
    if token.contains("in ") {
        return None;
    }

    let token = compact_connected_prefix(token);
    let token = token
        .replace('\n', " ")
        .replace(CONNECTED, "")
        .replace("  ", " ");

    let (serial_no, rest) = token.split_once(' ')?;
    let serial_no = serial_no.trim().to_string();
    let rest = rest.trim();

    if rest.contains("Diary No.") || rest.contains("Dno") {
        let diary_no = rest.rsplit(' ').next().unwrap_or_default().to_string();
        return Some(NormalizedCase {
            serial_no,
            diary_no,
            ..Default::default()
        });
    }

    let citation = match rest.split_once("./") {
        Some((_, after)) => after,
        None => rest.split('/').next().unwrap_or_default(),
    };
    let raw_number = citation.rsplit(' ').next().unwrap_or_default().trim();
    let number = expand_number(raw_number);

    Some(NormalizedCase {
        serial_no,
        case_no: rest.to_string(),
        case_no_display: rest.replacen(raw_number, &number, 1),
        diary_no: String::new(),
    })
}

/// "1 2 Connected ..." -> "12Connected ...": a connected group's serial
/// prefix is collapsed into a single serial field.
fn compact_connected_prefix(token: &str) -> String {
    match token.find(CONNECTED) {
        Some(idx) => {
            let prefix: String = token[..idx]
                .chars()
                .filter(|c| *c != ' ' && *c != '\n')
                .collect();
            format!("{}{}", prefix, &token[idx..])
        }
        None => token.to_string(),
    }
}

/// "123" -> "000123 - 000123", "12-34" -> "000012 - 000034".
///
/// A range with an empty upper bound ("12-") keeps only the padded lower
/// bound and gets no separator.
fn expand_number(raw: &str) -> String {
    match raw.split_once('-') {
        Some((low, "")) => pad(low),
        Some((low, high)) => format!("{} - {}", pad(low), pad(high)),
        None => {
            let padded = pad(raw);
            format!("{} - {}", padded, padded)
        }
    }
}

fn pad(part: &str) -> String {
    format!("{:0>width$}", part, width = NUMBER_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(token: &str) -> NormalizedCase {
        normalize(token).unwrap_or_default()
    }

    #[test]
    fn plain_case_number() {
        let n = norm("1 Crl.M.P. No. 123/2024");
        assert_eq!(n.serial_no, "1");
        assert_eq!(n.case_no, "Crl.M.P. No. 123/2024");
        assert_eq!(n.case_no_display, "Crl.M.P. No. 000123 - 000123/2024");
        assert!(n.diary_no.is_empty());
    }

    #[test]
    fn diary_number() {
        let n = norm("2 Diary No. 4567/2024");
        assert_eq!(n.serial_no, "2");
        assert_eq!(n.diary_no, "4567/2024");
        assert!(n.case_no.is_empty());
        assert!(n.case_no_display.is_empty());
    }

    #[test]
    fn dno_abbreviation() {
        let n = norm("7 Dno 31337/2024");
        assert_eq!(n.serial_no, "7");
        assert_eq!(n.diary_no, "31337/2024");
        assert!(n.case_no.is_empty());
    }

    #[test]
    fn in_reference_is_rejected() {
        assert_eq!(normalize("3 in Crl.M.P. No. 99/2024"), None);
        assert_eq!(normalize("2024 in SLP(C) No. 77/2024"), None);
    }

    #[test]
    fn dash_range_padded_on_both_sides() {
        let n = norm("4 Crl.A. No. 12-34/2023");
        assert_eq!(n.case_no, "Crl.A. No. 12-34/2023");
        assert_eq!(n.case_no_display, "Crl.A. No. 000012 - 000034/2023");
    }

    #[test]
    fn open_range_keeps_lower_bound_only() {
        let n = norm("4 Crl.A. No. 12-/2023");
        assert_eq!(n.case_no_display, "Crl.A. No. 000012/2023");
    }

    #[test]
    fn long_numbers_not_padded() {
        let n = norm("5 C.A. No. 1234567/2022");
        assert_eq!(n.case_no_display, "C.A. No. 1234567 - 1234567/2022");
    }

    #[test]
    fn padding_is_idempotent() {
        let first = norm("1 Crl.M.P. No. 123/2024");
        let again = norm(&format!("1 {}", first.case_no));
        assert_eq!(again.case_no_display, first.case_no_display);

        let padded = norm("1 Crl.M.P. No. 000123/2024");
        assert_eq!(padded.case_no_display, "Crl.M.P. No. 000123 - 000123/2024");
        assert!(!padded.case_no_display.contains("0000123"));
    }

    #[test]
    fn connected_prefix_collapsed_into_serial() {
        let n = norm("1.1 Connected\nW.P.(C) No. 202/2024");
        assert_eq!(n.serial_no, "1.1");
        assert_eq!(n.case_no, "W.P.(C) No. 202/2024");
        assert_eq!(n.case_no_display, "W.P.(C) No. 000202 - 000202/2024");

        let n = norm("12 3 Connected MA 55/2024");
        assert_eq!(n.serial_no, "123");
        assert_eq!(n.case_no, "MA 55/2024");
    }

    #[test]
    fn slash_dot_citation() {
        let n = norm("9 Crl.M.P. No./123/2024");
        assert_eq!(n.case_no, "Crl.M.P. No./123/2024");
        assert_eq!(n.case_no_display, "Crl.M.P. No./123/2024 - 123/2024");
    }

    #[test]
    fn token_without_space_is_rejected() {
        assert_eq!(normalize("12"), None);
    }

    #[test]
    fn matcher_finds_all_shapes() {
        let text = "1 SLP(C) No. 12345/2024 II-A\n2 Diary No. 4567/2024\n4 MA 789/2024\n6 Dno 88/2023";
        let found = find_case_numbers(text);
        assert_eq!(
            found,
            vec![
                "1 SLP(C) No. 12345/2024",
                "2 Diary No. 4567/2024",
                "4 MA 789/2024",
                "6 Dno 88/2023",
            ]
        );
    }

    #[test]
    fn matcher_finds_loose_no_spacing() {
        let text = "7 Crl.M.P. No.123/2024\n9 Crl.M.P. No./123/2024\n5 Crl.M.P. No.12-34/2024";
        assert_eq!(
            find_case_numbers(text),
            vec![
                "7 Crl.M.P. No.123/2024",
                "9 Crl.M.P. No./123/2024",
                "5 Crl.M.P. No.12-34/2024",
            ]
        );
    }

    #[test]
    fn matcher_loose_spacing_connected() {
        let text = "LISTED AFTER\n1.1 Connected W.P. No.202/2024 end";
        let found = find_case_numbers(text);
        assert_eq!(found, vec!["1.1 Connected W.P. No.202/2024"]);

        let n = norm(found[0]);
        assert_eq!(n.serial_no, "1.1");
        assert_eq!(n.case_no, "W.P. No.202/2024");
        assert!(n.diary_no.is_empty());
    }

    #[test]
    fn no_break_space_does_not_join_a_token() {
        assert!(find_case_numbers("1\u{a0}SLP(C) No. 12345/2024").is_empty());
        assert!(find_case_numbers("1 SLP(C)\u{a0}No. 12345/2024").is_empty());
    }

    #[test]
    fn non_ascii_digits_are_not_case_numbers() {
        assert!(find_case_numbers("1 SLP(C) No. \u{661}\u{662}\u{663}/2024").is_empty());
        assert!(find_case_numbers("\u{661} SLP(C) No. 123/2024").is_empty());
    }

    #[test]
    fn matcher_is_case_sensitive() {
        assert!(find_case_numbers("4 ma 789/2024").is_empty());
        assert!(find_case_numbers("2 diary no. 4567/2024").is_empty());
    }

    #[test]
    fn matcher_ignores_plain_text() {
        assert!(find_case_numbers("").is_empty());
        assert!(find_case_numbers("Advance List - AL/1/2024").is_empty());
    }
}
