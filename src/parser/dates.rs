/// First path segment shaped like `YYYY-MM-DD` (10 bytes with a dash).
/// No calendar validation.
pub fn hearing_date(link: &str) -> &str {
    link.split('/')
        .find(|part| part.len() == 10 && part.contains('-'))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_segment() {
        assert_eq!(
            hearing_date("https://cdnbbsr.s3waas.gov.in/causelist/2024-10-16/M_R_2.pdf"),
            "2024-10-16"
        );
        assert_eq!(hearing_date(".../2024-10-16/M_R_2.pdf"), "2024-10-16");
    }

    #[test]
    fn no_date_segment() {
        assert_eq!(hearing_date("https://example.org/lists/M_R_2.pdf"), "");
        assert_eq!(hearing_date(""), "");
    }

    #[test]
    fn shape_only_no_validation() {
        assert_eq!(hearing_date("/ab-cdefghi/x.pdf"), "ab-cdefghi");
    }
}
