use chrono::NaiveDate;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;

pub fn is_valid_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len)
}

/// Reduces a phone number to its national digits and formats it as
/// `(AA) NNNNN-NNNN` (mobile) or `(AA) NNNN-NNNN` (landline). A leading
/// `country_code` is stripped first. Returns `None` unless 10 or 11 digits remain.
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() > 11 && !country_code.is_empty() && digits.starts_with(country_code) {
        digits.drain(..country_code.len());
    }

    match digits.len() {
        11 => Some(format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..])),
        10 => Some(format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..])),
        _ => None,
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// `DD/MM/YYYY`, as shown to customers.
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(!is_valid_name("A"));
        assert!(is_valid_name("Al"));
        assert!(is_valid_name("  Ana  "));
        assert!(is_valid_name(&"x".repeat(100)));
        assert!(!is_valid_name(&"x".repeat(101)));
        assert!(is_valid_name("Zé"));
    }

    #[test]
    fn test_normalize_mobile() {
        assert_eq!(
            normalize_phone("(16) 99745-5195", "55").as_deref(),
            Some("(16) 99745-5195")
        );
        assert_eq!(
            normalize_phone("16997455195", "55").as_deref(),
            Some("(16) 99745-5195")
        );
    }

    #[test]
    fn test_normalize_strips_country_code() {
        assert_eq!(
            normalize_phone("+55 16 99745-5195", "55").as_deref(),
            Some("(16) 99745-5195")
        );
        assert_eq!(
            normalize_phone("551633334444", "55").as_deref(),
            Some("(16) 3333-4444")
        );
    }

    #[test]
    fn test_normalize_landline() {
        assert_eq!(
            normalize_phone("16 3333-4444", "55").as_deref(),
            Some("(16) 3333-4444")
        );
    }

    #[test]
    fn test_normalize_rejects_bad_lengths() {
        assert!(normalize_phone("12345", "55").is_none());
        assert!(normalize_phone("123456789012345", "55").is_none());
        assert!(normalize_phone("", "55").is_none());
        assert!(normalize_phone("abc", "55").is_none());
        // 12 digits without the country code prefix
        assert!(normalize_phone("441633334444", "55").is_none());
    }

    #[test]
    fn test_parse_and_format_date() {
        let date = parse_date("2025-06-16").unwrap();
        assert_eq!(format_date_br(date), "16/06/2025");
        assert!(parse_date("16/06/2025").is_none());
        assert!(parse_date("2025-02-30").is_none());
    }
}
