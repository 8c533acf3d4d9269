//! Field-level parsing helpers shared by both ingest paths.

use chrono::NaiveDate;

/// Parse a monetary/numeric field. Source files use either decimal comma
/// or decimal point; thousands separators are not used.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok()
}

/// Parse a date field, ISO first, Brazilian day-first as fallback.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Emission dates sometimes carry a time component.
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d/%m/%Y"))
        .ok()
}

/// Parse a SIM/NAO style flag.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_uppercase().as_str(),
        "SIM" | "S" | "1" | "TRUE"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_decimal_comma() {
        assert_eq!(parse_number("12,50"), Some(12.5));
        assert_eq!(parse_number("12.50"), Some(12.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn dates_accept_both_layouts() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
        assert_eq!(parse_date("2023-05-17"), Some(expected));
        assert_eq!(parse_date("17/05/2023"), Some(expected));
        assert_eq!(parse_date("2023-05-17T10:30:00"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn flags_are_sim_nao() {
        assert!(parse_flag("SIM"));
        assert!(parse_flag("sim"));
        assert!(!parse_flag("NAO"));
        assert!(!parse_flag(""));
    }
}
