//! Cell-level parsing.
//!
//! Spreadsheet exports mix numbers, blanks and free text in the same column.
//! Numeric cells parse to finite `f64`; anything else is missing.

/// Classification of a raw cell destined for a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    Value(f64),
    Empty,
    /// Non-empty but not a finite number.
    Unparseable,
}

impl NumericCell {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Empty | Self::Unparseable => None,
        }
    }
}

/// Parses a string value to a finite number.
///
/// Surrounding whitespace and scientific notation are accepted. Separators
/// are not: `1,5` and `1,234.5` are ambiguous between locales and count as
/// missing, as do `NaN` and infinities.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Classifies a raw cell for coercion accounting.
pub fn classify_numeric(value: &str) -> NumericCell {
    if value.trim().is_empty() {
        return NumericCell::Empty;
    }
    match parse_numeric(value) {
        Some(v) => NumericCell::Value(v),
        None => NumericCell::Unparseable,
    }
}

/// Parses a configuration boolean (`yes`/`no`, `true`/`false`).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "y" | "1" => Some(true),
        "no" | "false" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// True for the literal spellings of a disabled option.
pub fn is_none_literal(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "none" | "null" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("123"), Some(123.0));
        assert_eq!(parse_numeric("  -45.67  "), Some(-45.67));
        assert_eq!(parse_numeric("1.5E-3"), Some(0.0015));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("<LOD"), None);
        assert_eq!(parse_numeric("nan"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    #[test]
    fn test_classify_numeric() {
        assert_eq!(classify_numeric("2.5"), NumericCell::Value(2.5));
        assert_eq!(classify_numeric("   "), NumericCell::Empty);
        assert_eq!(classify_numeric("n.d."), NumericCell::Unparseable);
        assert_eq!(classify_numeric("n.d.").value(), None);
    }

    #[test]
    fn test_separated_numbers_are_unparseable() {
        assert_eq!(parse_numeric("1,5"), None);
        assert_eq!(parse_numeric("1,234.5"), None);
        assert_eq!(parse_numeric("1\u{a0}234"), None);
        assert_eq!(classify_numeric("1,5"), NumericCell::Unparseable);
        assert_eq!(classify_numeric(" 1.5\u{a0}"), NumericCell::Value(1.5));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("NO"), Some(false));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_none_literal() {
        assert!(is_none_literal("None"));
        assert!(is_none_literal(" "));
        assert!(!is_none_literal("0.25"));
    }
}
