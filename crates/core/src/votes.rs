//! Vote-value templates, parsing, and validation.
//!
//! Pure string computation: parsing comma-separated custom value sets,
//! validating individual vote values against a room's pointing method,
//! and best-effort numeric parsing for score averaging.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Minimum number of custom vote values per room.
pub const MIN_CUSTOM_VALUES: usize = 2;
/// Maximum number of custom vote values per room.
pub const MAX_CUSTOM_VALUES: usize = 20;
/// Maximum length of a single vote value, in characters.
pub const MAX_VALUE_LENGTH: usize = 10;

/// Numeric votes outside this range are treated as non-numeric.
pub const MAX_NUMERIC_VALUE: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Pointing methods & templates
// ---------------------------------------------------------------------------

/// Pointing method backed by the built-in Fibonacci sequence.
pub const METHOD_FIBONACCI: &str = "fibonacci";
/// Pointing method backed by a per-room custom value set.
pub const METHOD_CUSTOM: &str = "custom";

pub const TEMPLATE_FIBONACCI: &str = "fibonacci";
pub const TEMPLATE_MODIFIED_FIBONACCI: &str = "modified-fibonacci";
pub const TEMPLATE_T_SHIRT: &str = "t-shirt";

/// Template values as comma-separated strings, as presented in forms.
pub const TEMPLATE_FIBONACCI_VALUES: &str = "1, 2, 3, 5, 8, 13, 21";
pub const TEMPLATE_MODIFIED_FIBONACCI_VALUES: &str = "0.5, 1, 2, 3, 5, 8, 13, 20, 40, 100";
pub const TEMPLATE_T_SHIRT_VALUES: &str = "XXS, XS, S, M, L, XL, XXL";

/// Votes that are always accepted regardless of pointing method:
/// "unsure" and "need a break".
pub const SPECIAL_VALUES: [&str; 2] = ["?", "☕"];

/// Metadata describing a built-in vote template.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: String,
    pub values: &'static str,
}

/// All built-in templates, in display order.
pub fn available_templates() -> Vec<TemplateInfo> {
    vec![
        TemplateInfo {
            id: TEMPLATE_MODIFIED_FIBONACCI,
            name: "Modified Fibonacci",
            description: format!("Modified Fibonacci ({TEMPLATE_MODIFIED_FIBONACCI_VALUES})"),
            values: TEMPLATE_MODIFIED_FIBONACCI_VALUES,
        },
        TemplateInfo {
            id: TEMPLATE_FIBONACCI,
            name: "Fibonacci",
            description: format!("Fibonacci ({TEMPLATE_FIBONACCI_VALUES})"),
            values: TEMPLATE_FIBONACCI_VALUES,
        },
        TemplateInfo {
            id: TEMPLATE_T_SHIRT,
            name: "T-Shirt Sizes",
            description: format!("T-Shirt Sizes ({TEMPLATE_T_SHIRT_VALUES})"),
            values: TEMPLATE_T_SHIRT_VALUES,
        },
    ]
}

/// The default Fibonacci sequence.
pub fn fibonacci_values() -> Vec<String> {
    parse_custom_values(TEMPLATE_FIBONACCI_VALUES).expect("built-in template is valid")
}

/// The modified Fibonacci sequence starting from 0.5.
pub fn modified_fibonacci_values() -> Vec<String> {
    parse_custom_values(TEMPLATE_MODIFIED_FIBONACCI_VALUES).expect("built-in template is valid")
}

/// T-shirt sizing values.
pub fn t_shirt_values() -> Vec<String> {
    parse_custom_values(TEMPLATE_T_SHIRT_VALUES).expect("built-in template is valid")
}

/// Resolve a template id to its value set.
pub fn template_values(template_id: &str) -> Result<Vec<String>, CoreError> {
    match template_id {
        TEMPLATE_FIBONACCI => Ok(fibonacci_values()),
        TEMPLATE_MODIFIED_FIBONACCI => Ok(modified_fibonacci_values()),
        TEMPLATE_T_SHIRT => Ok(t_shirt_values()),
        other => Err(CoreError::Validation(format!("unknown template: {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Parsing & validation
// ---------------------------------------------------------------------------

/// Allowed characters in a vote value: letters, digits, dot, hyphen,
/// underscore, space. Covers integers, floats, and t-shirt sizes.
static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.\-_ ]+$").expect("valid regex"));

/// Parse a comma-separated list of custom vote values.
///
/// Tokens are trimmed; empty tokens are skipped. The result must contain
/// between [`MIN_CUSTOM_VALUES`] and [`MAX_CUSTOM_VALUES`] unique values,
/// each passing [`validate_value`]. Duplicates are rejected
/// case-sensitively. Order is preserved.
pub fn parse_custom_values(input: &str) -> Result<Vec<String>, CoreError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoreError::Validation(
            "custom values cannot be empty".to_string(),
        ));
    }

    let mut values = Vec::new();
    let mut seen = HashSet::new();

    for part in input.split(',') {
        let value = part.trim();
        if value.is_empty() {
            continue;
        }

        validate_value(value)
            .map_err(|e| CoreError::Validation(format!("invalid value '{value}': {e}")))?;

        if !seen.insert(value.to_string()) {
            return Err(CoreError::Validation(format!("duplicate value: '{value}'")));
        }
        values.push(value.to_string());
    }

    if values.is_empty() {
        return Err(CoreError::Validation("no valid values found".to_string()));
    }
    if values.len() < MIN_CUSTOM_VALUES {
        return Err(CoreError::Validation(format!(
            "at least {MIN_CUSTOM_VALUES} values are required (got {})",
            values.len()
        )));
    }
    if values.len() > MAX_CUSTOM_VALUES {
        return Err(CoreError::Validation(format!(
            "too many values (max {MAX_CUSTOM_VALUES}, got {})",
            values.len()
        )));
    }

    Ok(values)
}

/// Validate a single vote value: non-empty, at most [`MAX_VALUE_LENGTH`]
/// characters, restricted character class, no control characters.
pub fn validate_value(value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation("value cannot be empty".to_string()));
    }

    if value.chars().count() > MAX_VALUE_LENGTH {
        return Err(CoreError::Validation(format!(
            "value too long (max {MAX_VALUE_LENGTH} characters)"
        )));
    }

    if !VALUE_RE.is_match(value) {
        return Err(CoreError::Validation(
            "contains invalid characters (allowed: letters, numbers, dot, hyphen, underscore, space)"
                .to_string(),
        ));
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(CoreError::Validation(
            "contains control characters".to_string(),
        ));
    }

    Ok(())
}

/// Check whether a submitted vote is acceptable for a room.
///
/// The special values `?` and `☕` are always accepted; everything else
/// must be a member of the Fibonacci set (for `fibonacci` rooms) or the
/// room's configured custom set (for `custom` rooms).
pub fn validate_vote_value(
    value: &str,
    pointing_method: &str,
    custom_values: &[String],
) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(
            "vote value cannot be empty".to_string(),
        ));
    }

    if SPECIAL_VALUES.contains(&value) {
        return Ok(());
    }

    match pointing_method {
        METHOD_FIBONACCI => {
            if fibonacci_values().iter().any(|v| v == value) {
                Ok(())
            } else {
                Err(CoreError::Validation(format!(
                    "invalid fibonacci value: '{value}'"
                )))
            }
        }
        METHOD_CUSTOM => {
            if custom_values.is_empty() {
                return Err(CoreError::Validation(
                    "no custom values configured for this room".to_string(),
                ));
            }
            if custom_values.iter().any(|v| v == value) {
                Ok(())
            } else {
                Err(CoreError::Validation(format!(
                    "invalid custom value: '{value}'"
                )))
            }
        }
        other => Err(CoreError::Validation(format!(
            "unknown pointing method: '{other}'"
        ))),
    }
}

/// Best-effort numeric parse of a vote value.
///
/// Returns `Some` only for values that parse as a float within
/// `[0, MAX_NUMERIC_VALUE]`; used when averaging round scores.
pub fn parse_numeric_value(value: &str) -> Option<f64> {
    let num: f64 = value.parse().ok()?;
    if (0.0..=MAX_NUMERIC_VALUE).contains(&num) {
        Some(num)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- parse_custom_values --

    #[test]
    fn parses_tshirt_sizes() {
        let values = parse_custom_values("XS, S, M, L, XL").unwrap();
        assert_eq!(values, vec!["XS", "S", "M", "L", "XL"]);
    }

    #[test]
    fn parses_floats() {
        let values = parse_custom_values("0.5, 1, 2, 3, 5, 8").unwrap();
        assert_eq!(values, vec!["0.5", "1", "2", "3", "5", "8"]);
    }

    #[test]
    fn skips_empty_tokens() {
        let values = parse_custom_values("1,, 2 , ,3").unwrap();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_custom_values("").is_err());
        assert!(parse_custom_values("   ").is_err());
    }

    #[test]
    fn rejects_single_value() {
        assert!(parse_custom_values("5").is_err());
    }

    #[test]
    fn accepts_exactly_two_values() {
        assert!(parse_custom_values("1, 2").is_ok());
    }

    #[test]
    fn accepts_exactly_twenty_values() {
        let input = (1..=20).map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        assert_eq!(parse_custom_values(&input).unwrap().len(), 20);
    }

    #[test]
    fn rejects_twenty_one_values() {
        let input = (1..=21).map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        assert!(parse_custom_values(&input).is_err());
    }

    #[test]
    fn rejects_duplicates_case_sensitively() {
        assert!(parse_custom_values("M, L, M").is_err());
        // Different case is a different value.
        assert!(parse_custom_values("m, M").is_ok());
    }

    #[test]
    fn rejects_overlong_value() {
        assert!(parse_custom_values("1, 12345678901").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(parse_custom_values("1, <script>").is_err());
        assert!(parse_custom_values("1, a;b").is_err());
    }

    // -- validate_value --

    #[test]
    fn value_allows_expected_characters() {
        for v in ["1", "0.5", "XS", "a_b", "a-b", "a b"] {
            assert!(validate_value(v).is_ok(), "expected '{v}' to be valid");
        }
    }

    #[test]
    fn value_rejects_control_characters() {
        assert!(validate_value("a\x07b").is_err());
    }

    #[test]
    fn value_rejects_empty() {
        assert!(validate_value("").is_err());
    }

    // -- validate_vote_value --

    #[test]
    fn special_values_always_accepted() {
        assert!(validate_vote_value("?", METHOD_FIBONACCI, &[]).is_ok());
        assert!(validate_vote_value("☕", METHOD_CUSTOM, &[]).is_ok());
        assert!(validate_vote_value("?", "nonsense", &[]).is_ok());
    }

    #[test]
    fn fibonacci_membership() {
        assert!(validate_vote_value("5", METHOD_FIBONACCI, &[]).is_ok());
        assert!(validate_vote_value("4", METHOD_FIBONACCI, &[]).is_err());
    }

    #[test]
    fn custom_membership() {
        let values = vec!["XS".to_string(), "S".to_string()];
        assert!(validate_vote_value("XS", METHOD_CUSTOM, &values).is_ok());
        assert!(validate_vote_value("XL", METHOD_CUSTOM, &values).is_err());
    }

    #[test]
    fn custom_without_values_rejected() {
        assert!(validate_vote_value("5", METHOD_CUSTOM, &[]).is_err());
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(validate_vote_value("5", "planets", &[]).is_err());
    }

    // -- parse_numeric_value --

    #[test]
    fn numeric_parse_accepts_ints_and_floats() {
        assert_eq!(parse_numeric_value("5"), Some(5.0));
        assert_eq!(parse_numeric_value("0.5"), Some(0.5));
        assert_eq!(parse_numeric_value("1000"), Some(1000.0));
        assert_eq!(parse_numeric_value("0"), Some(0.0));
    }

    #[test]
    fn numeric_parse_rejects_out_of_range_and_garbage() {
        assert_eq!(parse_numeric_value("-1"), None);
        assert_eq!(parse_numeric_value("1001"), None);
        assert_eq!(parse_numeric_value("XS"), None);
        assert_eq!(parse_numeric_value("NaN"), None);
        assert_eq!(parse_numeric_value("inf"), None);
    }

    // -- templates --

    #[test]
    fn templates_round_trip_through_parser() {
        assert_eq!(
            fibonacci_values(),
            vec!["1", "2", "3", "5", "8", "13", "21"]
        );
        assert_eq!(
            modified_fibonacci_values(),
            vec!["0.5", "1", "2", "3", "5", "8", "13", "20", "40", "100"]
        );
        assert_eq!(
            t_shirt_values(),
            vec!["XXS", "XS", "S", "M", "L", "XL", "XXL"]
        );
    }

    #[test]
    fn template_lookup() {
        assert!(template_values(TEMPLATE_T_SHIRT).is_ok());
        assert!(template_values("unknown").is_err());
    }

    #[test]
    fn available_templates_listed_once_each() {
        let templates = available_templates();
        assert_eq!(templates.len(), 3);
    }
}
