//! Sanitization of tag names and values into backend-legal form
//!
//! Cortex inherits Prometheus' label grammar: metric names must match
//! `[a-zA-Z_:][a-zA-Z0-9_:]*` and label names `[a-zA-Z_][a-zA-Z0-9_]*`,
//! while tag keys and values from the platform are arbitrary UTF-8. These
//! helpers are pure functions used by both the write path (label
//! production) and the read path (query-string production) so the two
//! always agree on the sanitized form.

/// Label name carrying the metric name of a time series
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Maximum length of a label value accepted by the backend
pub const MAX_LABEL_VALUE_LEN: usize = 2048;

/// Sanitize a metric name into `[a-zA-Z_:][a-zA-Z0-9_:]*` form
///
/// Every illegal character becomes `_`; a leading digit is illegal and is
/// replaced as well.
pub fn sanitize_metric_name(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(i, c)| {
            let legal = c.is_ascii_alphabetic()
                || c == '_'
                || c == ':'
                || (c.is_ascii_digit() && i > 0);
            if legal {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitize a label name into `[a-zA-Z_][a-zA-Z0-9_]*` form
///
/// Same rule as [`sanitize_metric_name`] but `:` is not allowed outside
/// metric names.
pub fn sanitize_label_name(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(i, c)| {
            let legal = c.is_ascii_alphabetic() || c == '_' || (c.is_ascii_digit() && i > 0);
            if legal {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Truncate a label value to [`MAX_LABEL_VALUE_LEN`] characters
///
/// Values are unconstrained UTF-8 otherwise; no substitution happens here.
pub fn sanitize_label_value(value: &str) -> String {
    if value.chars().count() <= MAX_LABEL_VALUE_LEN {
        value.to_string()
    } else {
        value.chars().take(MAX_LABEL_VALUE_LEN).collect()
    }
}

/// Escape a literal matcher value for the query language
///
/// The backslash is the matcher-language escape character, so every literal
/// backslash must be doubled. Applied only to literal equals/not-equals
/// values; regex matcher values pass through verbatim so caller-supplied
/// regex syntax is preserved.
pub fn escape_matcher_value(value: &str) -> String {
    value.replace('\\', "\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_metric_name_grammar(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
    }

    fn matches_label_name_grammar(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    #[test]
    fn test_sanitize_metric_name() {
        let raw = "name=jmx-minion_resourceId=response:127.0.0.1:jmx-minion";
        assert!(!matches_metric_name_grammar(raw));

        let sanitized = sanitize_metric_name(raw);
        assert!(matches_metric_name_grammar(&sanitized));
        assert_eq!(
            sanitized,
            "name_jmx_minion_resourceId_response:127_0_0_1:jmx_minion"
        );
    }

    #[test]
    fn test_sanitize_label_name() {
        let raw = "SSH/127.0.0.1";
        assert!(!matches_label_name_grammar(raw));

        let sanitized = sanitize_label_name(raw);
        assert!(matches_label_name_grammar(&sanitized));
        assert_eq!(sanitized, "SSH_127_0_0_1");
    }

    #[test]
    fn test_sanitize_label_name_rejects_colon() {
        assert_eq!(sanitize_label_name("a:b"), "a_b");
        // The metric-name form keeps it
        assert_eq!(sanitize_metric_name("a:b"), "a:b");
    }

    #[test]
    fn test_leading_digit_is_escaped() {
        assert_eq!(sanitize_label_name("9front"), "_front");
        assert_eq!(sanitize_metric_name("9front"), "_front");
        // Digits are fine after the first character
        assert_eq!(sanitize_label_name("if9"), "if9");
    }

    #[test]
    fn test_sanitized_names_match_grammar_for_arbitrary_input() {
        let inputs = [
            "valid_name",
            "has space",
            "ümlaut",
            "127.0.0.1",
            "trailing-",
            "_already_fine",
        ];
        for input in inputs {
            assert!(
                matches_label_name_grammar(&sanitize_label_name(input)),
                "label grammar violated for {input:?}"
            );
            assert!(
                matches_metric_name_grammar(&sanitize_metric_name(input)),
                "metric grammar violated for {input:?}"
            );
        }
    }

    #[test]
    fn test_label_value_truncation() {
        let short = "x".repeat(10);
        assert_eq!(sanitize_label_value(&short), short);

        let long = "y".repeat(MAX_LABEL_VALUE_LEN + 100);
        let truncated = sanitize_label_value(&long);
        assert_eq!(truncated.chars().count(), MAX_LABEL_VALUE_LEN);
    }

    #[test]
    fn test_escape_matcher_value_doubles_backslashes() {
        assert_eq!(escape_matcher_value(r"a\b"), r"a\\b");
        assert_eq!(escape_matcher_value(r"a\\b"), r"a\\\\b");
        assert_eq!(escape_matcher_value("plain"), "plain");
    }
}
