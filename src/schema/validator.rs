//! Field value validation
//!
//! Validation semantics:
//! - Length constraints apply to strings (characters) and arrays (elements)
//! - A pattern validator tests the value's text form
//! - A function validator rejects by returning a message
//! - Validators only run for present values; absence is the required check's job

use std::fmt;

use regex::Regex;
use serde_json::Value;

use super::functions::ValidatorFn;

/// Compiled validator
#[derive(Clone)]
pub enum Validator {
    Pattern { regex: Regex, source: String },
    Function(ValidatorFn),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Pattern { source, .. } => write!(f, "Pattern({})", source),
            Validator::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl Validator {
    /// Compile `/body/flags` or a bare pattern. Supported flags: `i`, `m`, `s` (`g` is ignored).
    pub fn pattern(input: &str) -> Result<Validator, String> {
        let (body, flags) = split_pattern(input);

        let mut prefix = String::new();
        for flag in flags.chars() {
            match flag {
                'i' | 'm' | 's' => prefix.push(flag),
                'g' | 'u' | 'y' => {}
                other => return Err(format!("unsupported regular expression flag '{}'", other)),
            }
        }

        let full = if prefix.is_empty() {
            body.to_string()
        } else {
            format!("(?{}){}", prefix, body)
        };

        let regex = Regex::new(&full).map_err(|e| e.to_string())?;
        Ok(Validator::Pattern {
            regex,
            source: format!("/{}/{}", body, flags),
        })
    }

    /// Returns a failure message for `field`, or None when the value passes
    pub fn check(&self, field: &str, value: &Value) -> Option<String> {
        match self {
            Validator::Pattern { regex, source } => {
                let text = display_value(value);
                if regex.is_match(&text) {
                    None
                } else {
                    Some(format!(
                        "field \"{}\" failed validation using expression \"{}\" and value: {}",
                        field, source, text
                    ))
                }
            }
            Validator::Function(f) => f(value),
        }
    }

    /// Expression text for patterns
    pub fn source(&self) -> Option<&str> {
        match self {
            Validator::Pattern { source, .. } => Some(source),
            Validator::Function(_) => None,
        }
    }
}

fn split_pattern(input: &str) -> (&str, &str) {
    if let Some(rest) = input.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            return (&rest[..end], &rest[end + 1..]);
        }
    }
    (input, "")
}

/// Text form used in messages and pattern tests: strings unquoted, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `minlength` / `maxlength` / `length`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthConstraints {
    pub exact: Option<usize>,
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl LengthConstraints {
    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.min.is_none() && self.max.is_none()
    }

    pub fn check(&self, field: &str, value: &Value) -> Option<String> {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(a) => a.len(),
            _ => return None,
        };

        if let Some(exact) = self.exact {
            if len != exact {
                return Some(format!(
                    "field value must be exactly {} characters long: {}",
                    exact, field
                ));
            }
        }
        if let Some(min) = self.min {
            if len < min {
                return Some(format!(
                    "field value must be at least {} characters long: {}",
                    min, field
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                return Some(format!(
                    "field value must be at most {} characters long: {}",
                    max, field
                ));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pattern_message() {
        let v = Validator::pattern("/^[0-9]$/").unwrap();
        assert_eq!(v.check("age", &json!(9)), None);
        assert_eq!(
            v.check("age", &json!(12)).unwrap(),
            "field \"age\" failed validation using expression \"/^[0-9]$/\" and value: 12"
        );
    }

    #[test]
    fn test_bare_pattern_and_flags() {
        let v = Validator::pattern("^[a-z]+$").unwrap();
        assert_eq!(v.source(), Some("/^[a-z]+$/"));

        let v = Validator::pattern("/^[a-z]+$/i").unwrap();
        assert_eq!(v.check("name", &json!("JEFF")), None);

        assert!(Validator::pattern("/x/q").is_err());
        assert!(Validator::pattern("/(/").is_err());
    }

    #[test]
    fn test_boolean_false_is_checked() {
        let v = Validator::pattern("/^true$/").unwrap();
        assert!(v.check("flag", &json!(false)).is_some());
    }

    #[test]
    fn test_length_messages() {
        let both = LengthConstraints {
            exact: None,
            min: Some(4),
            max: Some(8),
        };
        assert_eq!(
            both.check("name", &json!("")).unwrap(),
            "field value must be at least 4 characters long: name"
        );
        assert_eq!(both.check("name", &json!("1234")), None);
        assert_eq!(both.check("name", &json!("12345678")), None);
        assert_eq!(
            both.check("name", &json!("123456789")).unwrap(),
            "field value must be at most 8 characters long: name"
        );

        let max = LengthConstraints {
            max: Some(8),
            ..Default::default()
        };
        assert_eq!(max.check("name", &json!("")), None);

        let exact = LengthConstraints {
            exact: Some(8),
            ..Default::default()
        };
        assert_eq!(
            exact.check("name", &json!("1")).unwrap(),
            "field value must be exactly 8 characters long: name"
        );
    }
}
