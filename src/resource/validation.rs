//! Attribute validators evaluated at plan time

use regex::Regex;

/// Validator attached to a string attribute
#[derive(Debug, Clone)]
pub enum Validator {
    /// Value must match `pattern`; `message` is reported otherwise
    StringMatch { pattern: Regex, message: String },
    /// Value must be one of `values`
    StringInSlice {
        values: &'static [&'static str],
        ignore_case: bool,
    },
}

/// Value must match `pattern`
pub fn string_match(pattern: Regex, message: impl Into<String>) -> Validator {
    Validator::StringMatch {
        pattern,
        message: message.into(),
    }
}

/// Value must be one of `values`
pub fn string_in_slice(values: &'static [&'static str], ignore_case: bool) -> Validator {
    Validator::StringInSlice {
        values,
        ignore_case,
    }
}

impl Validator {
    /// Check `value` for attribute `key`, returning a human readable error
    pub fn validate(&self, key: &str, value: &str) -> Result<(), String> {
        match self {
            Validator::StringMatch { pattern, message } => {
                if pattern.is_match(value) {
                    Ok(())
                } else if message.is_empty() {
                    Err(format!(
                        "invalid value for {} (should match {:?})",
                        key,
                        pattern.as_str()
                    ))
                } else {
                    Err(format!("invalid value for {} ({})", key, message))
                }
            }
            Validator::StringInSlice {
                values,
                ignore_case,
            } => {
                let found = values.iter().any(|v| {
                    if *ignore_case {
                        v.eq_ignore_ascii_case(value)
                    } else {
                        *v == value
                    }
                });
                if found {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} to be one of {:?}, got {}",
                        key, values, value
                    ))
                }
            }
        }
    }
}
