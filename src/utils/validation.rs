//! Input validation utilities
//!
//! Every check in this module reports problems as [`FieldViolation`]s so that
//! handlers can return all of them in one response instead of stopping at the
//! first bad field.

use serde::Serialize;
use validator::ValidationErrors;

use crate::constants;

/// A single problem with one input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Path to the offending field; empty when the whole input is malformed
    pub path: Vec<String>,
    /// Machine-readable name of the failed constraint
    pub rule: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, rule: &str, message: impl Into<String>) -> Self {
        Self {
            path: vec![field.to_string()],
            rule: rule.to_string(),
            message: message.into(),
        }
    }

    /// Violation that applies to the input as a whole
    pub fn whole(rule: &str, message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}

/// Flatten `validator` errors into violations, ordered by field name
pub fn violations_from(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = to_camel_case(field.as_ref());
            errs.iter().map(move |err| FieldViolation {
                path: vec![field.clone()],
                rule: err.code.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Failed '{}' constraint", err.code)),
            })
        })
        .collect();

    violations.sort_by(|a, b| a.path.cmp(&b.path));
    violations
}

/// Sort violations so responses are stable regardless of check order
pub fn sort_violations(violations: &mut [FieldViolation]) {
    violations.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.rule.cmp(&b.rule)));
}

/// Trim and lowercase a sport name
pub fn normalize_sport(sport: &str) -> String {
    sport.trim().to_lowercase()
}

/// Validate a (normalized) sport against the canonical vocabulary
pub fn validate_sport(sport: &str) -> Result<(), &'static str> {
    if sport.is_empty() {
        return Err("Sport cannot be empty");
    }
    if constants::sports::ALL.contains(&sport) {
        Ok(())
    } else {
        Err("Unsupported sport")
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;

    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}
