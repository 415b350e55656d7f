//! Contest request DTOs

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    constants::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT, MAX_PAGE, MAX_PAGE_LIMIT},
    models::{ContestFilter, NewContest},
    utils::{
        FieldViolation, normalize_sport, parse_datetime, validate_sport,
        validation::{sort_violations, violations_from},
    },
};

/// Create contest request
///
/// Fields are optional so that a missing field is reported alongside the other
/// violations. A field present with the wrong JSON type is left empty here and
/// recorded in `type_violations` instead.
#[derive(Debug, Default, Validate)]
pub struct CreateContestRequest {
    #[validate(required(message = "Sport is required"))]
    pub sport: Option<String>,

    #[validate(
        required(message = "Entry fee is required"),
        range(min = 0.0, message = "Entry fee must be non-negative")
    )]
    pub entry_fee: Option<f64>,

    /// ISO-8601 date or date-time
    #[validate(required(message = "Start time is required"))]
    pub starts_at: Option<String>,

    #[validate(
        required(message = "Max players is required"),
        range(min = 1, message = "Max players must be a positive integer")
    )]
    pub max_players: Option<i32>,

    type_violations: Vec<FieldViolation>,
}

impl CreateContestRequest {
    /// Parse a raw JSON body field by field.
    ///
    /// Only input that is not a JSON object fails as a whole; per-field type
    /// errors are kept for [`Self::into_new_contest`] to report with the rest.
    pub fn from_body(body: &[u8]) -> Result<Self, Vec<FieldViolation>> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| vec![FieldViolation::whole("invalid_type", e.to_string())])?;

        let Value::Object(mut fields) = value else {
            return Err(vec![FieldViolation::whole(
                "invalid_type",
                "Expected a JSON object",
            )]);
        };

        let mut type_violations = Vec::new();

        let sport = fields
            .remove("sport")
            .and_then(|v| string_field("sport", v, &mut type_violations));
        let entry_fee = fields
            .remove("entryFee")
            .and_then(|v| number_field("entryFee", v, &mut type_violations));
        let starts_at = fields
            .remove("startsAt")
            .and_then(|v| string_field("startsAt", v, &mut type_violations));
        let max_players = fields
            .remove("maxPlayers")
            .and_then(|v| int32_field("maxPlayers", v, &mut type_violations));

        Ok(Self {
            sport,
            entry_fee,
            starts_at,
            max_players,
            type_violations,
        })
    }

    /// Run every check and return either the insert input or all violations
    pub fn into_new_contest(self) -> Result<NewContest, Vec<FieldViolation>> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => violations_from(&errors),
        };

        // A mistyped field is empty, so "required" would only repeat its type error
        violations.retain(|v| !self.type_violations.iter().any(|t| t.path == v.path));
        violations.extend(self.type_violations.iter().cloned());

        let sport = self.sport.as_deref().map(normalize_sport);
        if let Some(sport) = &sport {
            if let Err(message) = validate_sport(sport) {
                violations.push(FieldViolation::new("sport", "invalid_sport", message));
            }
        }

        let starts_at = self.starts_at.as_deref().and_then(|raw| {
            let parsed = parse_datetime(raw);
            if parsed.is_none() {
                violations.push(FieldViolation::new(
                    "startsAt",
                    "invalid_date",
                    "Start time must be a valid date",
                ));
            }
            parsed
        });

        if !violations.is_empty() {
            sort_violations(&mut violations);
            return Err(violations);
        }

        match (sport, self.entry_fee, starts_at, self.max_players) {
            (Some(sport), Some(entry_fee), Some(starts_at), Some(max_players)) => Ok(NewContest {
                sport,
                entry_fee,
                starts_at,
                max_players,
            }),
            _ => Err(vec![FieldViolation::whole(
                "invalid_type",
                "Incomplete contest definition",
            )]),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn string_field(field: &str, value: Value, violations: &mut Vec<FieldViolation>) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        other => {
            violations.push(FieldViolation::new(
                field,
                "invalid_type",
                format!("Expected string, received {}", type_name(&other)),
            ));
            None
        }
    }
}

fn number_field(field: &str, value: Value, violations: &mut Vec<FieldViolation>) -> Option<f64> {
    match value.as_f64() {
        Some(n) => Some(n),
        None => {
            violations.push(FieldViolation::new(
                field,
                "invalid_type",
                format!("Expected number, received {}", type_name(&value)),
            ));
            None
        }
    }
}

fn int32_field(field: &str, value: Value, violations: &mut Vec<FieldViolation>) -> Option<i32> {
    // 4.0 is accepted as 4, 4.5 is not
    let whole = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
            .map(|n| n as i64)
    });

    match whole {
        Some(n) => match i32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                let rule = if n > 0 { "too_large" } else { "too_small" };
                violations.push(FieldViolation::new(field, rule, "Must fit in a 32-bit integer"));
                None
            }
        },
        None => {
            let message = match &value {
                Value::Number(_) => "Expected an integer".to_string(),
                other => format!("Expected integer, received {}", type_name(other)),
            };
            violations.push(FieldViolation::new(field, "invalid_type", message));
            None
        }
    }
}

/// List contests query parameters, kept as raw text until coerced
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContestsQuery {
    pub sport: Option<String>,
    pub min_fee: Option<String>,
    pub max_fee: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListContestsQuery {
    /// Coerce and validate into a normalized filter
    ///
    /// Empty parameters count as absent. A `limit` above the maximum is
    /// clamped rather than rejected.
    pub fn into_filter(self) -> Result<ContestFilter, Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let sport = present(self.sport).map(|raw| normalize_sport(&raw));
        if let Some(sport) = &sport {
            if let Err(message) = validate_sport(sport) {
                violations.push(FieldViolation::new("sport", "invalid_sport", message));
            }
        }

        let min_fee = present(self.min_fee).and_then(|raw| fee("minFee", &raw, &mut violations));
        let max_fee = present(self.max_fee).and_then(|raw| fee("maxFee", &raw, &mut violations));

        let page = present(self.page)
            .and_then(|raw| positive_int("page", &raw, &mut violations))
            .filter(|page| {
                let in_range = *page <= MAX_PAGE;
                if !in_range {
                    violations.push(FieldViolation::new(
                        "page",
                        "too_large",
                        format!("Must be at most {}", MAX_PAGE),
                    ));
                }
                in_range
            })
            .unwrap_or(DEFAULT_PAGE);
        let limit = present(self.limit)
            .and_then(|raw| positive_int("limit", &raw, &mut violations))
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT);

        if !violations.is_empty() {
            sort_violations(&mut violations);
            return Err(violations);
        }

        Ok(ContestFilter {
            sport,
            min_fee,
            max_fee,
            page,
            limit,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn fee(field: &str, raw: &str, violations: &mut Vec<FieldViolation>) -> Option<f64> {
    match raw.parse::<f64>() {
        Ok(value) if !value.is_finite() => {
            violations.push(FieldViolation::new(field, "invalid_type", "Expected a number"));
            None
        }
        Ok(value) if value < 0.0 => {
            violations.push(FieldViolation::new(field, "too_small", "Must be non-negative"));
            None
        }
        Ok(value) => Some(value),
        Err(_) => {
            violations.push(FieldViolation::new(field, "invalid_type", "Expected a number"));
            None
        }
    }
}

fn positive_int(field: &str, raw: &str, violations: &mut Vec<FieldViolation>) -> Option<i64> {
    // "2.0" is accepted as 2, "2.5" is not
    let parsed = raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    });

    match parsed {
        Some(value) if value >= 1 => Some(value),
        Some(_) => {
            violations.push(FieldViolation::new(field, "too_small", "Must be at least 1"));
            None
        }
        None => {
            violations.push(FieldViolation::new(
                field,
                "invalid_type",
                "Expected a whole number",
            ));
            None
        }
    }
}
