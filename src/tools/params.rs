//! Parameter validation: untyped tool arguments to typed requests.
//!
//! Each tool has one pure validation function that applies defaults and
//! collects every violated constraint. The typed request structs have private
//! fields, so the only way to obtain one is through these functions.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::catalog::ToolName;

/// Untyped caller-supplied arguments for one invocation.
pub type ToolParameters = Map<String, Value>;

/// Page size used when `limit` is absent or not positive.
pub const DEFAULT_LIMIT: u64 = 100;
/// Largest accepted page size.
pub const MAX_LIMIT: u64 = 1000;
/// Offset used when `offset` is absent.
pub const DEFAULT_OFFSET: u64 = 0;

// =============================================================================
// Errors
// =============================================================================

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every constraint a parameter set failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// True if any violation concerns `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// Typed requests
// =============================================================================

/// Listing request: optional creator filter plus pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    creator: Option<String>,
    limit: u64,
    offset: u64,
}

impl ListQuery {
    /// Creator filter; `None` means no filter.
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Single-entity lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityQuery {
    id: u64,
}

impl EntityQuery {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A validated request, one variant per tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tool", rename_all = "kebab-case")]
pub enum ValidatedRequest {
    ListProviders(ListQuery),
    ShowProvider(EntityQuery),
    ListEnvironments(ListQuery),
    ShowEnvironment(EntityQuery),
}

impl ValidatedRequest {
    pub fn tool(&self) -> ToolName {
        match self {
            ValidatedRequest::ListProviders(_) => ToolName::ListProviders,
            ValidatedRequest::ShowProvider(_) => ToolName::ShowProvider,
            ValidatedRequest::ListEnvironments(_) => ToolName::ListEnvironments,
            ValidatedRequest::ShowEnvironment(_) => ToolName::ShowEnvironment,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate arguments for `tool`. `None` is treated as an empty map.
pub fn validate(
    tool: ToolName,
    params: Option<&ToolParameters>,
) -> Result<ValidatedRequest, ValidationError> {
    let empty = ToolParameters::new();
    let params = params.unwrap_or(&empty);
    tracing::debug!(tool = %tool, arguments = ?params, "Validating input arguments");

    let result = match tool {
        ToolName::ListProviders => validate_list(params).map(ValidatedRequest::ListProviders),
        ToolName::ShowProvider => validate_entity(params).map(ValidatedRequest::ShowProvider),
        ToolName::ListEnvironments => {
            validate_list(params).map(ValidatedRequest::ListEnvironments)
        }
        ToolName::ShowEnvironment => {
            validate_entity(params).map(ValidatedRequest::ShowEnvironment)
        }
    };

    let request = result.map_err(|err| {
        tracing::warn!(tool = %tool, error = %err, "Input validation failed");
        err
    })?;

    tracing::debug!(tool = %tool, parsed_input = ?request, "Input validation successful");
    Ok(request)
}

/// Parse a raw JSON argument document. Anything but a JSON object is a
/// violation on `arguments`.
pub fn parse_arguments(raw: &str) -> Result<ToolParameters, ValidationError> {
    let violation = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected object, got {}", value_type_name(&other)),
        Err(err) => format!("invalid JSON: {err}"),
    };
    Err(ValidationError::new(vec![Violation::new("arguments", violation)]))
}

/// Validate listing arguments, applying defaults.
///
/// `limit` values of zero or below count as "not supplied" and fall back to
/// [`DEFAULT_LIMIT`]; only values above [`MAX_LIMIT`] are rejected.
pub fn validate_list(params: &ToolParameters) -> Result<ListQuery, ValidationError> {
    let mut violations = Vec::new();

    let creator = match present(params, "creator") {
        None => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            violations.push(type_mismatch("creator", "string", other));
            None
        }
    };

    let mut limit = DEFAULT_LIMIT;
    if let Some(value) = present(params, "limit") {
        match integer(value) {
            None => violations.push(type_mismatch("limit", "integer", value)),
            Some(n) if n > i128::from(MAX_LIMIT) => violations.push(Violation::new(
                "limit",
                format!("must be less than or equal to {MAX_LIMIT}, got {n}"),
            )),
            Some(n) if n <= 0 => {}
            // Bounded by MAX_LIMIT above.
            Some(n) => limit = n as u64,
        }
    }

    let mut offset = DEFAULT_OFFSET;
    if let Some(value) = present(params, "offset") {
        match integer(value) {
            None => violations.push(type_mismatch("offset", "integer", value)),
            Some(n) if n < 0 => violations.push(Violation::new(
                "offset",
                format!("must be greater than or equal to 0, got {n}"),
            )),
            Some(n) => match u64::try_from(n) {
                Ok(n) => offset = n,
                Err(_) => violations.push(Violation::new("offset", "exceeds u64 range")),
            },
        }
    }

    if violations.is_empty() {
        Ok(ListQuery {
            creator,
            limit,
            offset,
        })
    } else {
        Err(ValidationError::new(violations))
    }
}

/// Validate single-entity arguments: `id` is required and at least 1.
pub fn validate_entity(params: &ToolParameters) -> Result<EntityQuery, ValidationError> {
    let Some(value) = present(params, "id") else {
        return Err(ValidationError::new(vec![Violation::new("id", "is required")]));
    };

    let violation = match integer(value) {
        None => type_mismatch("id", "integer", value),
        Some(n) if n < 1 => {
            Violation::new("id", format!("must be greater than or equal to 1, got {n}"))
        }
        Some(n) => match u64::try_from(n) {
            Ok(id) => return Ok(EntityQuery { id }),
            Err(_) => Violation::new("id", "exceeds u64 range"),
        },
    };

    Err(ValidationError::new(vec![violation]))
}

/// Look up a key, treating JSON null as absent.
fn present<'a>(params: &'a ToolParameters, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

/// Integral value of a JSON number. Floats qualify only without a fraction.
fn integer(value: &Value) -> Option<i128> {
    if let Some(n) = value.as_i64() {
        return Some(i128::from(n));
    }
    if let Some(n) = value.as_u64() {
        return Some(i128::from(n));
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e30 {
        Some(f as i128)
    } else {
        None
    }
}

fn type_mismatch(field: &str, expected: &str, value: &Value) -> Violation {
    Violation::new(
        field,
        format!("expected {}, got {}", expected, value_type_name(value)),
    )
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Tests
// =============================================================================
