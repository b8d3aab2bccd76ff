use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    policy::Policy,
    validators::{validate_expires_at, validate_robot_name_chars},
};

/// Request to create a new robot account.
///
/// Consumed exactly once by [`RobotService::create`](crate::services::RobotService::create).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRobot {
    /// Bare robot name (no login prefix)
    #[validate(
        length(min = 1, max = 255, message = "robot name with illegal length"),
        custom(function = "validate_robot_name_chars")
    )]
    pub name: String,
    /// Owning project
    #[serde(alias = "pid")]
    pub project_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// Create the account already disabled
    #[serde(default)]
    pub disabled: bool,
    /// Epoch seconds; `-1` never expires, `0` takes the configured default lifetime
    #[serde(default)]
    #[validate(custom(function = "validate_expires_at_value"))]
    pub expires_at: i64,
    /// Not settable from the outside; internal callers create hidden robots
    #[serde(skip, default = "default_visible")]
    pub visible: bool,
    /// Initial grants, in request order
    #[serde(default, alias = "access")]
    pub policies: Vec<Policy>,
}

// validator passes `Copy` fields by value; adapt to the by-reference validator.
fn validate_expires_at_value(expires_at: i64) -> Result<(), validator::ValidationError> {
    validate_expires_at(&expires_at)
}

fn default_visible() -> bool {
    true
}

impl CreateRobot {
    pub fn new(name: impl Into<String>, project_id: i64) -> Self {
        Self {
            name: name.into(),
            project_id,
            description: None,
            disabled: false,
            expires_at: 0,
            visible: true,
            policies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_policies(mut self, policies: Vec<Policy>) -> Self {
        self.policies = policies;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Which rule a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    InvalidName,
    InvalidExpiration,
}

/// One validation failure on one field of a [`CreateRobot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Fields checked by [`validate_create_robot`], in reporting order.
const CHECKED_FIELDS: &[(&str, FieldErrorKind)] = &[
    ("name", FieldErrorKind::InvalidName),
    ("expires_at", FieldErrorKind::InvalidExpiration),
];

/// Check a creation request and report every violation at once.
///
/// Pure: no clock, no store, no shared validator state. Errors come back in
/// field order (name, then expiration) so callers see a stable list.
pub fn validate_create_robot(input: &CreateRobot) -> Result<(), Vec<FieldError>> {
    let Err(errors) = input.validate() else {
        return Ok(());
    };

    let by_field = errors.field_errors();
    let mut out = Vec::new();
    for (field, kind) in CHECKED_FIELDS {
        let Some(errs) = by_field.get(*field) else {
            continue;
        };
        for err in errs.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            out.push(FieldError::new(*field, *kind, message));
        }
    }

    Err(out)
}
