//! Boundary validation for request payloads.
//!
//! Every payload struct implements [`Validate`], which collects all field
//! problems instead of stopping at the first one. Handlers call
//! [`validated`] before touching a store.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Run validation and lift failures into [`ApiError::Validation`].
pub fn validated<T: Validate>(payload: T) -> Result<T, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;
    Ok(payload)
}

pub const MAX_AMOUNT_SCALE: u32 = 2;
pub const MAX_AMOUNT_EXCLUSIVE: i64 = 1_000_000_000_000;

/// Accumulates field errors while a payload is checked.
#[derive(Debug, Default)]
pub struct Errors(Vec<FieldError>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Length check on the trimmed value, counted in characters.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            if min <= 1 {
                self.push(field, format!("{} is required", label(field)));
            } else {
                self.push(
                    field,
                    format!("{} must be at least {min} characters", label(field)),
                );
            }
        } else if len > max {
            self.push(
                field,
                format!("{} cannot exceed {max} characters", label(field)),
            );
        }
    }

    /// Money amounts: positive, at most two decimal places and below
    /// [`MAX_AMOUNT_EXCLUSIVE`], which is what a `NUMERIC(14, 2)` column holds.
    pub fn amount(&mut self, field: &str, label: &str, value: Decimal) {
        if value <= Decimal::ZERO {
            self.push(field, format!("{label} must be greater than 0"));
        } else if value.normalize().scale() > MAX_AMOUNT_SCALE {
            self.push(
                field,
                format!("{label} cannot have more than {MAX_AMOUNT_SCALE} decimal places"),
            );
        } else if value >= Decimal::from(MAX_AMOUNT_EXCLUSIVE) {
            self.push(
                field,
                format!("{label} must be less than {MAX_AMOUNT_EXCLUSIVE}"),
            );
        }
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

fn label(field: &str) -> String {
    let mut chars = field.replace('_', " ").chars().collect::<Vec<_>>();
    if let Some(first) = chars.first_mut() {
        first.make_ascii_uppercase();
    }
    chars.into_iter().collect()
}

pub fn is_hex_color(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

/// Loose shape check: one `@`, a non-empty local part and a dotted domain.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
