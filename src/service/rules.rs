//! Field validation rules shared by certificates and reference documents.
//! Patterns match the ones clients already rely on; `\w` is ASCII-only.

use crate::error::AppError;
use regex::{Regex, RegexBuilder};
use std::fmt::Display;
use std::sync::OnceLock;

pub const EMAIL_PATTERN: &str = r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$";
pub const PHONE_PATTERN: &str = r"^[0-9]{10}$";
pub const PINCODE_PATTERN: &str = r"^[0-9]{6}$";
pub const TIME_PATTERN: &str = r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        RegexBuilder::new(pattern)
            .unicode(false)
            .build()
            .unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
    })
}

fn matches(cell: &'static OnceLock<Regex>, pattern: &str, value: &str) -> bool {
    compiled(cell, pattern).is_match(value)
}

/// Value must be non-empty after trimming.
pub fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn email(field: &str, value: &str) -> Result<(), AppError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if !matches(&RE, EMAIL_PATTERN, value) {
        return Err(AppError::Validation(format!("{}: Please enter a valid email", field)));
    }
    Ok(())
}

pub fn phone(field: &str, value: &str) -> Result<(), AppError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if !matches(&RE, PHONE_PATTERN, value) {
        return Err(AppError::Validation(format!(
            "{}: Please enter a valid 10-digit phone number",
            field
        )));
    }
    Ok(())
}

pub fn pincode(field: &str, value: &str) -> Result<(), AppError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if !matches(&RE, PINCODE_PATTERN, value) {
        return Err(AppError::Validation(format!(
            "{}: Please enter a valid 6-digit pincode",
            field
        )));
    }
    Ok(())
}

pub fn time_of_day(field: &str, value: &str) -> Result<(), AppError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if !matches(&RE, TIME_PATTERN, value) {
        return Err(AppError::Validation(format!(
            "{}: Please enter time in HH:MM format",
            field
        )));
    }
    Ok(())
}

pub fn max_length(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn minimum<T: PartialOrd + Display>(field: &str, value: T, min: T) -> Result<(), AppError> {
    if value < min {
        return Err(AppError::Validation(format!("{} must be at least {}", field, min)));
    }
    Ok(())
}

pub fn range<T: PartialOrd + Display>(field: &str, value: T, min: T, max: T) -> Result<(), AppError> {
    minimum(field, &value, &min)?;
    if value > max {
        return Err(AppError::Validation(format!("{} must be at most {}", field, max)));
    }
    Ok(())
}

/// Rejects NaN and infinities before range checks, which would otherwise pass them.
pub fn finite(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::Validation(format!("{} must be a finite number", field)));
    }
    Ok(())
}
