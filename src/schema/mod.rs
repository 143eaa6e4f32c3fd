//! Request contracts shared by every handler.
//!
//! Each inbound body deserializes into one of these structs, then `validate()`
//! checks field lengths and formats before any service logic runs. Validation
//! failures accumulate per-field messages and surface as a single 400 with a
//! `field_errors` map, so clients can annotate forms in one round trip.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::sanitize::{
    sanitize_address, sanitize_name, sanitize_phone, sanitize_rich_text, sanitize_text,
    ADDRESS_MAX_CHARS, NAME_MAX_CHARS, PHONE_MAX_CHARS,
};

pub const EMAIL_MAX_CHARS: usize = 254;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 128;
pub const GENDER_MAX_CHARS: usize = 32;
pub const CITY_MAX_CHARS: usize = 100;
pub const POSTAL_CODE_MAX_CHARS: usize = 20;
pub const BIO_MAX_CHARS: usize = 2000;
pub const APPOINTMENT_NAME_MAX_CHARS: usize = 200;
pub const APPOINTMENT_DETAILS_MAX_CHARS: usize = 2000;
pub const LOCATION_MAX_CHARS: usize = 300;
pub const NOTE_HEADER_MAX_CHARS: usize = 200;
pub const NOTE_CONTENT_MAX_CHARS: usize = 5000;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9 ().-]{7,20}$").unwrap());

type FieldErrors = HashMap<String, String>;

fn finish(errors: FieldErrors) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Validation failed", Some(errors)))
    }
}

fn check_required_text(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field.to_string(), "Must not be empty".to_string());
    } else if trimmed.chars().count() > max {
        errors.insert(field.to_string(), format!("Must be at most {} characters", max));
    }
}

fn check_optional_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.insert(field.to_string(), format!("Must be at most {} characters", max));
        }
    }
}

fn check_email(errors: &mut FieldErrors, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert("email".to_string(), "Must not be empty".to_string());
    } else if trimmed.chars().count() > EMAIL_MAX_CHARS {
        errors.insert(
            "email".to_string(),
            format!("Must be at most {} characters", EMAIL_MAX_CHARS),
        );
    } else if !EMAIL_RE.is_match(trimmed) {
        errors.insert("email".to_string(), "Must be a valid email address".to_string());
    }
}

fn check_password(errors: &mut FieldErrors, value: &str) {
    let chars = value.chars().count();
    if chars < PASSWORD_MIN_CHARS {
        errors.insert(
            "password".to_string(),
            format!("Must be at least {} characters", PASSWORD_MIN_CHARS),
        );
    } else if chars > PASSWORD_MAX_CHARS {
        errors.insert(
            "password".to_string(),
            format!("Must be at most {} characters", PASSWORD_MAX_CHARS),
        );
    }
}

fn check_phone(errors: &mut FieldErrors, value: Option<&str>) {
    if let Some(value) = value {
        if !value.trim().is_empty() && !PHONE_RE.is_match(value.trim()) {
            errors.insert("phone".to_string(), "Must be a valid phone number".to_string());
        }
    }
}

// Shared by caregiver and elder profiles.
fn check_birth_date(errors: &mut FieldErrors, value: Option<NaiveDate>) {
    if let Some(date) = value {
        if date > Utc::now().date_naive() {
            errors.insert(
                "date_of_birth".to_string(),
                "Must not be in the future".to_string(),
            );
        }
    }
}

fn check_person_fields(
    errors: &mut FieldErrors,
    gender: Option<&str>,
    phone: Option<&str>,
    address_line: Option<&str>,
    city: Option<&str>,
    postal_code: Option<&str>,
) {
    check_optional_text(errors, "gender", gender, GENDER_MAX_CHARS);
    check_phone(errors, phone);
    check_optional_text(errors, "address_line", address_line, ADDRESS_MAX_CHARS);
    check_optional_text(errors, "city", city, CITY_MAX_CHARS);
    check_optional_text(errors, "postal_code", postal_code, POSTAL_CODE_MAX_CHARS);
}

// Sanitized optional field; values that strip down to nothing become None.
fn clean_opt(value: Option<String>, f: impl Fn(&str) -> String) -> Option<String> {
    value
        .as_deref()
        .map(f)
        .filter(|cleaned| !cleaned.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub bio: Option<String>,
}

impl RegisterRequest {
    /// Runs before [`Self::validate`]: handlers sanitize, then validate, so a
    /// required field that strips down to nothing still fails validation.
    pub fn sanitized(mut self) -> Self {
        self.email = self.email.trim().to_lowercase();
        self.name = sanitize_name(&self.name);
        self.gender = clean_opt(self.gender, |g| sanitize_text(g, GENDER_MAX_CHARS));
        self.phone = clean_opt(self.phone, sanitize_phone);
        self.address_line = clean_opt(self.address_line, sanitize_address);
        self.city = clean_opt(self.city, |c| sanitize_text(c, CITY_MAX_CHARS));
        self.postal_code = clean_opt(self.postal_code, |p| sanitize_text(p, POSTAL_CODE_MAX_CHARS));
        self.bio = clean_opt(self.bio, sanitize_rich_text);
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        check_required_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);
        check_birth_date(&mut errors, self.date_of_birth);
        check_person_fields(
            &mut errors,
            self.gender.as_deref(),
            self.phone.as_deref(),
            self.address_line.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
        );
        check_optional_text(&mut errors, "bio", self.bio.as_deref(), BIO_MAX_CHARS);
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    // No format checks here: a malformed email should fail exactly like a
    // wrong password, without hinting which part was off.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.insert("email".to_string(), "Must not be empty".to_string());
        }
        if self.password.is_empty() {
            errors.insert("password".to_string(), "Must not be empty".to_string());
        }
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.refresh_token.trim().is_empty() {
            errors.insert("refresh_token".to_string(), "Must not be empty".to_string());
        }
        finish(errors)
    }
}

/// Caregiver self-profile update. Every field optional; omitted fields keep
/// their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateCaregiverRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub bio: Option<String>,
}

impl UpdateCaregiverRequest {
    pub fn sanitized(mut self) -> Self {
        self.name = self.name.as_deref().map(sanitize_name);
        self.gender = clean_opt(self.gender, |g| sanitize_text(g, GENDER_MAX_CHARS));
        self.phone = clean_opt(self.phone, sanitize_phone);
        self.address_line = clean_opt(self.address_line, sanitize_address);
        self.city = clean_opt(self.city, |c| sanitize_text(c, CITY_MAX_CHARS));
        self.postal_code = clean_opt(self.postal_code, |p| sanitize_text(p, POSTAL_CODE_MAX_CHARS));
        self.bio = clean_opt(self.bio, sanitize_rich_text);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
            && self.address_line.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
            && self.bio.is_none()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::validation_error("No fields to update", None));
        }
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_required_text(&mut errors, "name", name, NAME_MAX_CHARS);
        }
        check_birth_date(&mut errors, self.date_of_birth);
        check_person_fields(
            &mut errors,
            self.gender.as_deref(),
            self.phone.as_deref(),
            self.address_line.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
        );
        check_optional_text(&mut errors, "bio", self.bio.as_deref(), BIO_MAX_CHARS);
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateElderRequest {
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl CreateElderRequest {
    pub fn sanitized(mut self) -> Self {
        self.name = sanitize_name(&self.name);
        self.gender = clean_opt(self.gender, |g| sanitize_text(g, GENDER_MAX_CHARS));
        self.phone = clean_opt(self.phone, sanitize_phone);
        self.address_line = clean_opt(self.address_line, sanitize_address);
        self.city = clean_opt(self.city, |c| sanitize_text(c, CITY_MAX_CHARS));
        self.postal_code = clean_opt(self.postal_code, |p| sanitize_text(p, POSTAL_CODE_MAX_CHARS));
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_required_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);
        check_birth_date(&mut errors, self.date_of_birth);
        check_person_fields(
            &mut errors,
            self.gender.as_deref(),
            self.phone.as_deref(),
            self.address_line.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
        );
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateElderRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl UpdateElderRequest {
    pub fn sanitized(mut self) -> Self {
        self.name = self.name.as_deref().map(sanitize_name);
        self.gender = clean_opt(self.gender, |g| sanitize_text(g, GENDER_MAX_CHARS));
        self.phone = clean_opt(self.phone, sanitize_phone);
        self.address_line = clean_opt(self.address_line, sanitize_address);
        self.city = clean_opt(self.city, |c| sanitize_text(c, CITY_MAX_CHARS));
        self.postal_code = clean_opt(self.postal_code, |p| sanitize_text(p, POSTAL_CODE_MAX_CHARS));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
            && self.address_line.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::validation_error("No fields to update", None));
        }
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_required_text(&mut errors, "name", name, NAME_MAX_CHARS);
        }
        check_birth_date(&mut errors, self.date_of_birth);
        check_person_fields(
            &mut errors,
            self.gender.as_deref(),
            self.phone.as_deref(),
            self.address_line.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
        );
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub name: String,
    pub details: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl CreateAppointmentRequest {
    pub fn sanitized(mut self) -> Self {
        self.name = sanitize_text(&self.name, APPOINTMENT_NAME_MAX_CHARS);
        self.details = clean_opt(self.details, sanitize_rich_text);
        self.location = clean_opt(self.location, |l| sanitize_text(l, LOCATION_MAX_CHARS));
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_required_text(&mut errors, "name", &self.name, APPOINTMENT_NAME_MAX_CHARS);
        check_optional_text(
            &mut errors,
            "details",
            self.details.as_deref(),
            APPOINTMENT_DETAILS_MAX_CHARS,
        );
        check_optional_text(&mut errors, "location", self.location.as_deref(), LOCATION_MAX_CHARS);
        if self.ends_at <= self.starts_at {
            errors.insert("ends_at".to_string(), "Must be after starts_at".to_string());
        }
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub name: Option<String>,
    pub details: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl UpdateAppointmentRequest {
    pub fn sanitized(mut self) -> Self {
        self.name = self
            .name
            .as_deref()
            .map(|n| sanitize_text(n, APPOINTMENT_NAME_MAX_CHARS));
        self.details = clean_opt(self.details, sanitize_rich_text);
        self.location = clean_opt(self.location, |l| sanitize_text(l, LOCATION_MAX_CHARS));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.details.is_none()
            && self.location.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
    }

    /// When only one end of the window changes, the service re-checks the
    /// ordering against the stored row; here we can only compare a full pair.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::validation_error("No fields to update", None));
        }
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_required_text(&mut errors, "name", name, APPOINTMENT_NAME_MAX_CHARS);
        }
        check_optional_text(
            &mut errors,
            "details",
            self.details.as_deref(),
            APPOINTMENT_DETAILS_MAX_CHARS,
        );
        check_optional_text(&mut errors, "location", self.location.as_deref(), LOCATION_MAX_CHARS);
        if let (Some(starts_at), Some(ends_at)) = (self.starts_at, self.ends_at) {
            if ends_at <= starts_at {
                errors.insert("ends_at".to_string(), "Must be after starts_at".to_string());
            }
        }
        finish(errors)
    }
}

/// JSON form of the calendar import endpoint. The alternative form sends the
/// ICS document itself as the request body, in which case no JSON is parsed.
#[derive(Debug, Deserialize)]
pub struct ImportIcsRequest {
    pub url: Option<String>,
}

impl ImportIcsRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if !self.url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
            errors.insert("url".to_string(), "Must not be empty".to_string());
        }
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub header: String,
    pub content: String,
}

impl CreateNoteRequest {
    pub fn sanitized(mut self) -> Self {
        self.header = sanitize_text(&self.header, NOTE_HEADER_MAX_CHARS);
        self.content = sanitize_rich_text(&self.content);
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_required_text(&mut errors, "header", &self.header, NOTE_HEADER_MAX_CHARS);
        check_required_text(&mut errors, "content", &self.content, NOTE_CONTENT_MAX_CHARS);
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub header: Option<String>,
    pub content: Option<String>,
}

impl UpdateNoteRequest {
    pub fn sanitized(mut self) -> Self {
        self.header = self
            .header
            .as_deref()
            .map(|h| sanitize_text(h, NOTE_HEADER_MAX_CHARS));
        self.content = self.content.as_deref().map(sanitize_rich_text);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.content.is_none()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::validation_error("No fields to update", None));
        }
        let mut errors = FieldErrors::new();
        if let Some(header) = &self.header {
            check_required_text(&mut errors, "header", header, NOTE_HEADER_MAX_CHARS);
        }
        if let Some(content) = &self.content {
            check_required_text(&mut errors, "content", content, NOTE_CONTENT_MAX_CHARS);
        }
        finish(errors)
    }
}

/// Invite creation. Omitted `max_uses` means unlimited redemptions; omitted
/// `expires_in_days` means the code never expires.
#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub max_uses: Option<i32>,
    pub expires_in_days: Option<i64>,
}

impl CreateInviteRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(max_uses) = self.max_uses {
            if max_uses < 1 {
                errors.insert("max_uses".to_string(), "Must be at least 1".to_string());
            }
        }
        if let Some(days) = self.expires_in_days {
            if days < 1 {
                errors.insert(
                    "expires_in_days".to_string(),
                    "Must be at least 1".to_string(),
                );
            }
        }
        finish(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub code: String,
}

impl AcceptInviteRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.code.trim().is_empty() {
            errors.insert("code".to_string(), "Must not be empty".to_string());
        }
        finish(errors)
    }
}
