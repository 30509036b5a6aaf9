//! Input validation for login and registration.
//!
//! Every rule records a field-level message instead of failing fast, so a
//! single response reports all problems with the submitted input.

use regex::Regex;
use std::fmt;

use super::{error::FieldErrors, model::LoginRequest};

pub(crate) const MAX_LENGTH: usize = 255;

pub(crate) const EMAIL_INVALID: &str = "The email must be a valid email address.";
pub(crate) const EMAIL_TAKEN: &str = "The email has already been taken.";
pub(crate) const PASSWORD_MISMATCH: &str = "The password confirmation does not match.";

pub(crate) fn required_message(field: &str) -> String {
    format!("The {field} field is required.")
}

pub(crate) fn too_long_message(field: &str) -> String {
    format!("The {field} may not be greater than {MAX_LENGTH} characters.")
}

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email_normalized))
}

/// Validated login input.
pub(super) struct Credentials {
    pub(super) email: String,
    pub(super) password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

pub(super) fn login(request: &LoginRequest) -> Result<Credentials, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = match present(request.email.as_deref().map(str::trim)) {
        None => {
            errors.add("email", required_message("email"));
            None
        }
        Some(email) => {
            let email = normalize_email(email);
            if valid_email(&email) {
                Some(email)
            } else {
                errors.add("email", EMAIL_INVALID);
                None
            }
        }
    };

    let password = present(request.password.as_deref());
    if password.is_none() {
        errors.add("password", required_message("password"));
    }

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok(Credentials {
            email,
            password: password.to_string(),
        }),
        _ => Err(errors),
    }
}

/// `required|max:255`, trimmed.
pub(super) fn name(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let Some(name) = present(value.map(str::trim)) else {
        errors.add("name", required_message("name"));
        return None;
    };

    if name.chars().count() > MAX_LENGTH {
        errors.add("name", too_long_message("name"));
        return None;
    }

    Some(name.to_string())
}

/// `required|email|max:255`, normalized. Uniqueness is checked against the store by the caller.
pub(super) fn email(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let Some(email) = present(value.map(str::trim)) else {
        errors.add("email", required_message("email"));
        return None;
    };

    let email = normalize_email(email);
    let mut ok = true;
    if !valid_email(&email) {
        errors.add("email", EMAIL_INVALID);
        ok = false;
    }
    if email.chars().count() > MAX_LENGTH {
        errors.add("email", too_long_message("email"));
        ok = false;
    }

    ok.then_some(email)
}

/// `required|confirmed`. Passwords are compared verbatim, never trimmed.
pub(super) fn confirmed_password(
    errors: &mut FieldErrors,
    password: Option<&str>,
    confirmation: Option<&str>,
) -> Option<String> {
    let Some(password) = present(password) else {
        errors.add("password", required_message("password"));
        return None;
    };

    if confirmation != Some(password) {
        errors.add("password", PASSWORD_MISMATCH);
        return None;
    }

    Some(password.to_string())
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
