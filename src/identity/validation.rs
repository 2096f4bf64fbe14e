//! Input checks applied before anything reaches a directory.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{DirectoryError, NewUser, ProfileUpdate};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "password123",
    "admin",
    "qwerty",
    "letmein",
    "welcome",
    "monkey",
    "dragon",
    "master",
];

const STRENGTH_LEVELS: [&str; 6] = ["Very Weak", "Weak", "Fair", "Good", "Strong", "Very Strong"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PasswordReport {
    pub valid: bool,
    pub score: u8,
    pub strength: &'static str,
    pub issues: Vec<String>,
}

/// Score a password against the account policy.
pub fn password_strength(password: &str) -> PasswordReport {
    let mut issues = Vec::new();
    let mut score: i8 = 0;

    let mut check = |ok: bool, issue: &str| {
        if ok {
            score += 1;
        } else {
            issues.push(issue.to_string());
        }
    };

    check(
        password.chars().count() >= MIN_PASSWORD_LEN,
        "Password must be at least 8 characters long",
    );
    check(
        password.chars().any(|c| c.is_ascii_uppercase()),
        "Password must contain at least one uppercase letter",
    );
    check(
        password.chars().any(|c| c.is_ascii_lowercase()),
        "Password must contain at least one lowercase letter",
    );
    check(
        password.chars().any(|c| c.is_ascii_digit()),
        "Password must contain at least one number",
    );
    check(
        password.chars().any(|c| SPECIAL_CHARS.contains(c)),
        "Password must contain at least one special character",
    );

    if password.chars().count() > MAX_PASSWORD_LEN {
        issues.push("Password must be at most 128 characters long".to_string());
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        issues.push("Password is too common".to_string());
        score -= 1;
    }

    let score = score.max(0) as u8;
    PasswordReport {
        valid: issues.is_empty(),
        score,
        strength: STRENGTH_LEVELS[usize::from(score).min(STRENGTH_LEVELS.len() - 1)],
        issues,
    }
}

pub fn validate_email(email: &str) -> Result<(), DirectoryError> {
    if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(email) {
        return Err(DirectoryError::Validation(
            "Email address is not valid".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), DirectoryError> {
    let report = password_strength(password);
    if report.valid {
        Ok(())
    } else {
        Err(DirectoryError::Validation(report.issues.join("; ")))
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), DirectoryError> {
    let len = value.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(DirectoryError::Validation(format!(
            "{field} must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_new_user(new_user: &NewUser) -> Result<(), DirectoryError> {
    validate_email(&new_user.email)?;
    validate_password(&new_user.password)?;
    validate_name("First name", &new_user.first_name)?;
    validate_name("Last name", &new_user.last_name)
}

pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), DirectoryError> {
    if let Some(first) = &update.first_name {
        validate_name("First name", first)?;
    }
    if let Some(last) = &update.last_name {
        validate_name("Last name", last)?;
    }
    Ok(())
}

/// Directories compare emails case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
