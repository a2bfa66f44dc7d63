use std::collections::HashMap;

use crate::error::ApiError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 100;
pub const CODE_MAX: usize = 100;

/// Accumulates per-field problems so one response can report all of them
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(reason) = result {
            self.errors.entry(field.to_string()).or_insert(reason);
        }
        self
    }

    pub fn add(&mut self, field: &str, reason: impl Into<String>) -> &mut Self {
        self.errors.entry(field.to_string()).or_insert_with(|| reason.into());
        self
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = if self.errors.len() == 1 {
            self.errors.values().next().cloned().unwrap_or_default()
        } else {
            "Validation failed".to_string()
        };
        Err(ApiError::validation_error(message, Some(self.errors)))
    }
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    let len = username.chars().count();
    if len < USERNAME_MIN {
        return Err(format!("Username must be at least {} characters", USERNAME_MIN));
    }
    if len > USERNAME_MAX {
        return Err(format!("Username must be at most {} characters", USERNAME_MAX));
    }

    // Allow alphanumeric, underscore, hyphen
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err("Username can only contain letters, numbers, underscore, and hyphen".to_string());
    }

    if !username.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err("Username must start with a letter or number".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        return Err(format!("Password must be at least {} characters", PASSWORD_MIN));
    }
    if len > PASSWORD_MAX {
        return Err(format!("Password must be at most {} characters", PASSWORD_MAX));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > 255 {
        return Err("Email is too long".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format".to_string());
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }
    // domain needs a dot with something on both sides
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err("Invalid email format".to_string()),
    }
}

/// Role and permission codes: lowercase letters, digits, `_`, `-` and `:`
pub fn validate_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("Code is required".to_string());
    }
    if code.len() > CODE_MAX {
        return Err(format!("Code must be at most {} characters", CODE_MAX));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | ':'))
    {
        return Err("Code can only contain lowercase letters, digits, '_', '-' and ':'".to_string());
    }
    Ok(())
}

pub fn validate_required(value: &str, label: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.chars().count() > max {
        return Err(format!("{} must be at most {} characters", label, max));
    }
    Ok(())
}

/// Trim and turn blank strings into None
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Remove duplicate ids while keeping first-seen order
pub fn dedup_ids(ids: &[uuid::Uuid]) -> Vec<uuid::Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// 400 listing every id in `requested` that is not in `existing`
pub fn ensure_ids_exist(
    field: &str,
    what: &str,
    requested: &[uuid::Uuid],
    existing: &[uuid::Uuid],
) -> Result<(), ApiError> {
    let missing: Vec<String> = requested
        .iter()
        .filter(|id| !existing.contains(id))
        .map(|id| id.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ApiError::invalid_field(
        field,
        format!("Unknown {}: {}", what, missing.join(", ")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_are_reported() {
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        assert!(ensure_ids_exist("role_ids", "role ids", &[a], &[a, b]).is_ok());

        let err = ensure_ids_exist("role_ids", "role ids", &[a, b], &[a]).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains(&b.to_string()));
        assert!(!err.message().contains(&a.to_string()));
    }

    #[test]
    fn usernames() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("john_doe-2").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("_hidden").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"x".repeat(101)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("first.last@example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn codes() {
        assert!(validate_code("user:assign-role").is_ok());
        assert!(validate_code("super_admin").is_ok());
        assert!(validate_code("User:View").is_err());
        assert!(validate_code("").is_err());
    }

    #[test]
    fn field_errors_collect_all_failures() {
        let mut errors = FieldErrors::new();
        errors
            .check("username", validate_username("x"))
            .check("password", validate_password("1"))
            .check("email", validate_email("ok@example.com"));

        let err = errors.into_result().unwrap_err();
        let body = err.to_json();
        assert_eq!(body["message"], "Validation failed");
        assert!(body["data"]["field_errors"]["username"].is_string());
        assert!(body["data"]["field_errors"]["password"].is_string());
        assert!(body["data"]["field_errors"].get("email").is_none());
    }

    #[test]
    fn dedup_keeps_order() {
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        assert_eq!(dedup_ids(&[a, b, a, b]), vec![a, b]);
    }
}
