//! Input validators. `Err` carries the message reported to the caller.

use serde_json::Value;

/// Minimum password length accepted by [`password`].
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A string with exactly one `@`, something before it, and a dotted domain after it.
pub fn email(value: &Value) -> Result<(), String> {
    let s = value.as_str().ok_or("email must be a string")?;
    let valid = match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("This is not a valid email".to_string())
    }
}

/// A string of at least [`MIN_PASSWORD_LENGTH`] characters.
pub fn password(value: &Value) -> Result<(), String> {
    let s = value.as_str().ok_or("password must be a string")?;
    if s.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"));
    }
    Ok(())
}
