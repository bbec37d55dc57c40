use crate::{Error, Result};

/// Longest accepted user-supplied name.
pub const MAX_INPUT_LEN: usize = 200;

/// Trim and check a user-supplied name before it is sent anywhere.
///
/// Accepts ASCII letters, digits, `_` and spaces only.
pub fn validate_input(input: &str) -> Result<String> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidInput("input cannot be empty".into()));
    }
    if let Some(c) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == ' '))
    {
        return Err(Error::InvalidInput(format!(
            "invalid character '{}': only letters, numbers, underscores and spaces are allowed",
            c
        )));
    }
    if trimmed.len() > MAX_INPUT_LEN {
        return Err(Error::InvalidInput(format!(
            "input is too long ({} characters, max {})",
            trimmed.len(),
            MAX_INPUT_LEN
        )));
    }

    Ok(trimmed.to_string())
}
