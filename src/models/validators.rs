use std::borrow::Cow;

use validator::ValidationError;

use super::robot::NEVER_EXPIRES;

/// Maximum robot name length, in characters.
pub const ROBOT_NAME_MAX_LENGTH: usize = 255;

/// Characters a robot name may not contain. `$` is reserved for the login
/// prefix (`robot$name`) and the rest collide with credential encodings.
pub const ROBOT_NAME_ILLEGAL_CHARS: &[char] = &[',', '~', '#', '$', '%'];

/// Reject robot names containing any of [`ROBOT_NAME_ILLEGAL_CHARS`].
pub fn validate_robot_name_chars(name: &str) -> Result<(), ValidationError> {
    if name.contains(ROBOT_NAME_ILLEGAL_CHARS) {
        let mut err = ValidationError::new("illegal_characters");
        err.message = Some(Cow::Borrowed("robot name contains illegal characters"));
        return Err(err);
    }
    Ok(())
}

/// Accept `-1` (never expires) or any non-negative epoch second.
///
/// Whether the instant lies in the future is a creation-time concern and
/// is not checked here, so this stays a pure function of its input.
pub fn validate_expires_at(expires_at: &i64) -> Result<(), ValidationError> {
    if *expires_at < NEVER_EXPIRES {
        let mut err = ValidationError::new("invalid_expiration");
        err.message = Some(Cow::Borrowed(
            "expiration time must be a positive integer or -1 if set",
        ));
        return Err(err);
    }
    Ok(())
}
