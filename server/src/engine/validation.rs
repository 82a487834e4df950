/// Maximum message content length (bytes).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum room name length.
pub const MAX_ROOM_NAME_LENGTH: usize = 50;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

use super::error::ChatError;

/// Validate a username. Returns the trimmed name. Must be non-empty after
/// trimming and within the length limit.
pub fn validate_username(name: &str) -> Result<&str, ChatError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::validation("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LENGTH {
        return Err(ChatError::Validation(format!(
            "Username too long (max {} characters)",
            MAX_USERNAME_LENGTH
        )));
    }
    Ok(name)
}

/// Validate a room name. Returns the trimmed name. Must be non-empty after
/// trimming, within the length limit, and contain no spaces.
pub fn validate_room_name(name: &str) -> Result<&str, ChatError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::validation("Room name cannot be empty"));
    }
    if name.len() > MAX_ROOM_NAME_LENGTH {
        return Err(ChatError::Validation(format!(
            "Room name too long (max {} characters)",
            MAX_ROOM_NAME_LENGTH
        )));
    }
    if name.contains(' ') {
        return Err(ChatError::validation("Room name cannot contain spaces"));
    }
    Ok(name)
}

/// Validate message content. Returns the trimmed body, or `None` when it is
/// empty after trimming — empty messages are silently dropped, not an error.
pub fn validate_message(content: &str) -> Result<Option<&str>, ChatError> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }
    if content.len() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::Validation(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(Some(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert_eq!(validate_username("alice").unwrap(), "alice");
        assert_eq!(validate_username("  bob  ").unwrap(), "bob");
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_valid_room_names() {
        assert_eq!(validate_room_name("general").unwrap(), "general");
        assert_eq!(validate_room_name(" rust ").unwrap(), "rust");
    }

    #[test]
    fn test_invalid_room_names() {
        assert!(validate_room_name("").is_err());
        assert!(validate_room_name("has space").is_err());
        assert!(validate_room_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_message_validation() {
        assert_eq!(validate_message("hello").unwrap(), Some("hello"));
        assert_eq!(validate_message("  hi  ").unwrap(), Some("hi"));
        // Empty after trimming is dropped silently, not rejected
        assert_eq!(validate_message("").unwrap(), None);
        assert_eq!(validate_message("   ").unwrap(), None);
        assert!(validate_message(&"a".repeat(2001)).is_err());
    }
}
