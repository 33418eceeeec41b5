//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a display name is not only whitespace.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank_name");
        err.message = Some("Name must contain a visible character".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Fairway Four").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("").is_err());
    }
}
