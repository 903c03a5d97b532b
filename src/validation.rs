// Validation helpers shared by request DTOs

use validator::ValidationError;

/// Rejects empty and whitespace-only text
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Maria").is_ok());
        assert!(validate_not_blank(" x ").is_ok());
        for blank in ["", "   ", "\t\n"] {
            assert!(validate_not_blank(blank).is_err());
        }
    }
}
