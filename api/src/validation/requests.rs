//! Validation implementations for API request types

use shared::CreateQueryRequest;

use super::extractors::{FieldError, Validatable, ValidationBuilder};
use super::validators::{validate_email, validate_required};

impl Validatable for CreateQueryRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        ValidationBuilder::new()
            .check("email", || validate_email(&self.email))
            .check("message", || validate_required(&self.message))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validators::{INVALID_EMAIL_MESSAGE, MESSAGE_REQUIRED_MESSAGE};

    #[test]
    fn valid_request_passes() {
        assert!(CreateQueryRequest::new("a@b.com", "hello").validate().is_ok());
    }

    #[test]
    fn invalid_email_is_reported() {
        let errors = CreateQueryRequest::new("not-an-email", "hello")
            .validate()
            .unwrap_err();
        assert_eq!(errors, vec![FieldError::new("email", INVALID_EMAIL_MESSAGE)]);
    }

    #[test]
    fn empty_message_is_reported() {
        let errors = CreateQueryRequest::new("a@b.com", "").validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("message", MESSAGE_REQUIRED_MESSAGE)]);
    }

    #[test]
    fn both_failures_are_reported_together() {
        let errors = CreateQueryRequest::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("email", INVALID_EMAIL_MESSAGE),
                FieldError::new("message", MESSAGE_REQUIRED_MESSAGE),
            ]
        );
    }

    #[test]
    fn whitespace_message_is_accepted() {
        assert!(CreateQueryRequest::new("a@b.com", "   ").validate().is_ok());
    }
}
