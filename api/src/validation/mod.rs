//! Input Validation Module
//!
//! The validation gate that every submitted query passes before it reaches
//! the store.
//!
//! # Overview
//!
//! 1. **Extractors** - `JsonBody<T>` plus the error types shared by all checks
//! 2. **Validators** - Reusable field checks (email syntax, required values)
//! 3. **Requests** - `Validatable` implementations for request bodies
//!
//! # Validation Error Response
//!
//! When validation fails, a 400 Bad Request lists every failing field:
//!
//! ```json
//! {
//!   "error": "ValidationError",
//!   "message": "Validation failed for 2 fields",
//!   "errors": [
//!     {"field": "email", "message": "Please enter a valid email address."},
//!     {"field": "message", "message": "Message is required."}
//!   ],
//!   "code": 400,
//!   "timestamp": "2026-02-20T10:30:00Z",
//!   "correlation_id": "uuid-here"
//! }
//! ```

pub mod extractors;
pub mod requests;
pub mod validators;

pub use extractors::{
    FieldError, JsonBody, Validatable, ValidationBuilder, ValidationError,
    ValidationErrorResponse,
};
pub use validators::{validate_email, validate_required};
