//! Sign-in and registration forms.
//!
//! Forms are checked locally before anything is sent to the backend, so a
//! mistyped confirmation never costs a round-trip.

use crate::backend::{Credentials, Registration};
use std::fmt;
use validator::{Validate, ValidationErrors};

/// The login form.
#[derive(Debug, Clone, Default, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl LoginForm {
    const FIELDS: &'static [&'static str] = &["email", "password"];

    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// Validate and turn the form into backend credentials.
    pub fn into_credentials(self) -> Result<Credentials, FormErrors> {
        self.validate()
            .map_err(|e| FormErrors::from_validation(&e, Self::FIELDS))?;
        Ok(Credentials::new(self.email, self.password))
    }
}

/// The registration form.
#[derive(Debug, Clone, Default, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl RegisterForm {
    const FIELDS: &'static [&'static str] = &["name", "email", "password", "confirm_password"];

    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Validate and turn the form into a backend registration.
    pub fn into_registration(self) -> Result<Registration, FormErrors> {
        self.validate()
            .map_err(|e| FormErrors::from_validation(&e, Self::FIELDS))?;
        Ok(Registration::new(self.email, self.password, self.name))
    }
}

/// One message per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FormErrors {
    /// Collect validator output, keeping the first message of each field and
    /// ordering fields as they appear on the form.
    fn from_validation(errors: &ValidationErrors, order: &[&str]) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                let first = errs.first()?;
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                Some(FieldError {
                    field: field.to_string(),
                    message,
                })
            })
            .collect();

        let rank = |field: &str| order.iter().position(|f| *f == field).unwrap_or(order.len());
        fields.sort_by_key(|e| rank(e.field.as_str()));
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    /// The message for `field`, if it failed.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.fields.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_login() {
        let creds = LoginForm::new(" anna@example.com ", "secret1")
            .into_credentials()
            .unwrap();
        assert_eq!(creds.email, "anna@example.com");
    }

    #[test]
    fn test_login_errors_in_form_order() {
        let errors = LoginForm::new("not-an-email", "123")
            .into_credentials()
            .unwrap_err();
        let fields: Vec<&str> = errors.fields().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["email", "password"]);
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn test_register_password_mismatch() {
        let errors = RegisterForm::new("Anna Petrova", "anna@example.com", "secret1", "secret2")
            .into_registration()
            .unwrap_err();
        assert_eq!(errors.fields().len(), 1);
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
        assert_eq!(errors.to_string(), "Passwords do not match");
    }

    #[test]
    fn test_register_short_name() {
        let errors = RegisterForm::new("An", "anna@example.com", "secret1", "secret1")
            .into_registration()
            .unwrap_err();
        assert_eq!(errors.get("name"), Some("Name must be at least 3 characters"));
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn test_valid_registration() {
        let reg = RegisterForm::new("Anna Petrova", "anna@example.com", "secret1", "secret1")
            .into_registration()
            .unwrap();
        assert_eq!(reg.name, "Anna Petrova");
    }
}
