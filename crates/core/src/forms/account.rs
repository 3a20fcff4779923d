//! Registration, login and profile forms.

use serde::{Deserialize, Serialize};

use super::{ValidationErrors, Violation};
use crate::types::{Email, Locale, UserRole};

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length; argon2 work grows with input size.
pub const MAX_PASSWORD_LENGTH: usize = 128;
/// Maximum display name length.
pub const MAX_NAME_LENGTH: usize = 100;

/// `POST /api/auth/register` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    /// `customer` or `seller`; defaults to `customer`.
    pub account_type: Option<UserRole>,
    pub preferred_locale: Option<Locale>,
}

/// A validated registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: Email,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub preferred_locale: Option<Locale>,
}

impl RegisterForm {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = Email::parse(&self.email);
        if email.is_err() {
            errors.add("email", Violation::InvalidFormat);
        }

        check_password(&mut errors, "password", &self.password);
        let name = errors.required_text("name", &self.name, MAX_NAME_LENGTH);
        let phone = errors.optional_phone("phone", self.phone.as_deref());

        let role = self.account_type.unwrap_or_default();
        if role == UserRole::Admin {
            errors.add("accountType", Violation::InvalidFormat);
        }

        match email {
            Ok(email) => errors.finish(Registration {
                email,
                password: self.password,
                name,
                phone,
                role,
                preferred_locale: self.preferred_locale,
            }),
            Err(_) => Err(errors),
        }
    }
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl LoginForm {
    /// Check both fields are present and the email is well formed.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = Email::parse(&self.email);
        if email.is_err() {
            errors.add("email", Violation::InvalidFormat);
        }
        if self.password.is_empty() {
            errors.add("password", Violation::Required);
        }

        match email {
            Ok(email) => errors.finish(Credentials {
                email,
                password: self.password,
            }),
            Err(_) => Err(errors),
        }
    }
}

/// `PATCH /api/auth/me` body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub preferred_locale: Option<Locale>,
}

/// Fields to write back to the user document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_locale: Option<Locale>,
}

impl ProfileForm {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`].
    pub fn validate(self) -> Result<ProfileChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self
            .name
            .map(|name| errors.required_text("name", &name, MAX_NAME_LENGTH));
        let phone = errors.optional_phone("phone", self.phone.as_deref());

        errors.finish(ProfileChanges {
            name,
            phone,
            preferred_locale: self.preferred_locale,
        })
    }
}

fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    let length = password.chars().count();
    if length == 0 {
        errors.add(field, Violation::Required);
    } else if length < MIN_PASSWORD_LENGTH {
        errors.add(field, Violation::TooShort { min: MIN_PASSWORD_LENGTH });
    } else if length > MAX_PASSWORD_LENGTH {
        errors.add(field, Violation::TooLong { max: MAX_PASSWORD_LENGTH });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register() -> RegisterForm {
        RegisterForm {
            email: " Layla@Example.COM ".to_owned(),
            password: "correct horse".to_owned(),
            name: "Layla".to_owned(),
            ..RegisterForm::default()
        }
    }

    #[test]
    fn test_register_normalizes_email_and_defaults_role() {
        let registration = register().validate().unwrap();
        assert_eq!(registration.email.as_str(), "layla@example.com");
        assert_eq!(registration.role, UserRole::Customer);
    }

    #[test]
    fn test_register_short_password() {
        let form = RegisterForm {
            password: "short".to_owned(),
            ..register()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.errors()[0].violation,
            Violation::TooShort { min: MIN_PASSWORD_LENGTH }
        );
    }

    #[test]
    fn test_register_rejects_admin_account_type() {
        let form = RegisterForm {
            account_type: Some(UserRole::Admin),
            ..register()
        };
        assert!(form.validate().unwrap_err().has("accountType"));
    }

    #[test]
    fn test_register_collects_all_errors() {
        let errors = RegisterForm::default().validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("password"));
        assert!(errors.has("name"));
    }

    #[test]
    fn test_register_form_from_json() {
        let form: RegisterForm = serde_json::from_str(
            r#"{"email":"a@b.co","password":"12345678","name":"A","accountType":"seller"}"#,
        )
        .unwrap();
        assert_eq!(form.validate().unwrap().role, UserRole::Seller);
    }

    #[test]
    fn test_login_requires_password() {
        let form = LoginForm {
            email: "a@b.co".to_owned(),
            password: String::new(),
        };
        assert!(form.validate().unwrap_err().has("password"));
    }

    #[test]
    fn test_profile_changes_skip_absent_fields() {
        let changes = ProfileForm {
            name: Some("  Omar ".to_owned()),
            ..ProfileForm::default()
        }
        .validate()
        .unwrap();
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({"name": "Omar"})
        );
    }
}
