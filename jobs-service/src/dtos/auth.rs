use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(alias = "email")]
    #[validate(email(message = "Please provide a valid email"))]
    pub handle: String,

    #[serde(alias = "password")]
    #[validate(length(min = 1, max = 128, message = "Password must be 1 to 128 characters"))]
    pub secret: String,

    #[serde(rename = "displayName", alias = "name")]
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    #[validate(length(min = 1, message = "Please provide an email"))]
    pub handle: String,

    #[serde(alias = "password")]
    #[validate(length(min = 1, message = "Please provide a password"))]
    pub secret: String,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub handle: String,
    pub display_name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            handle: user.email.clone(),
            display_name: user.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub identity: Identity,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_field_aliases() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.com",
            "password": "pw",
            "name": "A"
        }))
        .unwrap();
        assert_eq!(req.handle, "a@b.com");
        assert_eq!(req.display_name, "A");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_rejects_bad_fields() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "handle": "not-an-email",
            "secret": "",
            "displayName": ""
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }
}
