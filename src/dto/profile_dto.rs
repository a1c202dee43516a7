use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::profile::{ROLE_CANDIDATE, ROLE_INTERVIEWER};

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProfileRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 200, message = "Full name is too long"))]
    pub full_name: Option<String>,
    #[validate(custom(function = "validate_role"))]
    pub role: String,
    #[validate(length(max = 2000, message = "Resume URL is too long"))]
    pub resume_url: Option<String>,
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    if role == ROLE_CANDIDATE || role == ROLE_INTERVIEWER {
        Ok(())
    } else {
        Err(ValidationError::new("role")
            .with_message("Role must be 'candidate' or 'interviewer'".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_roles() {
        let req = UpsertProfileRequest {
            email: "a@b.com".to_string(),
            full_name: None,
            role: "admin".to_string(),
            resume_url: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn accepts_both_known_roles() {
        for role in [ROLE_CANDIDATE, ROLE_INTERVIEWER] {
            let req = UpsertProfileRequest {
                email: "a@b.com".to_string(),
                full_name: Some("A B".to_string()),
                role: role.to_string(),
                resume_url: None,
            };
            assert!(req.validate().is_ok());
        }
    }
}
