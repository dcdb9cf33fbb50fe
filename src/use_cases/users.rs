use crate::domain::{User, UserError};

// Sentinel id that simulates a missing user.
const MISSING_USER_ID: &str = "404";

pub const DEFAULT_USER_NAME: &str = "min";
pub const DEFAULT_USER_EMAIL: &str = "min@mail.example.com";

// Fixture user service; every answer is synthesized from the request.
#[derive(Debug, Clone)]
pub struct UserService {
    default_name: String,
    default_email: String,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new(DEFAULT_USER_NAME, DEFAULT_USER_EMAIL)
    }
}

impl UserService {
    pub fn new(default_name: impl Into<String>, default_email: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
            default_email: default_email.into(),
        }
    }

    // Echo the submitted user back to the caller.
    pub fn create_user(&self, user: Option<User>) -> Option<User> {
        user
    }

    // List users matching `name`; always a single synthesized entry.
    pub fn list_users(&self, name: &str) -> Vec<User> {
        vec![User {
            id: "1".to_string(),
            name: name.to_string(),
            email: self.default_email.clone(),
        }]
    }

    // Look up a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, UserError> {
        if id == MISSING_USER_ID {
            return Err(UserError::NotFound { id: id.to_string() });
        }

        Ok(User {
            id: id.to_string(),
            name: self.default_name.clone(),
            email: self.default_email.clone(),
        })
    }
}
