use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn default_active() -> bool {
    true
}

/// Account holder. Declared for the `user` collection; no endpoint reads or writes it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl User {
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Blank("name"));
        }
        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !well_formed {
            return Err(ValidationError::InvalidEmail(self.email));
        }
        Ok(self)
    }
}
