//! Patron (library user) model

use serde::{Deserialize, Serialize};

use crate::collections::{djb2, Keyed};

/// Patron role; administrators outrank regular patrons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Role {
    #[default]
    Regular = 0,
    Administrator = 1,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Administrator => "administrator",
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role as u8
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Regular),
            1 => Ok(Role::Administrator),
            other => Err(format!("Invalid role code: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" | "user" | "0" => Ok(Role::Regular),
            "administrator" | "admin" | "1" => Ok(Role::Administrator),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Library patron keyed by username
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patron {
    pub username: String,
    /// Opaque credential: an argon2 PHC string or a legacy plain value
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
}

impl Patron {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

impl Keyed for Patron {
    type Key = str;

    fn key(&self) -> &str {
        &self.username
    }

    fn hash_key(key: &str) -> u64 {
        djb2(key)
    }
}
