//! Session gate over the patron registry

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    error::{AppError, AppResult},
    models::{Patron, Role},
};

use super::patrons::PatronManager;

/// Tracks the single logged-in patron of a desk session
#[derive(Debug, Clone, Default)]
pub struct AccessController {
    current: Option<String>,
}

impl AccessController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check credentials and open a session. A previous session is replaced.
    pub fn login(&mut self, patrons: &PatronManager, username: &str, password: &str) -> AppResult<Patron> {
        let patron = authenticate(patrons, username, password)?.clone();
        tracing::info!(username = %username, "Session opened");
        self.current = Some(patron.username.clone());
        Ok(patron)
    }

    /// Close the session; returns who was logged in
    pub fn logout(&mut self) -> Option<String> {
        let previous = self.current.take();
        if let Some(ref username) = previous {
            tracing::info!(username = %username, "Session closed");
        }
        previous
    }

    pub fn current_username(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The logged-in patron, if the session is open and they still exist
    pub fn current_user<'a>(&self, patrons: &'a PatronManager) -> Option<&'a Patron> {
        self.current.as_deref().and_then(|username| patrons.find(username))
    }

    /// The logged-in patron, provided their role is at least `role`
    pub fn require<'a>(&self, patrons: &'a PatronManager, role: Role) -> AppResult<&'a Patron> {
        let patron = self
            .current_user(patrons)
            .ok_or_else(|| AppError::Authentication("No active session".to_string()))?;
        if patron.role < role {
            return Err(AppError::Authorization(format!("{} role required", role)));
        }
        Ok(patron)
    }

    /// Create a patron with a freshly hashed password
    pub fn register(
        &self,
        patrons: &mut PatronManager,
        username: &str,
        password: &str,
        role: Role,
    ) -> AppResult<()> {
        if password.is_empty() {
            return Err(AppError::Validation("Password must not be empty".to_string()));
        }
        let hash = hash_password(password)?;
        patrons.add(Patron::new(username.trim(), hash, role))
    }

    /// Remove the logged-in patron and close the session
    pub fn delete_current_user(&mut self, patrons: &mut PatronManager) -> AppResult<Patron> {
        let username = self
            .current
            .clone()
            .ok_or_else(|| AppError::Authentication("No active session".to_string()))?;
        let removed = patrons.remove(&username)?;
        self.current = None;
        Ok(removed)
    }
}

/// Look up `username` and check `password` against the stored credential
pub fn authenticate<'a>(patrons: &'a PatronManager, username: &str, password: &str) -> AppResult<&'a Patron> {
    let patron = patrons
        .find(username)
        .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;
    if !verify_password(&patron.password, password)? {
        tracing::debug!(username = %username, "Password mismatch");
        return Err(AppError::Authentication(
            "Invalid username or password".to_string(),
        ));
    }
    Ok(patron)
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify against an Argon2 PHC string, or compare verbatim for plain
/// credentials carried over from older patron files.
pub fn verify_password(stored: &str, candidate: &str) -> AppResult<bool> {
    if stored.starts_with("$argon2") {
        let parsed_hash = PasswordHash::new(stored)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        return Ok(Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed_hash)
            .is_ok());
    }
    Ok(stored == candidate)
}
