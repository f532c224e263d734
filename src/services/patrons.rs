//! Patron registry service

use crate::{
    collections::{IndexedCollection, SortOrder},
    error::{AppError, AppResult},
    models::Patron,
};

use super::circulation::PatronDirectory;

/// Owns the patron collection, keyed by username
#[derive(Debug, Clone, Default)]
pub struct PatronManager {
    patrons: IndexedCollection<Patron>,
}

impl PatronManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, patron: Patron) -> AppResult<()> {
        validate_username(&patron.username)?;
        if self.patrons.contains_key(&patron.username) {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                patron.username
            )));
        }
        tracing::info!(username = %patron.username, role = %patron.role, "Patron registered");
        self.patrons.insert(patron);
        Ok(())
    }

    pub fn remove(&mut self, username: &str) -> AppResult<Patron> {
        let position = self.position(username)?;
        let removed = self.patrons.remove_at(position)?;
        tracing::info!(username = %username, "Patron removed");
        Ok(removed)
    }

    /// Replace a patron record. A rename must not collide with another
    /// existing username.
    pub fn update(&mut self, username: &str, updated: Patron) -> AppResult<()> {
        validate_username(&updated.username)?;
        let position = self.position(username)?;
        if updated.username != username && self.patrons.contains_key(&updated.username) {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                updated.username
            )));
        }
        self.patrons.replace_at(position, updated)?;
        Ok(())
    }

    /// Remove every listed patron that exists; true only if all were removed
    pub fn remove_many<S: AsRef<str>>(&mut self, usernames: &[S]) -> bool {
        let mut all_removed = true;
        for username in usernames {
            if self.remove(username.as_ref()).is_err() {
                all_removed = false;
            }
        }
        all_removed
    }

    /// Bulk load; invalid or repeated usernames are dropped with a warning
    pub fn restore(&mut self, patrons: impl IntoIterator<Item = Patron>) {
        self.patrons.clear();
        for patron in patrons {
            if validate_username(&patron.username).is_err()
                || self.patrons.contains_key(&patron.username)
            {
                tracing::warn!(username = %patron.username, "Skipping invalid patron record");
                continue;
            }
            self.patrons.insert_deferred(patron);
        }
        self.patrons.rebuild_index();
    }

    pub fn find(&self, username: &str) -> Option<&Patron> {
        self.patrons.find(username)
    }

    pub fn get(&self, username: &str) -> AppResult<&Patron> {
        self.find(username)
            .ok_or_else(|| AppError::PatronNotFound(username.to_string()))
    }

    /// Patrons whose username contains `keyword`
    pub fn fuzzy_search(&self, keyword: &str) -> Vec<Patron> {
        let keyword = keyword.trim();
        self.patrons
            .iter()
            .filter(|p| p.username.contains(keyword))
            .cloned()
            .collect()
    }

    /// Fuzzy search ordered by username
    pub fn search_sorted(&self, keyword: &str, order: SortOrder) -> Vec<Patron> {
        let mut found = self.fuzzy_search(keyword);
        crate::collections::sort_by(&mut found, |a, b| order.apply(a.username.cmp(&b.username)));
        found
    }

    pub fn all(&self) -> &[Patron] {
        self.patrons.as_slice()
    }

    pub fn len(&self) -> usize {
        self.patrons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patrons.is_empty()
    }

    fn position(&self, username: &str) -> AppResult<usize> {
        self.patrons
            .hash_lookup(username)
            .ok_or_else(|| AppError::PatronNotFound(username.to_string()))
    }
}

impl PatronDirectory for PatronManager {
    fn contains(&self, username: &str) -> bool {
        self.patrons.contains_key(username)
    }
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn registry() -> PatronManager {
        let mut patrons = PatronManager::new();
        for name in ["carol", "alice", "bob", "alicia"] {
            patrons.add(Patron::new(name, "pw", Role::Regular)).unwrap();
        }
        patrons
    }

    fn names(patrons: &[Patron]) -> Vec<&str> {
        patrons.iter().map(|p| p.username.as_str()).collect()
    }

    #[test]
    fn test_add_duplicate_and_empty() {
        let mut patrons = registry();
        assert!(matches!(
            patrons.add(Patron::new("bob", "x", Role::Administrator)),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            patrons.add(Patron::new("  ", "x", Role::Regular)),
            Err(AppError::Validation(_))
        ));
        assert_eq!(patrons.len(), 4);
    }

    #[test]
    fn test_update_rename_collision() {
        let mut patrons = registry();
        let err = patrons
            .update("bob", Patron::new("alice", "pw", Role::Regular))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        patrons
            .update("bob", Patron::new("robert", "pw", Role::Administrator))
            .unwrap();
        assert!(patrons.find("bob").is_none());
        assert!(patrons.find("robert").unwrap().is_admin());
    }

    #[test]
    fn test_remove_many_reports_partial() {
        let mut patrons = registry();
        assert!(!patrons.remove_many(&["alice", "zed"]));
        assert!(patrons.find("alice").is_none());
        assert!(patrons.remove_many(&["bob", "carol"]));
        assert_eq!(names(patrons.all()), vec!["alicia"]);
    }

    #[test]
    fn test_fuzzy_and_sorted_search() {
        let patrons = registry();
        assert_eq!(names(&patrons.fuzzy_search("ali")), vec!["alice", "alicia"]);
        assert_eq!(
            names(&patrons.search_sorted("", SortOrder::Descending)),
            vec!["carol", "bob", "alicia", "alice"]
        );
    }

    #[test]
    fn test_restore_drops_repeats() {
        let mut patrons = PatronManager::new();
        patrons.restore(vec![
            Patron::new("alice", "a", Role::Regular),
            Patron::new("", "b", Role::Regular),
            Patron::new("alice", "c", Role::Administrator),
        ]);
        assert_eq!(patrons.len(), 1);
        assert_eq!(patrons.get("alice").unwrap().password, "a");
        assert!(matches!(patrons.get("nobody"), Err(AppError::PatronNotFound(_))));
    }
}
