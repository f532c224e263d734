//! FIFO reservation queue for a single book

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Patrons waiting for a book, head first. A username appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct WaitQueue {
    usernames: VecDeque<String>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `username`; returns its 1-based position, or `None` if it is
    /// already waiting.
    pub fn enqueue(&mut self, username: &str) -> Option<usize> {
        if self.contains(username) {
            return None;
        }
        self.usernames.push_back(username.to_string());
        Some(self.usernames.len())
    }

    pub fn dequeue(&mut self) -> Option<String> {
        self.usernames.pop_front()
    }

    pub fn front(&self) -> Option<&str> {
        self.usernames.front().map(String::as_str)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.usernames.iter().any(|u| u == username)
    }

    /// 1-based position of `username`
    pub fn position(&self, username: &str) -> Option<usize> {
        self.usernames.iter().position(|u| u == username).map(|p| p + 1)
    }

    /// Withdraw `username` from anywhere in the queue
    pub fn remove(&mut self, username: &str) -> bool {
        match self.usernames.iter().position(|u| u == username) {
            Some(index) => {
                self.usernames.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.usernames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.usernames.iter().map(String::as_str)
    }
}

impl FromIterator<String> for WaitQueue {
    /// Builds a queue, dropping repeated usernames after their first occurrence
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut queue = WaitQueue::new();
        for username in iter {
            queue.enqueue(&username);
        }
        queue
    }
}

impl From<Vec<String>> for WaitQueue {
    fn from(usernames: Vec<String>) -> Self {
        usernames.into_iter().collect()
    }
}

impl From<WaitQueue> for Vec<String> {
    fn from(queue: WaitQueue) -> Self {
        queue.usernames.into()
    }
}
