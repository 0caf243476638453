//! Deterministic opaque work-identifier allocation.
//!
//! IDs are `YYYY` plus an `L`-character suffix drawn from a 30-symbol,
//! visually-unambiguous alphabet (no `0/O/1/I/J/L`). A process-wide set
//! guards uniqueness; regeneration on collision; gives up after 33
//! consecutive failed attempts.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Datelike;
use rand::Rng;
use thiserror::Error;

const CHARSET: &[u8] = b"ABCDEFGHKMNPQRSTUVWXYZ123456789";
const MAX_ATTEMPTS: u32 = 33;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("identifier space exhausted after {0} attempts")]
pub struct Exhausted(pub u32);

/// Shared allocator for both 6-character Record identifiers and
/// 9-character PendingPage identifiers; the suffix length is a parameter
/// per call site.
pub struct IdentifierAllocator {
    issued: Mutex<HashSet<String>>,
}

impl IdentifierAllocator {
    pub fn new() -> Self {
        Self {
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Allocate a new identifier with an `suffix_len`-character random
    /// suffix, retrying on collision up to [`MAX_ATTEMPTS`] times.
    pub fn allocate(&self, suffix_len: usize) -> Result<String, Exhausted> {
        let year = chrono::Utc::now().year();
        let mut rng = rand::rng();

        for attempt in 0..MAX_ATTEMPTS {
            let suffix: String = (0..suffix_len)
                .map(|_| {
                    let idx = rng.random_range(0..CHARSET.len());
                    CHARSET[idx] as char
                })
                .collect();
            let candidate = format!("{:04}{}", year, suffix);

            let mut issued = self.issued.lock().expect("identifier set poisoned");
            if issued.insert(candidate.clone()) {
                return Ok(candidate);
            }
            drop(issued);
            tracing::debug!(attempt, candidate, "identifier collision, regenerating");
        }

        Err(Exhausted(MAX_ATTEMPTS))
    }

    pub fn allocate_record_id(&self) -> Result<String, Exhausted> {
        self.allocate(6)
    }

    pub fn allocate_page_id(&self) -> Result<String, Exhausted> {
        self.allocate(9)
    }
}

impl Default for IdentifierAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_ids_are_unique() {
        let alloc = IdentifierAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let id = alloc.allocate_record_id().unwrap();
            assert!(seen.insert(id), "duplicate identifier allocated");
        }
    }

    #[test]
    fn ids_use_only_unambiguous_alphabet() {
        let alloc = IdentifierAllocator::new();
        let id = alloc.allocate_page_id().unwrap();
        let suffix = &id[4..];
        assert_eq!(suffix.len(), 9);
        for c in suffix.chars() {
            assert!(CHARSET.contains(&(c as u8)), "disallowed char {c}");
        }
        assert!(!suffix.contains(['0', 'O', '1', 'I', 'J', 'L']));
    }

    #[test]
    fn year_prefix_matches_current_year() {
        let alloc = IdentifierAllocator::new();
        let id = alloc.allocate_record_id().unwrap();
        let year = chrono::Utc::now().year();
        assert_eq!(&id[..4], format!("{:04}", year));
    }
}
