//! Genre allow-list applied at submission time

use std::collections::BTreeSet;

/// Optional allow-list of permitted genres
///
/// An empty list means no restriction. Matching is case-sensitive and exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenrePolicy {
    allowed: BTreeSet<String>,
}

impl GenrePolicy {
    /// Unrestricted policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed<I, S>(genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new();
        policy.set_allowed(genres);
        policy
    }

    /// Replace the allow-list
    ///
    /// Entries are trimmed and blank entries dropped; spelling is not validated.
    pub fn set_allowed<I, S>(&mut self, genres: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed = genres
            .into_iter()
            .map(|g| g.as_ref().trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
    }

    pub fn is_allowed(&self, genre: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(genre)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Sorted allow-list
    pub fn allowed(&self) -> Vec<String> {
        self.allowed.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_policy_allows_everything() {
        let policy = GenrePolicy::new();
        assert!(policy.is_unrestricted());
        assert!(policy.is_allowed("jazz"));
        assert!(policy.is_allowed("Unknown"));
        assert!(policy.is_allowed(""));
    }

    #[test]
    fn test_allow_list_membership() {
        let policy = GenrePolicy::with_allowed(["rock", "pop"]);
        assert!(policy.is_allowed("rock"));
        assert!(policy.is_allowed("pop"));
        assert!(!policy.is_allowed("jazz"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let policy = GenrePolicy::with_allowed(["rock"]);
        assert!(!policy.is_allowed("Rock"));
        assert!(!policy.is_allowed("ROCK"));
    }

    #[test]
    fn test_set_allowed_replaces_and_cleans() {
        let mut policy = GenrePolicy::with_allowed(["rock"]);
        policy.set_allowed([" jazz ", "", "  ", "blues"]);
        assert_eq!(policy.allowed(), vec!["blues".to_string(), "jazz".to_string()]);
        assert!(!policy.is_allowed("rock"));

        policy.set_allowed(Vec::<String>::new());
        assert!(policy.is_unrestricted());
        assert!(policy.is_allowed("rock"));
    }
}
