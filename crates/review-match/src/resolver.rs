//! Identity resolution: ranks the registry against one extracted name.

use std::sync::Arc;

use review_model::Identity;
use serde::Serialize;

use crate::distance::{edit_distance, similarity};

/// A registry entry scored against the extracted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub identity: Identity,
    /// Levenshtein distance to the extracted text.
    pub distance: usize,
    /// Normalized similarity for display (1.0 is an exact match).
    pub similarity: f64,
}

/// The registry reordered by ascending distance to one extracted string.
///
/// Ties keep registry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    extracted: String,
    candidates: Vec<Candidate>,
}

impl Ranking {
    /// The text this ranking was computed for.
    pub fn extracted(&self) -> &str {
        &self.extracted
    }

    /// Closest candidate, or `None` for an empty registry.
    pub fn best_match(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Every registry entry, closest first, for manual override.
    pub fn ranked_list(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn find(&self, id: i64) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.identity.id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Scores extracted names against a shared, read-only registry.
///
/// Cloning is cheap; the registry is reference counted.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    registry: Arc<[Identity]>,
}

impl IdentityResolver {
    pub fn new(registry: impl Into<Arc<[Identity]>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    pub fn registry(&self) -> &[Identity] {
        &self.registry
    }

    pub fn get(&self, id: i64) -> Option<&Identity> {
        self.registry.iter().find(|identity| identity.id == id)
    }

    /// Ranks the full registry against `extracted`.
    pub fn rank(&self, extracted: &str) -> Ranking {
        let mut candidates: Vec<Candidate> = self
            .registry
            .iter()
            .map(|identity| Candidate {
                distance: edit_distance(extracted, &identity.name),
                similarity: similarity(extracted, &identity.name),
                identity: identity.clone(),
            })
            .collect();
        // sort_by_key is stable, which keeps registry order among ties.
        candidates.sort_by_key(|candidate| candidate.distance);

        Ranking {
            extracted: extracted.to_string(),
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Vec<Identity> {
        vec![Identity::new(1, "y"), Identity::new(2, "x")]
    }

    #[test]
    fn exact_match_ranks_first() {
        let resolver = IdentityResolver::new(registry());
        let ranking = resolver.rank("x");
        let best = ranking.best_match().unwrap();
        assert_eq!(best.identity.id, 2);
        assert_eq!(best.distance, 0);
        assert_eq!(ranking.ranked_list()[1].identity.id, 1);
        assert_eq!(ranking.ranked_list()[1].distance, 1);
    }

    #[test]
    fn ties_keep_registry_order() {
        let resolver = IdentityResolver::new(vec![
            Identity::new(10, "ab"),
            Identity::new(11, "cd"),
            Identity::new(12, "ef"),
        ]);
        let ranking = resolver.rank("zz");
        let ids: Vec<i64> = ranking.ranked_list().iter().map(|c| c.identity.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn empty_registry_has_no_best_match() {
        let resolver = IdentityResolver::default();
        let ranking = resolver.rank("anything");
        assert!(ranking.best_match().is_none());
        assert!(ranking.is_empty());
        assert_eq!(ranking.extracted(), "anything");
    }

    #[test]
    fn lookup_by_id() {
        let resolver = IdentityResolver::new(registry());
        assert_eq!(resolver.get(1).map(|i| i.name.as_str()), Some("y"));
        assert!(resolver.get(99).is_none());
        assert!(resolver.rank("x").find(1).is_some());
    }
}
