//! Random-collection, lowest-score eviction for sorted collections.
//!
//! Each eviction attempt visits the known collections in a random order and
//! pops the lowest-scoring member of the first one that is non-empty. Empty
//! collections are skipped (they are never deleted, so they accumulate), and
//! the attempt only fails once every collection has been tried.
//!
//! The random source is a seedable [`StdRng`] behind a mutex so that tests and
//! load runs can reproduce a victim sequence with [`RandomLowestScore::with_seed`].

use super::{CollectionEvictionPolicy, EvictedMember};
use crate::sorted::SortedCollection;
use core::fmt;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Pops the lowest score from a randomly chosen non-empty collection.
pub struct RandomLowestScore {
    rng: Mutex<StdRng>,
}

impl RandomLowestScore {
    /// Creates a policy seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a policy with a fixed seed, for reproducible victim order.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomLowestScore {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionEvictionPolicy for RandomLowestScore {
    fn name(&self) -> &'static str {
        "RandomLowestScore"
    }

    fn evict_one(&self, collections: &[(String, Arc<SortedCollection>)]) -> Option<EvictedMember> {
        let mut order: Vec<usize> = (0..collections.len()).collect();
        order.shuffle(&mut *self.rng.lock());

        order.into_iter().find_map(|idx| {
            let (name, collection) = &collections[idx];
            collection
                .pop_lowest()
                .map(|(score, member)| EvictedMember {
                    collection: name.clone(),
                    score,
                    member,
                })
        })
    }
}

impl fmt::Debug for RandomLowestScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomLowestScore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, pairs: &[(f64, &str)]) -> (String, Arc<SortedCollection>) {
        let set = SortedCollection::new();
        for (score, member) in pairs {
            set.insert(*score, member.to_string());
        }
        (name.to_string(), Arc::new(set))
    }

    #[test]
    fn test_no_collections() {
        let policy = RandomLowestScore::with_seed(7);
        assert_eq!(policy.evict_one(&[]), None);
    }

    #[test]
    fn test_all_empty_collections() {
        let policy = RandomLowestScore::with_seed(7);
        let collections = vec![named("a", &[]), named("b", &[])];
        assert_eq!(policy.evict_one(&collections), None);
    }

    #[test]
    fn test_skips_empty_and_pops_lowest() {
        let policy = RandomLowestScore::with_seed(7);
        let collections = vec![
            named("empty1", &[]),
            named("z", &[(5.0, "high"), (1.0, "low")]),
            named("empty2", &[]),
        ];

        let evicted = policy.evict_one(&collections);
        assert_eq!(
            evicted,
            Some(EvictedMember {
                collection: "z".to_string(),
                score: 1.0,
                member: "low".to_string(),
            })
        );
        assert_eq!(collections[1].1.len(), 1);
    }

    #[test]
    fn test_drains_everything_then_fails() {
        let policy = RandomLowestScore::new();
        let collections = vec![
            named("a", &[(1.0, "a1"), (2.0, "a2")]),
            named("b", &[(3.0, "b1")]),
        ];

        let mut evicted = Vec::new();
        while let Some(member) = policy.evict_one(&collections) {
            evicted.push(member);
        }

        assert_eq!(evicted.len(), 3);
        // within one collection, members leave lowest score first
        let from_a: Vec<_> = evicted
            .iter()
            .filter(|m| m.collection == "a")
            .map(|m| m.member.as_str())
            .collect();
        assert_eq!(from_a, vec!["a1", "a2"]);
    }

    #[test]
    fn test_same_seed_same_victims() {
        let run = |seed| {
            let policy = RandomLowestScore::with_seed(seed);
            let collections: Vec<_> = (0..8)
                .map(|i| named(&format!("c{i}"), &[(1.0, "m")]))
                .collect();
            let mut order = Vec::new();
            while let Some(member) = policy.evict_one(&collections) {
                order.push(member.collection);
            }
            order
        };

        assert_eq!(run(42), run(42));
        assert_eq!(run(42).len(), 8);
    }
}
