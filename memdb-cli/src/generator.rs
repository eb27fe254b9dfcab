//! Workload generator
//!
//! Produces a seeded, weighted random mix of store operations. Each worker in
//! a load run owns one generator, so a given seed and thread count always
//! replays the same per-thread operation sequences.

use crate::models::{OpKind, Operation, WorkloadConfig};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generator for random store operations
pub struct WorkloadGenerator {
    config: WorkloadConfig,
    rng: StdRng,
    total_weight: u32,
}

impl WorkloadGenerator {
    /// Create a new generator with the given configuration and seed
    pub fn new(config: WorkloadConfig, seed: u64) -> Self {
        let total_weight = OpKind::all().iter().map(OpKind::weight).sum();
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            total_weight,
        }
    }

    fn pick_kind(&mut self) -> OpKind {
        let mut roll = self.rng.gen_range(0..self.total_weight);
        for kind in OpKind::all() {
            if roll < kind.weight() {
                return kind;
            }
            roll -= kind.weight();
        }
        OpKind::Get
    }

    fn key(&mut self) -> String {
        format!("key_{}", self.rng.gen_range(0..self.config.keys.max(1)))
    }

    fn collection(&mut self) -> String {
        format!("zset_{}", self.rng.gen_range(0..self.config.collections.max(1)))
    }

    fn member(&mut self) -> String {
        format!("member_{}", self.rng.gen_range(0..self.config.keys.max(1)))
    }

    fn value(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(self.config.value_size)
            .map(char::from)
            .collect()
    }

    fn ttl(&mut self) -> u64 {
        if self.rng.gen_range(0..100u8) < self.config.ttl_percent {
            self.rng.gen_range(1..=self.config.max_ttl_secs.max(1))
        } else {
            0
        }
    }

    /// Generate the next operation
    pub fn next_op(&mut self) -> Operation {
        match self.pick_kind() {
            OpKind::Set => Operation::Set {
                key: self.key(),
                value: self.value(),
                ttl_secs: self.ttl(),
            },
            OpKind::Get => Operation::Get { key: self.key() },
            OpKind::Del => Operation::Del { key: self.key() },
            OpKind::DbSize => Operation::DbSize,
            // a separate key space so counters are not clobbered by SET values
            OpKind::Incr => Operation::Incr {
                key: format!("counter_{}", self.rng.gen_range(0..64)),
            },
            OpKind::ZAdd => Operation::ZAdd {
                collection: self.collection(),
                score: self.rng.gen_range(0.0..1000.0),
                member: self.member(),
            },
            OpKind::ZCard => Operation::ZCard {
                collection: self.collection(),
            },
            OpKind::ZRank => Operation::ZRank {
                collection: self.collection(),
                member: self.member(),
            },
            OpKind::ZRange => {
                let start = self.rng.gen_range(0..10);
                let end = start + self.rng.gen_range(0..20);
                Operation::ZRange {
                    collection: self.collection(),
                    start,
                    end,
                }
            }
        }
    }
}

impl Iterator for WorkloadGenerator {
    type Item = Operation;

    fn next(&mut self) -> Option<Operation> {
        Some(self.next_op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_seed_same_sequence() {
        let a: Vec<_> = WorkloadGenerator::new(WorkloadConfig::default(), 9)
            .take(200)
            .collect();
        let b: Vec<_> = WorkloadGenerator::new(WorkloadConfig::default(), 9)
            .take(200)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mix_covers_every_kind() {
        let kinds: HashSet<_> = WorkloadGenerator::new(WorkloadConfig::default(), 1)
            .take(5_000)
            .map(|op| op.kind())
            .collect();
        assert_eq!(kinds.len(), OpKind::all().len());
    }

    #[test]
    fn test_weights_sum_to_100() {
        let total: u32 = OpKind::all().iter().map(OpKind::weight).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_values_and_ttls_follow_config() {
        let config = WorkloadConfig {
            value_size: 12,
            ttl_percent: 0,
            ..WorkloadConfig::default()
        };
        for op in WorkloadGenerator::new(config, 3).take(2_000) {
            if let Operation::Set {
                value, ttl_secs, ..
            } = op
            {
                assert_eq!(value.len(), 12);
                assert!(value.bytes().all(|b| b.is_ascii_alphanumeric()));
                assert_eq!(ttl_secs, 0);
            }
        }

        let config = WorkloadConfig {
            ttl_percent: 100,
            max_ttl_secs: 3,
            ..WorkloadConfig::default()
        };
        for op in WorkloadGenerator::new(config, 3).take(2_000) {
            if let Operation::Set { ttl_secs, .. } = op {
                assert!((1..=3).contains(&ttl_secs));
            }
        }
    }

    #[test]
    fn test_ranges_are_well_formed() {
        for op in WorkloadGenerator::new(WorkloadConfig::default(), 5).take(2_000) {
            if let Operation::ZRange { start, end, .. } = op {
                assert!(start >= 0);
                assert!(end >= start);
            }
        }
    }
}
