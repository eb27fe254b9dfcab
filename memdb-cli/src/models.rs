// Data models for load generation

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Store operations exercised by the load generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Set,
    Get,
    Del,
    DbSize,
    Incr,
    ZAdd,
    ZCard,
    ZRank,
    ZRange,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Set => "SET",
            OpKind::Get => "GET",
            OpKind::Del => "DEL",
            OpKind::DbSize => "DBSIZE",
            OpKind::Incr => "INCR",
            OpKind::ZAdd => "ZADD",
            OpKind::ZCard => "ZCARD",
            OpKind::ZRank => "ZRANK",
            OpKind::ZRange => "ZRANGE",
        }
    }

    /// Get all operation kinds
    pub fn all() -> [OpKind; 9] {
        [
            OpKind::Set,
            OpKind::Get,
            OpKind::Del,
            OpKind::DbSize,
            OpKind::Incr,
            OpKind::ZAdd,
            OpKind::ZCard,
            OpKind::ZRank,
            OpKind::ZRange,
        ]
    }

    /// Relative frequency in the generated mix (weights sum to 100)
    pub fn weight(&self) -> u32 {
        match self {
            OpKind::Get => 30,
            OpKind::Set => 20,
            OpKind::ZAdd => 15,
            OpKind::Incr => 10,
            OpKind::ZRank => 8,
            OpKind::Del => 5,
            OpKind::ZCard => 5,
            OpKind::ZRange => 5,
            OpKind::DbSize => 2,
        }
    }

    /// Dense index, for per-kind arrays
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generated operation with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Set {
        key: String,
        value: String,
        ttl_secs: u64,
    },
    Get {
        key: String,
    },
    Del {
        key: String,
    },
    DbSize,
    Incr {
        key: String,
    },
    ZAdd {
        collection: String,
        score: f64,
        member: String,
    },
    ZCard {
        collection: String,
    },
    ZRank {
        collection: String,
        member: String,
    },
    ZRange {
        collection: String,
        start: i64,
        end: i64,
    },
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Set { .. } => OpKind::Set,
            Operation::Get { .. } => OpKind::Get,
            Operation::Del { .. } => OpKind::Del,
            Operation::DbSize => OpKind::DbSize,
            Operation::Incr { .. } => OpKind::Incr,
            Operation::ZAdd { .. } => OpKind::ZAdd,
            Operation::ZCard { .. } => OpKind::ZCard,
            Operation::ZRank { .. } => OpKind::ZRank,
            Operation::ZRange { .. } => OpKind::ZRange,
        }
    }
}

/// Shape of the generated traffic
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Number of distinct scalar keys (and sorted-set members)
    pub keys: u32,
    /// Number of distinct sorted collections
    pub collections: u32,
    /// Length of generated SET values in bytes
    pub value_size: usize,
    /// Percentage of SETs that carry a TTL
    pub ttl_percent: u8,
    /// Upper bound for generated TTLs in seconds
    pub max_ttl_secs: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            keys: 10_000,
            collections: 16,
            value_size: 32,
            ttl_percent: 10,
            max_ttl_secs: 5,
        }
    }
}

/// Configuration for a load run
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Number of worker threads sharing one store
    pub threads: usize,
    /// Operations issued by each worker
    pub ops_per_thread: u64,
    /// Base seed; worker `i` uses `seed + i`
    pub seed: u64,
    /// Store byte budget
    pub max_memory: u64,
    /// Store lock stripes (None = store default)
    pub segments: Option<usize>,
    /// Traffic shape
    pub workload: WorkloadConfig,
}

/// Latency percentiles
#[derive(Debug, Clone, Default)]
pub struct LatencyPercentiles {
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p99_ns: u64,
}

/// Latency statistics for a single operation kind
#[derive(Debug, Clone, Default)]
pub struct OpLatencyStats {
    /// Total time spent (nanoseconds)
    pub total_ns: u64,
    /// Number of operations
    pub count: u64,
    /// Minimum latency (nanoseconds)
    pub min_ns: u64,
    /// Maximum latency (nanoseconds)
    pub max_ns: u64,
    /// Latency percentiles
    pub percentiles: Option<LatencyPercentiles>,
}

impl OpLatencyStats {
    /// Calculate average latency in nanoseconds
    pub fn avg_ns(&self) -> f64 {
        if self.count > 0 {
            self.total_ns as f64 / self.count as f64
        } else {
            0.0
        }
    }

    pub fn p99_ns(&self) -> u64 {
        self.percentiles.as_ref().map(|p| p.p99_ns).unwrap_or(0)
    }
}

/// Results of a load run
#[derive(Debug)]
pub struct LoadResult {
    /// Latency per operation kind
    pub per_op: BTreeMap<OpKind, OpLatencyStats>,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Operations issued across all workers
    pub total_ops: u64,
    /// Worker threads used
    pub threads: usize,
    /// Store metrics captured after the run
    pub store_metrics: BTreeMap<String, f64>,
}

impl LoadResult {
    /// Operations per second of wall-clock time
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }

    /// Store metric by name, 0.0 if absent
    pub fn metric(&self, name: &str) -> f64 {
        self.store_metrics.get(name).copied().unwrap_or(0.0)
    }
}

/// CSV export row, one per operation kind
#[derive(Debug, Serialize)]
pub struct CsvResultRow {
    pub operation: String,
    pub threads: usize,
    pub ops: u64,
    pub total_duration_ns: u64,
    pub avg_ns: f64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p99_ns: u64,
    pub final_db_size: u64,
    pub final_memory_used: u64,
    pub scalar_evictions: u64,
    pub collection_evictions: u64,
}
