// Reporting for load runs

use crate::models::{CsvResultRow, LoadResult};
use std::path::Path;

/// Formats and exports the results of a load run
pub struct LoadReport<'a> {
    result: &'a LoadResult,
}

impl<'a> LoadReport<'a> {
    pub fn new(result: &'a LoadResult) -> Self {
        Self { result }
    }

    /// Print a summary report of the run
    pub fn print_summary(&self) {
        let result = self.result;

        println!("\nLoad Summary");
        println!("============");
        println!("Threads: {}", result.threads);
        println!("Total operations: {}", result.total_ops);
        println!("Duration: {:.3}s", result.duration.as_secs_f64());
        println!("Throughput: {:.0} ops/sec", result.ops_per_sec());

        println!("\nLatency by Operation:");
        println!(
            "{:<8} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "Op", "Count", "Avg", "Min", "Max", "p99"
        );
        println!("{}", "-".repeat(63));
        for (kind, stats) in &result.per_op {
            println!(
                "{:<8} {:>10} {:>8.0}ns {:>8}ns {:>8}ns {:>8}ns",
                kind.as_str(),
                stats.count,
                stats.avg_ns(),
                stats.min_ns,
                stats.max_ns,
                stats.p99_ns()
            );
        }

        println!("\nStore State:");
        println!("  db_size:              {:.0}", result.metric("db_size"));
        println!("  collections:          {:.0}", result.metric("collections"));
        println!(
            "  memory_used:          {:.0} / {:.0} bytes ({:.1}%)",
            result.metric("memory_used"),
            result.metric("max_memory"),
            result.metric("memory_utilization") * 100.0
        );
        println!("  hit_rate:             {:.2}%", result.metric("hit_rate") * 100.0);
        println!(
            "  scalar_evictions:     {:.0}",
            result.metric("scalar_evictions")
        );
        println!(
            "  collection_evictions: {:.0}",
            result.metric("collection_evictions")
        );
        println!(
            "  eviction_shortfalls:  {:.0}",
            result.metric("eviction_shortfalls")
        );
    }

    /// Build one CSV row per operation kind
    pub fn rows(&self) -> Vec<CsvResultRow> {
        let result = self.result;
        let as_u64 = |name: &str| result.metric(name).max(0.0) as u64;

        result
            .per_op
            .iter()
            .map(|(kind, stats)| {
                let percentiles = stats.percentiles.clone().unwrap_or_default();
                CsvResultRow {
                    operation: kind.as_str().to_string(),
                    threads: result.threads,
                    ops: stats.count,
                    total_duration_ns: stats.total_ns,
                    avg_ns: stats.avg_ns(),
                    min_ns: stats.min_ns,
                    max_ns: stats.max_ns,
                    p50_ns: percentiles.p50_ns,
                    p90_ns: percentiles.p90_ns,
                    p99_ns: percentiles.p99_ns,
                    final_db_size: as_u64("db_size"),
                    final_memory_used: as_u64("memory_used"),
                    scalar_evictions: as_u64("scalar_evictions"),
                    collection_evictions: as_u64("collection_evictions"),
                }
            })
            .collect()
    }

    /// Export results to a CSV file
    pub fn export_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpKind, OpLatencyStats};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn sample_result() -> LoadResult {
        let mut per_op = BTreeMap::new();
        per_op.insert(
            OpKind::Get,
            OpLatencyStats {
                total_ns: 1_000,
                count: 10,
                min_ns: 50,
                max_ns: 200,
                percentiles: None,
            },
        );
        per_op.insert(OpKind::Set, OpLatencyStats::default());

        let mut store_metrics = BTreeMap::new();
        store_metrics.insert("db_size".to_string(), 7.0);
        store_metrics.insert("memory_used".to_string(), 123.0);

        LoadResult {
            per_op,
            duration: Duration::from_millis(10),
            total_ops: 10,
            threads: 2,
            store_metrics,
        }
    }

    #[test]
    fn test_rows_one_per_operation() {
        let result = sample_result();
        let rows = LoadReport::new(&result).rows();

        assert_eq!(rows.len(), 2);
        // BTreeMap order follows OpKind declaration order
        assert_eq!(rows[0].operation, "SET");
        assert_eq!(rows[1].operation, "GET");
        assert_eq!(rows[1].ops, 10);
        assert!((rows[1].avg_ns - 100.0).abs() < f64::EPSILON);
        assert_eq!(rows[1].final_db_size, 7);
        assert_eq!(rows[1].final_memory_used, 123);
        assert_eq!(rows[1].scalar_evictions, 0);
    }

    #[test]
    fn test_export_csv_writes_header_and_rows() {
        let result = sample_result();
        let path = std::env::temp_dir().join(format!("memdb-load-{}.csv", std::process::id()));

        LoadReport::new(&result).export_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("operation,threads,ops"));
        assert!(lines[2].starts_with("GET,2,10"));
    }
}
