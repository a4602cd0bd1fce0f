//! Measurement scaffolding for latency and memory budgets
//!
//! Drives an operation under repeated load and reports timing statistics
//! plus process memory growth, so the latency and resident-size budgets can
//! be asserted instead of eyeballed.

use std::time::Instant;

use serde::Serialize;

/// Named budgets the engine is expected to hold.
pub mod budgets {
    /// Average single-template match duration.
    pub const SINGLE_MATCH_MS: f64 = 50.0;
    /// Average full-frame state classification duration.
    pub const FULL_CLASSIFICATION_MS: f64 = 200.0;
    /// Resident size of the template cache.
    pub const CACHE_RESIDENT_BYTES: u64 = 100 * 1024 * 1024;
    /// Allowed process memory growth over a long-running loop.
    pub const MEMORY_GROWTH_BYTES: u64 = 50 * 1024 * 1024;
    /// Iteration count the growth ceiling is defined against.
    pub const MEMORY_CHECK_ITERATIONS: usize = 1000;
}

/// Timing statistics over the measured iterations.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkStats {
    pub iterations: usize,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub stddev_ms: f64,
    pub throughput_per_sec: f64,
    /// Fraction of iterations that reported success, `0.0` to `1.0`.
    pub success_rate: f64,
}

impl BenchmarkStats {
    /// Pass/fail against an average-duration budget in milliseconds.
    pub fn meets_budget(&self, budget_ms: f64) -> bool {
        self.average_ms <= budget_ms
    }
}

/// Run `operation` for `warmup_iterations` unmeasured passes, then measure
/// `iterations` passes. The operation reports success per call.
pub fn benchmark<F>(mut operation: F, iterations: usize, warmup_iterations: usize) -> BenchmarkStats
where
    F: FnMut() -> bool,
{
    for _ in 0..warmup_iterations {
        operation();
    }

    let mut durations_ms = Vec::with_capacity(iterations);
    let mut successes = 0usize;
    for _ in 0..iterations {
        let start = Instant::now();
        if operation() {
            successes += 1;
        }
        durations_ms.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    if durations_ms.is_empty() {
        return BenchmarkStats {
            iterations: 0,
            average_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            stddev_ms: 0.0,
            throughput_per_sec: 0.0,
            success_rate: 0.0,
        };
    }

    let count = durations_ms.len() as f64;
    let average_ms = durations_ms.iter().sum::<f64>() / count;
    let min_ms = durations_ms.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = durations_ms
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let variance = durations_ms
        .iter()
        .map(|d| (d - average_ms) * (d - average_ms))
        .sum::<f64>()
        / count;
    let throughput_per_sec = if average_ms > 0.0 {
        1000.0 / average_ms
    } else {
        0.0
    };

    BenchmarkStats {
        iterations: durations_ms.len(),
        average_ms,
        min_ms,
        max_ms,
        stddev_ms: variance.sqrt(),
        throughput_per_sec,
        success_rate: successes as f64 / count,
    }
}

/// Resident-memory samples over a long-running loop.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    /// False when the platform exposes no resident-size reading; the check
    /// then passes vacuously.
    pub supported: bool,
    pub start_bytes: u64,
    pub end_bytes: u64,
    pub peak_bytes: u64,
    pub growth_bytes: u64,
    pub samples: Vec<u64>,
}

impl MemoryReport {
    /// Pass/fail against a growth ceiling in bytes.
    pub fn within_ceiling(&self, ceiling_bytes: u64) -> bool {
        !self.supported || self.growth_bytes <= ceiling_bytes
    }
}

/// Run `operation` for `iterations` passes, sampling process resident size
/// every `sample_interval` passes.
pub fn memory_growth<F>(mut operation: F, iterations: usize, sample_interval: usize) -> MemoryReport
where
    F: FnMut(),
{
    let Some(start_bytes) = process_rss_bytes() else {
        log::warn!("resident-size sampling unsupported on this platform, skipping memory check");
        for _ in 0..iterations {
            operation();
        }
        return MemoryReport {
            supported: false,
            start_bytes: 0,
            end_bytes: 0,
            peak_bytes: 0,
            growth_bytes: 0,
            samples: Vec::new(),
        };
    };

    let interval = sample_interval.max(1);
    let mut samples = Vec::with_capacity(iterations / interval + 1);
    let mut peak_bytes = start_bytes;
    for i in 0..iterations {
        operation();
        if (i + 1) % interval == 0
            && let Some(rss) = process_rss_bytes()
        {
            peak_bytes = peak_bytes.max(rss);
            samples.push(rss);
        }
    }

    let end_bytes = process_rss_bytes().unwrap_or(start_bytes);
    peak_bytes = peak_bytes.max(end_bytes);
    MemoryReport {
        supported: true,
        start_bytes,
        end_bytes,
        peak_bytes,
        growth_bytes: end_bytes.saturating_sub(start_bytes),
        samples,
    }
}

/// Resident set size of this process.
#[cfg(target_os = "linux")]
fn process_rss_bytes() -> Option<u64> {
    // /proc/self/statm reports sizes in pages; field 1 is the resident set.
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn process_rss_bytes() -> Option<u64> {
    None
}
