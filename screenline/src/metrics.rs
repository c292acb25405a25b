// Monotonic counters + a lock-free-ish timing ring, grounded on the
// teacher's `LoadShedder` atomic-counter style (load_shedder.rs) generalized
// from "shed/accepted" counters to per-stage processing counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::types::StageName;

const HISTOGRAM_CAPACITY: usize = 256;

/// Fixed-size ring buffer of recent durations per stage — cheap p50/p95
/// without pulling in a metrics crate, same spirit as the teacher's
/// `timing_buckets: DashMap<u64, HashSet<String>>` approach of keeping a
/// bounded recent window rather than unbounded history.
struct TimingRing {
    buf: Vec<u64>,
    pos: usize,
    len: usize,
}

impl TimingRing {
    fn new() -> Self {
        Self { buf: vec![0; HISTOGRAM_CAPACITY], pos: 0, len: 0 }
    }

    fn push(&mut self, micros: u64) {
        self.buf[self.pos] = micros;
        self.pos = (self.pos + 1) % HISTOGRAM_CAPACITY;
        self.len = (self.len + 1).min(HISTOGRAM_CAPACITY);
    }

    fn percentile(&self, p: f64) -> u64 {
        if self.len == 0 { return 0; }
        let mut vals: Vec<u64> = self.buf[..self.len].to_vec();
        vals.sort_unstable();
        let idx = ((vals.len() as f64 - 1.0) * p).round() as usize;
        vals[idx]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StagePerformance {
    pub calls:      u64,
    pub errors:     u64,
    pub p50_micros: u64,
    pub p95_micros: u64,
}

pub struct Metrics {
    pub total_requests:   AtomicU64,
    pub total_errors:     AtomicU64,
    pub total_timeouts:   AtomicU64,
    pub auto_clear_count: AtomicU64,
    pub review_low_count: AtomicU64,
    pub review_high_count: AtomicU64,
    pub auto_hit_count:   AtomicU64,

    stage_calls:  dashmap::DashMap<StageName, AtomicU64>,
    stage_errors: dashmap::DashMap<StageName, AtomicU64>,
    stage_timing: Mutex<HashMap<StageName, TimingRing>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_requests:    AtomicU64::new(0),
            total_errors:      AtomicU64::new(0),
            total_timeouts:    AtomicU64::new(0),
            auto_clear_count:  AtomicU64::new(0),
            review_low_count:  AtomicU64::new(0),
            review_high_count: AtomicU64::new(0),
            auto_hit_count:    AtomicU64::new(0),
            stage_calls:  dashmap::DashMap::new(),
            stage_errors: dashmap::DashMap::new(),
            stage_timing: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.total_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_risk(&self, risk: crate::types::RiskLevel) {
        use crate::types::RiskLevel::*;
        let counter = match risk {
            AutoClear  => &self.auto_clear_count,
            ReviewLow  => &self.review_low_count,
            ReviewHigh => &self.review_high_count,
            AutoHit    => &self.auto_hit_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stage(&self, stage: StageName, elapsed: std::time::Duration, ok: bool) {
        self.stage_calls.entry(stage).or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.stage_errors.entry(stage).or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
        self.stage_timing.lock()
            .entry(stage)
            .or_insert_with(TimingRing::new)
            .push(elapsed.as_micros() as u64);
    }

    pub fn stage_performance(&self) -> HashMap<String, StagePerformance> {
        let timing = self.stage_timing.lock();
        let mut out = HashMap::new();
        for entry in self.stage_calls.iter() {
            let stage = *entry.key();
            let calls = entry.value().load(Ordering::Relaxed);
            let errors = self.stage_errors.get(&stage)
                .map(|e| e.load(Ordering::Relaxed)).unwrap_or(0);
            let (p50, p95) = timing.get(&stage)
                .map(|r| (r.percentile(0.50), r.percentile(0.95)))
                .unwrap_or((0, 0));
            out.insert(stage.to_string(), StagePerformance {
                calls, errors, p50_micros: p50, p95_micros: p95,
            });
        }
        out
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.total_errors.store(0, Ordering::Relaxed);
        self.total_timeouts.store(0, Ordering::Relaxed);
        self.auto_clear_count.store(0, Ordering::Relaxed);
        self.review_low_count.store(0, Ordering::Relaxed);
        self.review_high_count.store(0, Ordering::Relaxed);
        self.auto_hit_count.store(0, Ordering::Relaxed);
        self.stage_calls.clear();
        self.stage_errors.clear();
        self.stage_timing.lock().clear();
    }
}

impl Default for Metrics {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stage_counters_accumulate() {
        let m = Metrics::new();
        m.record_stage(StageName::Validation, Duration::from_micros(100), true);
        m.record_stage(StageName::Validation, Duration::from_micros(200), false);
        let perf = m.stage_performance();
        let v = perf.get("validation").unwrap();
        assert_eq!(v.calls, 2);
        assert_eq!(v.errors, 1);
    }

    #[test]
    fn reset_clears_everything() {
        let m = Metrics::new();
        m.record_request();
        m.reset();
        assert_eq!(m.total_requests.load(Ordering::Relaxed), 0);
    }
}
