// Background memory-pressure monitor (spec §5). Samples resident set size at
// a configured interval and trips `on_pressure` on every registered cache
// when a configured fraction of the configured limit is crossed — warning
// triggers non-aggressive eviction, critical triggers a full clear. Grounded
// on the teacher's `StateStore::housekeeping_loop` (`state/window.rs`):
// `tokio::spawn(store.housekeeping_loop())` from `main.rs`, an infinite
// `tokio::time::sleep` loop over `Arc<Self>`. The RSS read itself follows
// the teacher's own direct-`/proc` idiom (`loader.rs` reads
// `/proc/self/maps` to locate a loaded library) rather than pulling in a
// system-info crate for one counter.
//
// Never blocks request processing: the loop only ever touches the pressure
// hooks, never the request path, and a failed RSS read just skips the tick.

use std::sync::Arc;
use std::time::Duration;

/// Anything a pressure event can be delivered to. Implemented by
/// [`crate::cache::BoundedCache`]; kept as a trait (rather than a concrete
/// `Vec<Arc<BoundedCache<K, V>>>`) so the monitor can register caches keyed
/// by different `K`/`V` pairs in one registry.
pub trait PressureAware: Send + Sync {
    fn on_pressure(&self, aggressive: bool);
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub interval:            Duration,
    /// Resident-set ceiling pressure is measured against. `0` disables the
    /// monitor entirely (sampling still runs but never trips a callback) —
    /// the limit is deployment-specific and has no sane universal default.
    pub memory_limit_bytes:  u64,
    pub warning_fraction:    f32,
    pub critical_fraction:   f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval:           Duration::from_secs(5),
            memory_limit_bytes: 0,
            warning_fraction:   0.80,
            critical_fraction:  0.95,
        }
    }
}

pub struct MemoryPressureMonitor {
    config:   MonitorConfig,
    targets:  Vec<Arc<dyn PressureAware>>,
}

impl MemoryPressureMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config, targets: Vec::new() }
    }

    pub fn register(&mut self, target: Arc<dyn PressureAware>) {
        self.targets.push(target);
    }

    /// One sampling tick; exposed separately from `run_loop` so tests can
    /// drive it without sleeping.
    pub fn tick(&self, resident_bytes: u64) {
        if self.config.memory_limit_bytes == 0 {
            return;
        }
        let fraction = resident_bytes as f64 / self.config.memory_limit_bytes as f64;
        if fraction >= self.config.critical_fraction as f64 {
            for t in &self.targets {
                t.on_pressure(true);
            }
        } else if fraction >= self.config.warning_fraction as f64 {
            for t in &self.targets {
                t.on_pressure(false);
            }
        }
    }

    /// Runs forever, sampling at `config.interval`. Intended to be
    /// `tokio::spawn`ed once at startup, mirroring the teacher's
    /// `tokio::spawn(store.housekeeping_loop())`.
    pub async fn run_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.config.interval).await;
            if let Some(rss) = read_resident_bytes() {
                self.tick(rss);
            }
        }
    }
}

/// Reads this process's resident set size from `/proc/self/statm` (field 2,
/// in pages). Returns `None` off Linux or if the read fails — the monitor
/// simply skips that tick rather than failing the process.
#[cfg(target_os = "linux")]
fn read_resident_bytes() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
    // Most Linux configurations use 4 KiB pages; there is no libc dependency
    // in this stack to call sysconf(_SC_PAGESIZE), so this is a fixed
    // approximation rather than an exact read.
    Some(resident_pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn read_resident_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Spy {
        aggressive_calls: AtomicUsize,
        gentle_calls:     AtomicUsize,
    }

    impl Spy {
        fn new() -> Self {
            Self { aggressive_calls: AtomicUsize::new(0), gentle_calls: AtomicUsize::new(0) }
        }
    }

    impl PressureAware for Spy {
        fn on_pressure(&self, aggressive: bool) {
            if aggressive {
                self.aggressive_calls.fetch_add(1, Ordering::Relaxed);
            } else {
                self.gentle_calls.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn below_warning_fraction_does_not_fire() {
        let mut monitor = MemoryPressureMonitor::new(MonitorConfig {
            memory_limit_bytes: 1000, ..MonitorConfig::default()
        });
        let spy = Arc::new(Spy::new());
        monitor.register(spy.clone());
        monitor.tick(500);
        assert_eq!(spy.gentle_calls.load(Ordering::Relaxed), 0);
        assert_eq!(spy.aggressive_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn warning_fraction_triggers_non_aggressive() {
        let mut monitor = MemoryPressureMonitor::new(MonitorConfig {
            memory_limit_bytes: 1000, ..MonitorConfig::default()
        });
        let spy = Arc::new(Spy::new());
        monitor.register(spy.clone());
        monitor.tick(850);
        assert_eq!(spy.gentle_calls.load(Ordering::Relaxed), 1);
        assert_eq!(spy.aggressive_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn critical_fraction_triggers_aggressive() {
        let mut monitor = MemoryPressureMonitor::new(MonitorConfig {
            memory_limit_bytes: 1000, ..MonitorConfig::default()
        });
        let spy = Arc::new(Spy::new());
        monitor.register(spy.clone());
        monitor.tick(960);
        assert_eq!(spy.aggressive_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn zero_limit_disables_monitor() {
        let mut monitor = MemoryPressureMonitor::new(MonitorConfig::default());
        let spy = Arc::new(Spy::new());
        monitor.register(spy.clone());
        monitor.tick(u64::MAX);
        assert_eq!(spy.aggressive_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn multiple_targets_all_receive_the_event() {
        let mut monitor = MemoryPressureMonitor::new(MonitorConfig {
            memory_limit_bytes: 1000, ..MonitorConfig::default()
        });
        let a = Arc::new(Spy::new());
        let b = Arc::new(Spy::new());
        monitor.register(a.clone());
        monitor.register(b.clone());
        monitor.tick(960);
        assert_eq!(a.aggressive_calls.load(Ordering::Relaxed), 1);
        assert_eq!(b.aggressive_calls.load(Ordering::Relaxed), 1);
    }
}
