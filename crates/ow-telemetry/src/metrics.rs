//! Process-wide metrics for the sync loop, exported as Prometheus text.
//!
//! Series are created on first use. Values are atomics, so recording only
//! takes a read lock once a series exists.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;

/// Upper bounds (seconds) for duration histograms, sized for HTTP round trips.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Label pairs sorted by key, so `[("a", ..), ("b", ..)]` and
/// `[("b", ..), ("a", ..)]` address the same series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Labels(Vec<(String, String)>);

impl Labels {
    fn new(pairs: &[(&str, &str)]) -> Self {
        let mut pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.sort();
        Self(pairs)
    }

    /// `{k="v",...}`, or nothing for an unlabelled series.
    fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let inner: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}=\"{v}\"")).collect();
        format!("{{{}}}", inner.join(","))
    }
}

#[derive(Debug)]
struct Histogram {
    /// `cumulative[i]` counts observations `<= DURATION_BUCKETS[i]`.
    cumulative: Vec<AtomicU64>,
    sum_bits: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            cumulative: DURATION_BUCKETS.iter().map(|_| AtomicU64::new(0)).collect(),
            sum_bits: AtomicU64::new(0f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, value: f64) {
        for (bound, slot) in DURATION_BUCKETS.iter().zip(&self.cumulative) {
            if value <= *bound {
                slot.fetch_add(1, Ordering::Relaxed);
            }
        }
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }
}

/// Counters (with labels), gauges and duration histograms.
///
/// A poisoned lock is recovered rather than propagated: recording a metric
/// never fails.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: RwLock<AHashMap<(String, Labels), AtomicU64>>,
    gauges: RwLock<AHashMap<String, AtomicI64>>,
    histograms: RwLock<AHashMap<String, Histogram>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        let key = (name.to_string(), Labels::new(labels));
        if let Some(counter) = read(&self.counters).get(&key) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        write(&self.counters)
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of a counter series; 0 if it was never incremented.
    pub fn get_counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        read(&self.counters)
            .get(&(name.to_string(), Labels::new(labels)))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn set_gauge(&self, name: &str, value: i64) {
        if let Some(gauge) = read(&self.gauges).get(name) {
            gauge.store(value, Ordering::Relaxed);
            return;
        }
        write(&self.gauges)
            .entry(name.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .store(value, Ordering::Relaxed);
    }

    /// Record a duration in seconds.
    pub fn record_histogram(&self, name: &str, seconds: f64) {
        if let Some(histogram) = read(&self.histograms).get(name) {
            histogram.observe(seconds);
            return;
        }
        write(&self.histograms)
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .observe(seconds);
    }

    /// Prometheus text exposition of every series, names sorted.
    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();

        let counters = read(&self.counters);
        let mut series: Vec<(&str, String, u64)> = counters
            .iter()
            .map(|((name, labels), v)| (name.as_str(), labels.render(), v.load(Ordering::Relaxed)))
            .collect();
        series.sort();
        let mut last = None;
        for (name, labels, value) in series {
            if last != Some(name) {
                let _ = writeln!(out, "# TYPE {name} counter");
                last = Some(name);
            }
            let _ = writeln!(out, "{name}{labels} {value}");
        }

        let gauges = read(&self.gauges);
        let mut names: Vec<&String> = gauges.keys().collect();
        names.sort();
        for name in names {
            let _ = writeln!(out, "# TYPE {name} gauge");
            let _ = writeln!(out, "{name} {}", gauges[name].load(Ordering::Relaxed));
        }

        let histograms = read(&self.histograms);
        let mut names: Vec<&String> = histograms.keys().collect();
        names.sort();
        for name in names {
            let h = &histograms[name];
            let count = h.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "# TYPE {name} histogram");
            for (bound, slot) in DURATION_BUCKETS.iter().zip(&h.cumulative) {
                let _ = writeln!(out, "{name}_bucket{{le=\"{bound}\"}} {}", slot.load(Ordering::Relaxed));
            }
            let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{name}_sum {}", h.sum());
            let _ = writeln!(out, "{name}_count {count}");
        }

        out
    }
}

/// Returns the process-wide `MetricsCollector`.
pub fn global_metrics() -> &'static MetricsCollector {
    static INSTANCE: OnceLock<MetricsCollector> = OnceLock::new();
    INSTANCE.get_or_init(MetricsCollector::new)
}
