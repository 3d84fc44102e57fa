//! Minimal metrics registry for the client.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Histogram buckets are fixed in microseconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &[(String, String)]) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{labels}}}")
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over all label sets.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{} {}", series(name, &label_str(r.key())), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<Vec<(String, String)>, AtomicI64>,
}

impl GaugeVec {
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{} {}", series(name, &label_str(r.key())), val);
        }
    }
}

// 10us, 50us, 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms
const BUCKETS_MICROS: [u64; 9] = [10, 50, 100, 500, 1_000, 5_000, 10_000, 50_000, 100_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<Vec<(String, String)>, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);

        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for r in self.map.iter() {
            let hist = r.value();
            let labels = label_str(r.key());
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{labels},")
            };

            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = hist.sum.load(Ordering::Relaxed);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), &labels), sum);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_count"), &labels), count);
        }
    }
}

/// Counters for one client instance.
#[derive(Default)]
pub struct ClientMetrics {
    /// Inbound envelopes, by `msg_type`.
    pub frames_in: CounterVec,
    /// Outbound envelopes accepted by the gateway, by `msg_type`.
    pub frames_out: CounterVec,
    /// Outbound frames discarded because their connection was gone.
    pub frames_stale: CounterVec,
    /// Sends refused, by `reason` (`not_connected`, `invalid_envelope`).
    pub send_rejected: CounterVec,
    pub decode_errors: CounterVec,
    /// Subscriber failures, by `msg_type`.
    pub handler_errors: CounterVec,
    pub transport_errors: CounterVec,
    pub connects: CounterVec,
    pub disconnects: CounterVec,
    pub reconnect_attempts: CounterVec,
    /// 1 while connected.
    pub connected: GaugeVec,
    pub dispatch_duration: HistogramVec, // In Microseconds
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.frames_in.render("wsnotify_frames_in_total", &mut out);
        self.frames_out.render("wsnotify_frames_out_total", &mut out);
        self.frames_stale.render("wsnotify_frames_stale_total", &mut out);
        self.send_rejected.render("wsnotify_send_rejected_total", &mut out);
        self.decode_errors.render("wsnotify_decode_errors_total", &mut out);
        self.handler_errors.render("wsnotify_handler_errors_total", &mut out);
        self.transport_errors.render("wsnotify_transport_errors_total", &mut out);
        self.connects.render("wsnotify_connects_total", &mut out);
        self.disconnects.render("wsnotify_disconnects_total", &mut out);
        self.reconnect_attempts.render("wsnotify_reconnect_attempts_total", &mut out);
        self.connected.render("wsnotify_connected", &mut out);
        self.dispatch_duration.render("wsnotify_dispatch_duration_micros", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_with_sorted_labels() {
        let m = ClientMetrics::new();
        m.frames_in.inc(&[("msg_type", "chat")]);
        m.frames_in.inc(&[("msg_type", "chat")]);
        m.decode_errors.inc(&[]);
        m.handler_errors.add(&[("msg_type", "a\"b")], 3);

        assert_eq!(m.frames_in.get(&[("msg_type", "chat")]), 2);
        assert_eq!(m.frames_in.get(&[("msg_type", "presence")]), 0);

        let out = m.render();
        assert!(out.contains("wsnotify_frames_in_total{msg_type=\"chat\"} 2"));
        assert!(out.contains("wsnotify_decode_errors_total 1"));
        assert!(out.contains("wsnotify_handler_errors_total{msg_type=\"a\\\"b\"} 3"));
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let m = ClientMetrics::new();
        m.dispatch_duration.observe(&[], Duration::from_micros(40));
        m.dispatch_duration.observe(&[], Duration::from_millis(2));
        assert_eq!(m.dispatch_duration.count(&[]), 2);

        let out = m.render();
        assert!(out.contains("wsnotify_dispatch_duration_micros_bucket{le=\"50\"} 1"));
        assert!(out.contains("wsnotify_dispatch_duration_micros_bucket{le=\"5000\"} 2"));
        assert!(out.contains("wsnotify_dispatch_duration_micros_bucket{le=\"+Inf\"} 2"));
        assert!(out.contains("wsnotify_dispatch_duration_micros_count 2"));
    }
}
