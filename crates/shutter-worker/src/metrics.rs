//! Prometheus metrics for artifact generation.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use shutter_models::MediaClass;

use crate::logging::GenerationPath;

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Metric names as constants for consistency.
pub mod names {
    // Request metrics
    pub const ARTIFACT_REQUESTS_TOTAL: &str = "shutter_artifact_requests_total";
    pub const WAIT_TIMEOUTS_TOTAL: &str = "shutter_wait_timeouts_total";

    // Generation metrics
    pub const GENERATIONS_TOTAL: &str = "shutter_generations_total";
    pub const GENERATION_DURATION_SECONDS: &str = "shutter_generation_duration_seconds";

    // Queue metrics
    pub const QUEUE_FALLBACKS_TOTAL: &str = "shutter_queue_fallbacks_total";
    pub const QUEUE_DEPTH: &str = "shutter_queue_depth";
}

/// Record one `get_or_create_artifact` call and how it ended.
///
/// `class` is `None` for unsupported file types.
pub fn record_artifact_request(class: Option<MediaClass>, outcome: &'static str) {
    let labels = [
        ("class", class.map(|c| c.as_str()).unwrap_or("unknown").to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::ARTIFACT_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record a finished generation attempt.
pub fn record_generation(
    class: MediaClass,
    path: GenerationPath,
    outcome: &'static str,
    duration_secs: f64,
) {
    let labels = [
        ("class", class.as_str().to_string()),
        ("path", path.as_str().to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::GENERATIONS_TOTAL, &labels).increment(1);

    let labels = [("class", class.as_str().to_string())];
    histogram!(names::GENERATION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a starter that generated inline because its queue was full.
pub fn record_queue_fallback(class: MediaClass) {
    let labels = [("class", class.as_str().to_string())];
    counter!(names::QUEUE_FALLBACKS_TOTAL, &labels).increment(1);
}

/// Record a waiter that gave up.
pub fn record_wait_timeout(class: MediaClass) {
    let labels = [("class", class.as_str().to_string())];
    counter!(names::WAIT_TIMEOUTS_TOTAL, &labels).increment(1);
}

/// Update the queue depth gauge.
pub fn set_queue_depth(class: MediaClass, depth: usize) {
    let labels = [("class", class.as_str().to_string())];
    gauge!(names::QUEUE_DEPTH, &labels).set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_artifact_request(None, "unsupported_type");
        record_artifact_request(Some(MediaClass::Image), "hit");
        record_generation(MediaClass::Motion, GenerationPath::Fallback, "ready", 0.25);
        record_queue_fallback(MediaClass::Image);
        record_wait_timeout(MediaClass::Motion);
        set_queue_depth(MediaClass::Image, 3);
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            names::ARTIFACT_REQUESTS_TOTAL,
            names::WAIT_TIMEOUTS_TOTAL,
            names::GENERATIONS_TOTAL,
            names::GENERATION_DURATION_SECONDS,
            names::QUEUE_FALLBACKS_TOTAL,
            names::QUEUE_DEPTH,
        ] {
            assert!(name.starts_with("shutter_"));
        }
    }
}
