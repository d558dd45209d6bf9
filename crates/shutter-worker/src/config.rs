//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use shutter_models::encoding::{DEFAULT_FRAME_OFFSET, PREVIEW_MAX_DIMENSION, THUMBNAIL_MAX_DIMENSION};
use shutter_models::MediaClass;

/// What a starter does when its class queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Generate inline on the caller's task; never drops a request
    #[default]
    Fallback,
    /// Fail fast with a retryable `QueueFull` error
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(OverflowPolicy::Fallback),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(format!("unknown overflow policy: {}", other)),
        }
    }
}

/// Artifact service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Capacity of each class queue
    pub queue_capacity: usize,
    /// Workers generating image-class artifacts
    pub image_workers: usize,
    /// Workers generating motion-class artifacts (more expensive per item)
    pub motion_workers: usize,
    /// How long a caller waits for a generation it joined
    pub wait_timeout: Duration,
    /// Bounding box of cached artifacts
    pub thumbnail_max_dimension: u32,
    /// Bounding box of uncached previews
    pub preview_max_dimension: u32,
    /// Representative frame offset for motion sources
    pub frame_offset: Duration,
    /// Behaviour when a class queue is full
    pub overflow_policy: OverflowPolicy,
    /// How long shutdown waits for workers to drain
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 250,
            image_workers: 2,
            motion_workers: 1,
            wait_timeout: Duration::from_secs(30),
            thumbnail_max_dimension: THUMBNAIL_MAX_DIMENSION,
            preview_max_dimension: PREVIEW_MAX_DIMENSION,
            frame_offset: DEFAULT_FRAME_OFFSET,
            overflow_policy: OverflowPolicy::Fallback,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            queue_capacity: env_parse("SHUTTER_QUEUE_CAPACITY")
                .unwrap_or(defaults.queue_capacity)
                .max(1),
            image_workers: env_parse("SHUTTER_IMAGE_WORKERS")
                .unwrap_or(defaults.image_workers)
                .max(1),
            motion_workers: env_parse("SHUTTER_MOTION_WORKERS")
                .unwrap_or(defaults.motion_workers)
                .max(1),
            wait_timeout: env_parse("SHUTTER_WAIT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.wait_timeout),
            thumbnail_max_dimension: env_parse("SHUTTER_THUMBNAIL_SIZE")
                .unwrap_or(defaults.thumbnail_max_dimension),
            preview_max_dimension: env_parse("SHUTTER_PREVIEW_SIZE")
                .unwrap_or(defaults.preview_max_dimension),
            frame_offset: env_parse("SHUTTER_FRAME_OFFSET_SECS")
                .and_then(|secs: f64| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(defaults.frame_offset),
            overflow_policy: env_parse("SHUTTER_OVERFLOW_POLICY")
                .unwrap_or(defaults.overflow_policy),
            shutdown_timeout: env_parse("SHUTTER_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }

    /// Worker count for a media class.
    pub fn workers_for(&self, class: MediaClass) -> usize {
        match class {
            MediaClass::Image => self.image_workers,
            MediaClass::Motion => self.motion_workers,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
