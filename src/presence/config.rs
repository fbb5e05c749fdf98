//! Tracker configuration

use std::time::Duration;

/// Default reconciliation period
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(10_000);

/// Bounds applied to the sweep interval
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default silence after which a session no longer counts as a viewer
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Default capacity of the worker's command queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Milliseconds of sweep period per unit of fragment duration
const SWEEP_MILLIS_PER_FRAGMENT_UNIT: u64 = 10 * 1000;

/// Host application settings read once at startup
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Segment/fragment duration of the streaming output, as configured
    pub fragment_duration: Option<String>,
}

impl Settings {
    pub fn with_fragment_duration(value: impl Into<String>) -> Self {
        Self {
            fragment_duration: Some(value.into()),
        }
    }
}

/// Tracker configuration options
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// How often the worker reconciles sessions against the store
    pub sweep_interval: Duration,

    /// A session not seen for longer than this is evicted
    pub session_timeout: Duration,

    /// Bounded command queue size (registrations beyond it are rejected)
    pub queue_capacity: usize,

    /// Drop subscriber mappings of evicted sessions and torn-down streams
    ///
    /// When false, mappings are only removed by `reset_stream`.
    pub prune_subscribers: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            prune_subscribers: true,
        }
    }
}

impl PresenceConfig {
    /// Create a config whose sweep period is derived from host settings
    ///
    /// Invalid settings fall back to `DEFAULT_SWEEP_INTERVAL`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::default().sweep_interval(sweep_interval_from_settings(
            settings,
            DEFAULT_SWEEP_INTERVAL,
        ))
    }

    /// Set the sweep interval, clamped to `MIN_SWEEP_INTERVAL..=MAX_SWEEP_INTERVAL`
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
        self
    }

    /// Sweep interval the worker runs with
    ///
    /// Clamped again here because the field can be set directly.
    pub fn sweep_period(&self) -> Duration {
        self.sweep_interval.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL)
    }

    /// Set the session timeout
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Set the command queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Keep subscriber mappings of evicted sessions
    pub fn retain_subscribers(mut self) -> Self {
        self.prune_subscribers = false;
        self
    }
}

/// Derive the sweep period as `fragment_duration * 10 s`
///
/// Missing or empty settings silently use `default`; anything else that is
/// not a positive integer is logged and also uses `default`.
pub fn sweep_interval_from_settings(settings: &Settings, default: Duration) -> Duration {
    let raw = match settings.fragment_duration.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return default,
    };

    let millis = raw
        .parse::<u64>()
        .ok()
        .filter(|units| *units > 0)
        .and_then(|units| units.checked_mul(SWEEP_MILLIS_PER_FRAGMENT_UNIT));

    match millis {
        Some(millis) => Duration::from_millis(millis),
        None => {
            tracing::error!(
                fragment_duration = raw,
                default_ms = default.as_millis() as u64,
                "Invalid fragment duration, using default sweep interval"
            );
            default
        }
    }
}
