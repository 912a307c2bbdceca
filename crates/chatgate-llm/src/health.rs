//! Provider health tracking over a rolling window of outcomes.
//!
//! When a provider's recent error rate exceeds the threshold, the
//! `provider_degraded{provider}` gauge is set to 1 and a warning is logged.
//! Observability only; routing decisions never consult it.

use std::collections::VecDeque;

use chatgate_core::ProviderSelection;
use parking_lot::Mutex;
use tracing::warn;

/// Gauge set to 1 while a provider is degraded.
pub const PROVIDER_DEGRADED: &str = "provider_degraded";

const DEFAULT_WINDOW_SIZE: usize = 10;
const DEFAULT_DEGRADED_THRESHOLD: f64 = 0.5;

/// Outcomes needed before a provider can be reported degraded.
const MIN_SAMPLES: usize = 2;

/// Per-provider health tracker. Share via `Arc`.
pub struct ProviderHealthTracker {
    windows: [Mutex<VecDeque<bool>>; 2],
    window_size: usize,
    threshold: f64,
}

impl ProviderHealthTracker {
    /// Tracker with a 10-request window and 50% threshold.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_WINDOW_SIZE, DEFAULT_DEGRADED_THRESHOLD)
    }

    /// Tracker with a custom window size and threshold.
    pub fn with_config(window_size: usize, threshold: f64) -> Self {
        let window_size = window_size.max(1);
        Self {
            windows: [
                Mutex::new(VecDeque::with_capacity(window_size)),
                Mutex::new(VecDeque::with_capacity(window_size)),
            ],
            window_size,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Record a successful completion.
    pub fn record_success(&self, provider: ProviderSelection) {
        self.record(provider, true);
    }

    /// Record a failed completion.
    pub fn record_failure(&self, provider: ProviderSelection) {
        self.record(provider, false);
    }

    /// Whether the provider's recent error rate is above the threshold.
    pub fn is_degraded(&self, provider: ProviderSelection) -> bool {
        let window = self.window(provider).lock();
        self.degraded(&window)
    }

    /// Recent error rate in `0.0..=1.0`.
    pub fn error_rate(&self, provider: ProviderSelection) -> f64 {
        error_rate(&self.window(provider).lock())
    }

    fn window(&self, provider: ProviderSelection) -> &Mutex<VecDeque<bool>> {
        match provider {
            ProviderSelection::PrimaryHosted => &self.windows[0],
            ProviderSelection::LocalFallback => &self.windows[1],
        }
    }

    fn degraded(&self, window: &VecDeque<bool>) -> bool {
        window.len() >= MIN_SAMPLES && error_rate(window) > self.threshold
    }

    fn record(&self, provider: ProviderSelection, success: bool) {
        let mut window = self.window(provider).lock();
        if window.len() == self.window_size {
            let _ = window.pop_front();
        }
        window.push_back(success);

        let degraded = self.degraded(&window);
        metrics::gauge!(PROVIDER_DEGRADED, "provider" => provider.name())
            .set(if degraded { 1.0 } else { 0.0 });

        if degraded && !success {
            warn!(
                provider = provider.name(),
                error_rate = format!("{:.0}%", error_rate(&window) * 100.0),
                window = self.window_size,
                "provider degraded, high error rate"
            );
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn error_rate(window: &VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window.iter().filter(|ok| !**ok).count();
    failures as f64 / window.len() as f64
}

impl Default for ProviderHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderHealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHealthTracker")
            .field("window_size", &self.window_size)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
