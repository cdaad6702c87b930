//! Immutable per-session configuration.

use std::time::Duration;

/// Everything the engine needs to know about the session it is driving:
/// display geometry, perception thresholds and retry budgets.
///
/// Constructed once at session start and shared by `Arc` between the
/// perception adapter, recognizer, navigator and anchor cache. Display
/// geometry is assumed stable for the lifetime of the session; a geometry
/// change requires a new session (and invalidates the anchor cache).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client-area width in pixels.
    pub viewport_width: u32,
    /// Client-area height in pixels.
    pub viewport_height: u32,
    /// Display scale factor (1.0 = 100%).
    pub scale_factor: f64,
    /// Offset from viewport-local coordinates to absolute screen coordinates
    /// (window origin, title bar already accounted for).
    pub window_origin: (i32, i32),
    /// Width at which image templates were authored; templates are rescaled
    /// by `viewport_width / reference_width` before matching.
    pub reference_width: u32,
    /// Minimum confidence for an OCR span or template match to count.
    pub confidence_threshold: f32,
    /// Pixels added on every side of a cached rectangle before the cropped
    /// confirmation scan, to tolerate sub-pixel drift between runs.
    pub crop_margin: i32,
    /// Settle time after a click before the next recognition.
    pub click_delay: Duration,
    /// Sleep between attempts in a confirmation loop.
    pub confirm_interval: Duration,
    /// Attempts per confirmation loop.
    pub confirm_attempts: u32,
    /// How many times navigation may fall back to the home screen before
    /// giving up.
    pub recovery_attempts: u32,
    /// Backoff between home-screen confirmation attempts during recovery.
    pub recovery_backoff: Duration,
    /// Re-captures allowed when the OCR engine returns zero raw spans
    /// (a frame grabbed mid-transition).
    pub blank_frame_retries: u32,
    /// Sleep between those re-captures.
    pub blank_frame_delay: Duration,
    /// Iteration cap for a single screen-to-screen transition loop.
    pub max_step_iterations: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport_width: 3840,
            viewport_height: 2160,
            scale_factor: 1.0,
            window_origin: (0, 0),
            reference_width: 3840,
            confidence_threshold: 0.8,
            crop_margin: 5,
            click_delay: Duration::from_millis(500),
            confirm_interval: Duration::from_millis(500),
            confirm_attempts: 10,
            recovery_attempts: 5,
            recovery_backoff: Duration::from_secs(1),
            blank_frame_retries: 3,
            blank_frame_delay: Duration::from_millis(200),
            max_step_iterations: 50,
        }
    }
}
