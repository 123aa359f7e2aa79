use crate::host::CandidateQuery;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How overlay keystrokes reach the host composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayPolicy {
    /// Replay every edit into the host immediately. Keeps the host in sync
    /// continuously but pays its full re-render cost per keystroke.
    Live,
    /// Accumulate edits locally; the host sees nothing until a commit.
    Buffered,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        RelayPolicy::Buffered
    }
}

impl std::fmt::Display for RelayPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayPolicy::Live => write!(f, "live"),
            RelayPolicy::Buffered => write!(f, "buffered"),
        }
    }
}

/// The host-side signal that a send has finished processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadySignal {
    /// Composer returns to an editable (not disabled/read-only) state.
    Editable,
    /// Composer value becomes empty.
    Emptied,
}

impl Default for ReadySignal {
    fn default() -> Self {
        ReadySignal::Editable
    }
}

/// Where the overlay surface is placed relative to the host composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// Directly over the composer. The send control is never covered; its
    /// hit area lies outside the composer rectangle.
    Layered,
    /// Above the composer, separated by `gutter_px`.
    Adjacent,
}

impl Default for InsertMode {
    fn default() -> Self {
        InsertMode::Layered
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub relay_policy: RelayPolicy,
    #[serde(default)]
    pub ready_signal: ReadySignal,
    #[serde(default)]
    pub insert_mode: InsertMode,
    /// Layer a transparent hit target over the send control while it is
    /// disabled, so taps on it commit the buffer instead of bouncing off.
    #[serde(default = "default_intercept_send")]
    pub intercept_send: bool,
    /// Fragment of the composer placeholder the discovery query matches.
    #[serde(default = "default_placeholder_fragment")]
    pub placeholder_fragment: String,
    /// Fragment of the send control title the discovery query matches.
    #[serde(default = "default_action_title_fragment")]
    pub action_title_fragment: String,
    /// Vertical gap in pixels between composer and overlay in adjacent mode.
    #[serde(default = "default_gutter_px")]
    pub gutter_px: f64,
    /// Interval between discovery polls.
    #[serde(default = "default_detect_poll_ms")]
    pub detect_poll_ms: u64,
    /// How long a candidate's geometry must hold still before it is trusted.
    #[serde(default = "default_detect_dwell_ms")]
    pub detect_dwell_ms: u64,
    /// Overall bound on one discovery attempt.
    #[serde(default = "default_detect_timeout_ms")]
    pub detect_timeout_ms: u64,
    /// Minimum rendered size of a candidate; filters skeleton placeholders.
    #[serde(default = "default_detect_min_size")]
    pub detect_min_size: (f64, f64),
    /// Frame throttle for geometry sync triggered by layout notifications.
    #[serde(default = "default_sync_min_interval_ms")]
    pub sync_min_interval_ms: u64,
    /// Safety-net resync period for layout shifts that emit no notification
    /// (on-screen keyboard, host-driven reflow).
    #[serde(default = "default_sync_safety_interval_ms")]
    pub sync_safety_interval_ms: u64,
    /// How long the protocol waits for the send control to become
    /// actionable after injection. One retry extension of the same length
    /// is granted before aborting.
    #[serde(default = "default_actionable_timeout_ms")]
    pub actionable_timeout_ms: u64,
    /// How long the protocol waits for the host's readiness signal after
    /// clicking send. Expiry counts as best-effort success.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Rendered opacity below which the send control is treated as disabled
    /// even without an explicit disabled flag.
    #[serde(default = "default_actionable_opacity_min")]
    pub actionable_opacity_min: f64,
    /// When true the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_intercept_send() -> bool {
    true
}

fn default_placeholder_fragment() -> String {
    "message".into()
}

fn default_action_title_fragment() -> String {
    "send".into()
}

fn default_gutter_px() -> f64 {
    8.0
}

fn default_detect_poll_ms() -> u64 {
    100
}

fn default_detect_dwell_ms() -> u64 {
    500
}

fn default_detect_timeout_ms() -> u64 {
    30_000
}

fn default_detect_min_size() -> (f64, f64) {
    (40.0, 16.0)
}

fn default_sync_min_interval_ms() -> u64 {
    16
}

fn default_sync_safety_interval_ms() -> u64 {
    350
}

fn default_actionable_timeout_ms() -> u64 {
    700
}

fn default_ready_timeout_ms() -> u64 {
    8_000
}

fn default_actionable_opacity_min() -> f64 {
    0.5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            relay_policy: RelayPolicy::Buffered,
            ready_signal: ReadySignal::Editable,
            insert_mode: InsertMode::Layered,
            intercept_send: default_intercept_send(),
            placeholder_fragment: default_placeholder_fragment(),
            action_title_fragment: default_action_title_fragment(),
            gutter_px: default_gutter_px(),
            detect_poll_ms: default_detect_poll_ms(),
            detect_dwell_ms: default_detect_dwell_ms(),
            detect_timeout_ms: default_detect_timeout_ms(),
            detect_min_size: default_detect_min_size(),
            sync_min_interval_ms: default_sync_min_interval_ms(),
            sync_safety_interval_ms: default_sync_safety_interval_ms(),
            actionable_timeout_ms: default_actionable_timeout_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
            actionable_opacity_min: default_actionable_opacity_min(),
            debug_logging: false,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn candidate_query(&self) -> CandidateQuery {
        CandidateQuery {
            placeholder_fragment: self.placeholder_fragment.clone(),
            action_title_fragment: self.action_title_fragment.clone(),
        }
    }

    pub fn detect_poll(&self) -> Duration {
        Duration::from_millis(self.detect_poll_ms)
    }

    pub fn detect_dwell(&self) -> Duration {
        Duration::from_millis(self.detect_dwell_ms)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }

    pub fn sync_min_interval(&self) -> Duration {
        Duration::from_millis(self.sync_min_interval_ms)
    }

    pub fn sync_safety_interval(&self) -> Duration {
        Duration::from_millis(self.sync_safety_interval_ms)
    }

    pub fn actionable_timeout(&self) -> Duration {
        Duration::from_millis(self.actionable_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}
