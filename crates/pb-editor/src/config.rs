//! Editor configuration.
//!
//! Every field has a default so a partial JSON file (or none at all) is
//! enough to start an editor.

use pb_core::{ViewportClass, Zoom};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs for the editor session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Applied changes kept in the change log. Default: **200**.
    pub history_depth: usize,

    /// Buffered change events per subscriber before lagging. Default: **64**.
    pub event_capacity: usize,

    /// Upper bound on one resolver call. `None` waits forever.
    /// Default: **30000**.
    pub resolver_timeout_ms: Option<u64>,

    pub default_viewport: ViewportClass,

    /// Initial zoom percentage, clamped to the zoom range. Default: **100**.
    pub default_zoom: u16,

    /// Draw the canvas grid on startup. Default: **true**.
    pub show_grid: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 200,
            event_capacity: 64,
            resolver_timeout_ms: Some(30_000),
            default_viewport: ViewportClass::Wide,
            default_zoom: 100,
            show_grid: true,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn resolver_timeout(&self) -> Option<Duration> {
        self.resolver_timeout_ms.map(Duration::from_millis)
    }

    pub fn zoom(&self) -> Zoom {
        Zoom::new(self.default_zoom)
    }
}
