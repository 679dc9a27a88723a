//! Connection mode as exposed to readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller mode.
///
/// `Synthetic` is reported whenever the synthetic feed is running and no
/// live session is open, even while a reconnect attempt is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Live,
    Reconnecting,
    Synthetic,
    /// Controller has shut down.
    Stopped,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Reconnecting => "reconnecting",
            Self::Synthetic => "synthetic",
            Self::Stopped => "stopped",
        }
    }

    /// All states, for exhaustive gauge resets.
    pub const ALL: [ConnectionState; 5] = [
        Self::Connecting,
        Self::Live,
        Self::Reconnecting,
        Self::Synthetic,
        Self::Stopped,
    ];
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only connection summary for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_live: bool,
    /// Time of the last snapshot/history write, if any.
    pub last_update_time: Option<DateTime<Utc>>,
    pub is_synthetic: bool,
    pub state: ConnectionState,
}
