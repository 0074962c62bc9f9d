use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_ms;

pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Fixed deadline applied to every guarded call.
    #[serde(with = "duration_ms")]
    pub deadline: Duration,
    /// Terminate the hosting process once a fault has been reported.
    pub strict: bool,
    /// Exit status used by strict-mode termination.
    pub exit_code: i32,
    pub thread_name: String,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            strict: false,
            exit_code: 1,
            thread_name: "playerlink-watchdog".to_string(),
        }
    }
}
