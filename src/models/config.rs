use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User configuration from `HDC UDID Config.yaml`
///
/// Contains the hdc location override and server lifecycle preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "HDC_Settings", default)]
    pub settings: ToolSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Explicit hdc executable; empty means auto-detect next to the application
    #[serde(rename = "HDC Path", default)]
    pub hdc_path: String,

    /// Run `hdc start` before each device refresh
    #[serde(rename = "Start Server On Refresh", default)]
    pub start_server_on_refresh: bool,

    /// Pause after `hdc start` so the server can see attached devices
    #[serde(rename = "Server Settle Delay Ms", default = "default_settle_delay_ms")]
    pub server_settle_delay_ms: u64,

    /// Run `hdc kill` when the window closes
    #[serde(rename = "Kill Server On Exit", default)]
    pub kill_server_on_exit: bool,

    /// Per-invocation timeout in seconds, 0 disables it
    #[serde(rename = "Command Timeout Secs", default)]
    pub command_timeout_secs: u64,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            hdc_path: String::new(),
            start_server_on_refresh: false,
            server_settle_delay_ms: default_settle_delay_ms(),
            kill_server_on_exit: false,
            command_timeout_secs: 0,
            debug_mode: false,
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    1000
}

impl ToolSettings {
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }

    pub fn server_settle_delay(&self) -> Duration {
        Duration::from_millis(self.server_settle_delay_ms)
    }
}
