// HDC UDID - read HarmonyOS device UDIDs through the hdc device bridge
//
// This is the library crate containing the core logic and data structures.
// The binary crate (main.rs) provides the GUI entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AppState, ToolSettings, UserConfig};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Window and dialog title
pub const APP_NAME: &str = "HarmonyOS UDID Tool";

pub const APP_AUTHOR: &str = "@仙银";

/// Project home page shown in the About dialog
pub const PROJECT_URL: &str = "https://github.com/iHongRen/hdc-uuid-tool";
