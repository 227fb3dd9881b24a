//! Data models for the HDC UDID tool.
//!
//! - [`AppState`]: Everything the window displays, owned by [`StateManager`](crate::state::StateManager)
//! - [`UserConfig`]: User preferences loaded from `HDC UDID Config.yaml`
//! - [`ToolSettings`]: The settings block inside [`UserConfig`]

pub mod app_state;
pub mod config;

pub use app_state::AppState;
pub use config::{ToolSettings, UserConfig};
