use crate::services::udid::UdidOutcome;
use camino::Utf8PathBuf;

/// Status shown before the first refresh completes
pub const STATUS_INITIAL: &str = "Click refresh to load the device list";

/// Display text shown before any device is selected
pub const DISPLAY_SELECT_DEVICE: &str = "Please select a device first";

pub const DISPLAY_REFRESHING: &str = "Refreshing...";
pub const DISPLAY_FETCHING: &str = "...";
pub const DISPLAY_NO_DEVICE: &str = "No device detected";
pub const STATUS_REFRESHING: &str = "Refreshing device list...";
pub const HDC_PATH_UNKNOWN: &str = "not located";

/// Single source of truth for everything the window shows.
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`];
/// never mutate it directly. All changes go through the manager's transition
/// functions so that stale background results can be rejected by generation.
#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    /// Resolved bridge binary, read-only after startup
    pub hdc_path: Option<Utf8PathBuf>,

    // Device selector
    pub devices: Vec<String>,
    pub selected_device: Option<String>,

    // Identifier display
    pub udid_display: String,
    pub udid_outcome: Option<UdidOutcome>,

    pub status_message: String,

    // In-flight work
    pub is_refreshing: bool,
    pub is_fetching_udid: bool,

    // Monotonic tags for dispatched background tasks
    pub refresh_generation: u64,
    pub udid_generation: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            hdc_path: None,
            devices: Vec::new(),
            selected_device: None,
            udid_display: DISPLAY_SELECT_DEVICE.to_string(),
            udid_outcome: None,
            status_message: STATUS_INITIAL.to_string(),
            is_refreshing: false,
            is_fetching_udid: false,
            refresh_generation: 0,
            udid_generation: 0,
        }
    }
}

impl AppState {
    /// The value the copy action would place on the clipboard, if any
    pub fn copyable_udid(&self) -> Option<&str> {
        if self.is_fetching_udid {
            return None;
        }
        self.udid_outcome
            .as_ref()
            .filter(|outcome| outcome.is_copyable())
            .map(|outcome| outcome.display_text())
    }

    pub fn can_copy(&self) -> bool {
        self.copyable_udid().is_some()
    }

    /// Device selector is usable only when not refreshing and something is listed
    pub fn can_select_device(&self) -> bool {
        !self.is_refreshing && !self.devices.is_empty()
    }

    /// Bridge location for display, or a placeholder before it is resolved
    pub fn hdc_path_label(&self) -> String {
        self.hdc_path
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| HDC_PATH_UNKNOWN.to_string())
    }

    /// Index of the selected device in `devices`, or -1 for the Slint combo box
    pub fn selected_index(&self) -> i32 {
        self.selected_device
            .as_ref()
            .and_then(|selected| self.devices.iter().position(|d| d == selected))
            .map(|i| i as i32)
            .unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::udid::UdidFailure;

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert!(state.devices.is_empty());
        assert!(!state.can_copy());
        assert!(!state.can_select_device());
        assert_eq!(state.selected_index(), -1);
        assert_eq!(state.status_message, STATUS_INITIAL);
    }

    #[test]
    fn test_copyable_udid_requires_copyable_outcome() {
        let mut state = AppState {
            udid_outcome: Some(UdidOutcome::Success("ABCDEF0123456789".to_string())),
            ..AppState::default()
        };
        assert_eq!(state.copyable_udid(), Some("ABCDEF0123456789"));

        state.udid_outcome = Some(UdidOutcome::Failure(UdidFailure::HelperMissing));
        assert_eq!(state.copyable_udid(), None);
    }

    #[test]
    fn test_hdc_path_label() {
        let mut state = AppState::default();
        assert_eq!(state.hdc_path_label(), HDC_PATH_UNKNOWN);

        state.hdc_path = Some(Utf8PathBuf::from("/Applications/HDC.app/Contents/Resources/hdc"));
        assert_eq!(
            state.hdc_path_label(),
            "/Applications/HDC.app/Contents/Resources/hdc"
        );
    }

    #[test]
    fn test_no_copy_while_fetching() {
        let state = AppState {
            udid_outcome: Some(UdidOutcome::Partial("raw".to_string())),
            is_fetching_udid: true,
            ..AppState::default()
        };
        assert!(!state.can_copy());
    }

    #[test]
    fn test_selected_index() {
        let state = AppState {
            devices: vec!["a".to_string(), "b".to_string()],
            selected_device: Some("b".to_string()),
            ..AppState::default()
        };
        assert_eq!(state.selected_index(), 1);
    }
}
