//! Device enumeration from `hdc list targets` output.

pub const STATUS_NO_DEVICES: &str = "No devices detected, please connect a device...";
pub const STATUS_SELECT_DEVICE: &str = "Select a device from the list";

/// Devices reported by one `list targets` call, in the order hdc printed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceListing {
    pub devices: Vec<String>,

    /// Set when hdc itself could not be run
    pub launch_error: Option<String>,
}

impl DeviceListing {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Status line for this listing. An empty listing is informational, not an error.
    pub fn status_message(&self) -> String {
        if let Some(ref error) = self.launch_error {
            format!("Error: could not run hdc ({})", error)
        } else if self.devices.is_empty() {
            STATUS_NO_DEVICES.to_string()
        } else {
            STATUS_SELECT_DEVICE.to_string()
        }
    }
}

/// Split `list targets` stdout into device identifiers.
///
/// Blank lines are dropped; order and duplicates are preserved. `None` (launch
/// failure) yields an empty listing.
pub fn parse_device_list(stdout: Option<&str>) -> DeviceListing {
    let devices = stdout
        .unwrap_or("")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    DeviceListing {
        devices,
        launch_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stdout() {
        let listing = parse_device_list(Some(""));
        assert!(listing.is_empty());
        assert_eq!(listing.status_message(), STATUS_NO_DEVICES);
    }

    #[test]
    fn test_absent_stdout() {
        assert_eq!(parse_device_list(None).len(), 0);
    }

    #[test]
    fn test_launch_error_status() {
        let listing = DeviceListing {
            devices: Vec::new(),
            launch_error: Some("permission denied".to_string()),
        };
        assert!(listing.status_message().starts_with("Error:"));
        assert!(listing.status_message().contains("permission denied"));
    }

    #[test]
    fn test_keeps_order_and_skips_blank_lines() {
        let listing = parse_device_list(Some("FMR0223C13000649\r\n\n  127.0.0.1:5555  \nFMR0223C13000649"));
        assert_eq!(
            listing.devices,
            vec![
                "FMR0223C13000649".to_string(),
                "127.0.0.1:5555".to_string(),
                "FMR0223C13000649".to_string(),
            ]
        );
        assert_eq!(listing.status_message(), STATUS_SELECT_DEVICE);
    }
}
