//! UDID classification for `hdc -t <device> shell bm get -u` output.
//!
//! The bridge tool's output format is not under our control, so the marker strings
//! and the length threshold below are kept exactly as the tool has always been
//! matched against. Changing any of them changes what users see.

use regex::Regex;
use std::sync::LazyLock;

/// Marker that must appear (case-insensitive) in stdout for a UDID line
pub const UDID_MARKER: &str = "udid";

/// A parsed candidate must be strictly longer than this many characters
pub const MIN_UDID_LEN_EXCLUSIVE: usize = 10;

/// stderr marker reported when `bm` is missing on the device
pub const HELPER_MISSING_MARKER: &str = "not found";

/// Display text used whenever no UDID could be extracted
pub const UDID_FAILURE_PLACEHOLDER: &str = "Failed to get UDID";

pub const STATUS_SUCCESS: &str = "UDID retrieved successfully";
pub const STATUS_PARTIAL: &str = "Partial information received (please verify manually)";
pub const STATUS_HELPER_MISSING: &str = "Error: the 'bm' tool was not found on the device.";
pub const STATUS_UNAUTHORIZED: &str =
    "Error: make sure the device is unlocked and HDC is authorized.";

static UDID_MARKER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)udid").expect("Invalid UDID marker regex"));

static HELPER_MISSING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)not found").expect("Invalid helper-missing regex"));

/// Why a UDID query produced no usable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdidFailure {
    /// stdout carried the marker but the value was missing or too short
    InvalidFormat { raw: String },

    /// stderr says the `bm` helper does not exist on the device
    HelperMissing,

    /// Anything else with empty stdout: locked screen, unauthorized hdc, launch failure
    Unauthorized,
}

/// Classified result of a UDID query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdidOutcome {
    Success(String),
    /// Unrecognized but non-empty output, shown verbatim for the user to verify
    Partial(String),
    Failure(UdidFailure),
}

impl UdidOutcome {
    /// Text for the read-only identifier display
    pub fn display_text(&self) -> &str {
        match self {
            UdidOutcome::Success(udid) => udid,
            UdidOutcome::Partial(raw) => raw,
            UdidOutcome::Failure(_) => UDID_FAILURE_PLACEHOLDER,
        }
    }

    /// Status line describing the outcome
    pub fn status_message(&self) -> String {
        match self {
            UdidOutcome::Success(_) => STATUS_SUCCESS.to_string(),
            UdidOutcome::Partial(_) => STATUS_PARTIAL.to_string(),
            UdidOutcome::Failure(UdidFailure::InvalidFormat { raw }) => {
                format!("Device returned an invalid result: {}", raw)
            }
            UdidOutcome::Failure(UdidFailure::HelperMissing) => STATUS_HELPER_MISSING.to_string(),
            UdidOutcome::Failure(UdidFailure::Unauthorized) => STATUS_UNAUTHORIZED.to_string(),
        }
    }

    /// Whether the copy action should be offered for this outcome
    pub fn is_copyable(&self) -> bool {
        !matches!(self, UdidOutcome::Failure(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UdidOutcome::Success(_))
    }
}

/// Classify raw `bm get -u` output.
///
/// `stdout` is `None` when the bridge tool could not be launched; it is treated the
/// same as empty output. Pure function of its inputs.
pub fn classify_udid(stdout: Option<&str>, stderr: &str) -> UdidOutcome {
    let stdout = stdout.unwrap_or("");

    if !stdout.is_empty() && UDID_MARKER_PATTERN.is_match(stdout) {
        return match stdout.split_once(':') {
            Some((_, value)) => {
                let candidate = value.trim();
                if candidate.chars().count() > MIN_UDID_LEN_EXCLUSIVE {
                    UdidOutcome::Success(candidate.to_string())
                } else {
                    UdidOutcome::Failure(UdidFailure::InvalidFormat {
                        raw: stdout.to_string(),
                    })
                }
            }
            None => UdidOutcome::Failure(UdidFailure::InvalidFormat {
                raw: stdout.to_string(),
            }),
        };
    }

    if !stdout.is_empty() {
        return UdidOutcome::Partial(stdout.trim().to_string());
    }

    if HELPER_MISSING_PATTERN.is_match(stderr) {
        UdidOutcome::Failure(UdidFailure::HelperMissing)
    } else {
        UdidOutcome::Failure(UdidFailure::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_with_uppercase_marker() {
        let outcome = classify_udid(Some("UDID: 1234567890ABCDEF"), "");
        assert_eq!(outcome, UdidOutcome::Success("1234567890ABCDEF".to_string()));
        assert_eq!(outcome.status_message(), STATUS_SUCCESS);
        assert!(outcome.is_copyable());
    }

    #[test]
    fn test_short_value_is_invalid_format() {
        let outcome = classify_udid(Some("udid: short"), "");
        assert_eq!(outcome.display_text(), UDID_FAILURE_PLACEHOLDER);
        assert!(outcome.status_message().contains("udid: short"));
        assert!(!outcome.is_copyable());
    }

    #[test]
    fn test_exactly_ten_chars_is_rejected() {
        let outcome = classify_udid(Some("udid:0123456789"), "");
        assert!(matches!(
            outcome,
            UdidOutcome::Failure(UdidFailure::InvalidFormat { .. })
        ));

        let outcome = classify_udid(Some("udid:01234567890"), "");
        assert_eq!(outcome, UdidOutcome::Success("01234567890".to_string()));
    }

    #[test]
    fn test_marker_without_colon() {
        let outcome = classify_udid(Some("udid unavailable on this build"), "");
        assert!(matches!(
            outcome,
            UdidOutcome::Failure(UdidFailure::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_splits_on_first_colon_only() {
        let outcome = classify_udid(Some("udid: AB:CD:EF:01:23:45"), "");
        assert_eq!(outcome, UdidOutcome::Success("AB:CD:EF:01:23:45".to_string()));
    }

    #[test]
    fn test_unrelated_output_is_partial() {
        let outcome = classify_udid(Some("some unrelated text"), "");
        assert_eq!(outcome, UdidOutcome::Partial("some unrelated text".to_string()));
        assert_eq!(outcome.status_message(), STATUS_PARTIAL);
        assert!(outcome.is_copyable());
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_helper_missing_any_case() {
        let outcome = classify_udid(Some(""), "/bin/sh: bm: NOT FOUND");
        assert_eq!(outcome, UdidOutcome::Failure(UdidFailure::HelperMissing));
        assert_eq!(outcome.status_message(), STATUS_HELPER_MISSING);
    }

    #[test]
    fn test_generic_failure() {
        let outcome = classify_udid(Some(""), "permission denied");
        assert_eq!(outcome, UdidOutcome::Failure(UdidFailure::Unauthorized));
        assert_eq!(outcome.status_message(), STATUS_UNAUTHORIZED);
    }

    #[test]
    fn test_launch_failure_is_treated_as_empty_output() {
        let outcome = classify_udid(None, "No such file or directory (os error 2)");
        assert_eq!(outcome, UdidOutcome::Failure(UdidFailure::Unauthorized));
    }
}
