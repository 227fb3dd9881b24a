//! Locating the bundled `hdc` executable.
//!
//! The binary sits in different places depending on how the app was launched:
//! next to the executable in a packaged build, under `hdc-tool/` in a development
//! tree, or in `Contents/Resources` inside a macOS `.app` bundle.

use crate::models::ToolSettings;
use camino::{Utf8Path, Utf8PathBuf};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable that overrides the hdc location
pub const HDC_PATH_ENV: &str = "HDC_UDID_HDC_PATH";

/// Directory name used for hdc in a development tree
pub const DEV_TOOL_DIR: &str = "hdc-tool";

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("hdc executable not found (searched: {})", format_searched(.searched))]
    HdcNotFound { searched: Vec<Utf8PathBuf> },

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Failed to determine current executable: {0}")]
    CurrentExe(#[from] std::io::Error),
}

fn format_searched(searched: &[Utf8PathBuf]) -> String {
    searched
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Platform file name of the bridge tool
pub fn hdc_file_name() -> &'static str {
    if cfg!(windows) { "hdc.exe" } else { "hdc" }
}

/// Candidate locations in priority order
pub fn candidate_paths(
    configured: Option<&Utf8Path>,
    env_override: Option<&Utf8Path>,
    exe_dir: Option<&Utf8Path>,
) -> Vec<Utf8PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = configured {
        candidates.push(path.to_path_buf());
    }
    if let Some(path) = env_override {
        candidates.push(path.to_path_buf());
    }
    if let Some(dir) = exe_dir {
        candidates.push(dir.join(hdc_file_name()));
        candidates.push(dir.join(DEV_TOOL_DIR).join(hdc_file_name()));
        if let Some(contents) = dir.parent() {
            candidates.push(contents.join("Resources").join(hdc_file_name()));
        }
    }

    candidates
}

/// Pick the first candidate that is an existing file
pub fn first_existing(candidates: Vec<Utf8PathBuf>) -> Result<Utf8PathBuf, ResourceError> {
    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(ResourceError::HdcNotFound {
            searched: candidates,
        }),
    }
}

fn current_exe_dir() -> Result<Option<Utf8PathBuf>, ResourceError> {
    let exe = std::env::current_exe()?;
    let exe = Utf8PathBuf::try_from(exe).map_err(|e| ResourceError::NonUtf8Path(e.into_path_buf()))?;
    Ok(exe.parent().map(Utf8Path::to_path_buf))
}

/// Resolve the hdc executable for this process.
///
/// Called once at startup; the result is treated as read-only afterwards.
pub fn locate_hdc(settings: &ToolSettings) -> Result<Utf8PathBuf, ResourceError> {
    let configured = (!settings.hdc_path.trim().is_empty())
        .then(|| Utf8PathBuf::from(settings.hdc_path.trim()));
    let env_override = std::env::var(HDC_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Utf8PathBuf::from);
    let exe_dir = current_exe_dir()?;

    let candidates = candidate_paths(
        configured.as_deref(),
        env_override.as_deref(),
        exe_dir.as_deref(),
    );
    let found = first_existing(candidates)?;

    tracing::info!("Using hdc at {}", found);
    Ok(found)
}

/// Directory expected to hold the shared library bundled with hdc
pub fn library_dir(hdc_path: &Utf8Path) -> Option<Utf8PathBuf> {
    hdc_path.parent().map(Utf8Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_order() {
        let candidates = candidate_paths(
            Some(Utf8Path::new("/custom/hdc")),
            Some(Utf8Path::new("/env/hdc")),
            Some(Utf8Path::new("/app/MacOS")),
        );

        assert_eq!(candidates[0], Utf8PathBuf::from("/custom/hdc"));
        assert_eq!(candidates[1], Utf8PathBuf::from("/env/hdc"));
        assert_eq!(candidates[2], Utf8Path::new("/app/MacOS").join(hdc_file_name()));
        assert_eq!(
            candidates[3],
            Utf8Path::new("/app/MacOS").join(DEV_TOOL_DIR).join(hdc_file_name())
        );
        assert_eq!(
            candidates[4],
            Utf8Path::new("/app/Resources").join(hdc_file_name())
        );
    }

    #[test]
    fn test_first_existing_picks_dev_layout() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let tool_dir = root.join(DEV_TOOL_DIR);
        std::fs::create_dir_all(&tool_dir).unwrap();
        std::fs::write(tool_dir.join(hdc_file_name()), "").unwrap();

        let found = first_existing(candidate_paths(None, None, Some(&root))).unwrap();
        assert_eq!(found, tool_dir.join(hdc_file_name()));
    }

    #[test]
    fn test_not_found_lists_searched_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let err = first_existing(candidate_paths(None, None, Some(&root))).unwrap_err();
        match err {
            ResourceError::HdcNotFound { ref searched } => assert_eq!(searched.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains(root.as_str()));
    }

    #[test]
    fn test_library_dir() {
        assert_eq!(
            library_dir(Utf8Path::new("/bundle/Resources/hdc")),
            Some(Utf8PathBuf::from("/bundle/Resources"))
        );
    }
}
