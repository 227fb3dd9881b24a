//! HarmonyOS UDID Tool
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary crate provides the Slint GUI frontend. It initializes:
//! - Configuration loading ([`ConfigManager`])
//! - Logging infrastructure (file rotation + console output)
//! - hdc discovery next to the executable
//! - Tokio async runtime (2 worker threads for hdc subprocesses)
//! - State management ([`StateManager`])
//! - GUI controller ([`GuiController`] - bridges Slint UI with hdc and state)
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: Runs the Slint event loop (blocking, synchronous)
//! - **Tokio workers**: Run hdc subprocesses
//! - **State listener**: Background std::thread that queues UI updates
//!
//! # Execution Flow
//!
//! 1. Load `HDC UDID Data/HDC UDID Config.yaml` (defaults if absent)
//! 2. Initialize logging → logs/hdc-udid.<date>
//! 3. Locate hdc; show a native error dialog and exit if it is missing
//! 4. Create tokio runtime with 2 worker threads
//! 5. Create StateManager and HdcClient
//! 6. Create GuiController and run the Slint event loop (auto-refreshes on start)
//! 7. Shutdown tokio runtime with 5s timeout

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;
use hdc_udid::config::DEFAULT_CONFIG_DIR;
use hdc_udid::logging::{self, LOG_DIR, LOG_PREFIX};
use hdc_udid::services::{HdcClient, library_dir, locate_hdc};
use hdc_udid::ui::GuiController;
use hdc_udid::{APP_NAME, ConfigManager, StateManager, VERSION};
use std::sync::Arc;
use std::time::Duration;

const WORKER_THREADS: usize = 2;

fn main() -> Result<()> {
    // The log level comes from the config, so load it before logging exists
    let config_manager = ConfigManager::new(DEFAULT_CONFIG_DIR)?;
    let user_config = config_manager.load_user_config()?;
    let settings = user_config.settings;

    let _log_guard =
        logging::setup_logging(LOG_DIR, LOG_PREFIX, settings.debug_mode, cfg!(debug_assertions))?;
    logging::install_panic_hook();

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Configuration loaded from {}", config_manager.user_config_path());

    let hdc_path = match locate_hdc(&settings) {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("{}", e);
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title(APP_NAME)
                .set_description(e.to_string())
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
            return Err(e.into());
        }
    };

    // hdc calls run on these workers; the main thread belongs to Slint
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("hdc-udid-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", WORKER_THREADS);

    let state_manager = Arc::new(StateManager::new());
    state_manager.set_hdc_path(hdc_path.clone());

    let client = Arc::new(
        HdcClient::new(hdc_path.clone())
            .with_library_dir(library_dir(&hdc_path))
            .with_timeout(settings.command_timeout()),
    );

    let gui_controller = GuiController::new(
        Arc::clone(&state_manager),
        client,
        settings,
        runtime.handle().clone(),
    )?;

    // Blocks until the window is closed
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");
    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
