// GUI Controller - Bridges Slint UI with Rust State Management
//
// This module contains the GuiController which coordinates between:
// - Slint UI (MainWindow)
// - StateManager (application state)
// - HdcClient (device bridge subprocesses)
// - EventLoopBridge (async/GUI coordination)
//
// Background tasks only ever talk to the StateManager. The subscription thread
// turns each StateChange into a queued widget update.

use crate::models::ToolSettings;
use crate::services::hdc::HdcClient;
use crate::state::{StateChange, StateManager};
use crate::ui::bridge::{EventLoopBridge, EventLoopBridgeHandle};
use crate::{APP_AUTHOR, APP_NAME, PROJECT_URL, VERSION};
use anyhow::{Context, Result};
use slint::{ComponentHandle, ModelRc, SharedString, VecModel};
use std::cell::RefCell;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

// Include the generated Slint code
slint::include_modules!();

/// Toast text shown after a successful copy
pub const TOAST_COPIED: &str = "UDID copied to clipboard";

/// GUI Controller that wires up the Slint UI with application state and hdc
///
/// # Example
/// ```ignore
/// let state_manager = Arc::new(StateManager::new());
/// let client = Arc::new(HdcClient::new(hdc_path));
/// let runtime = tokio::runtime::Runtime::new()?;
///
/// let controller = GuiController::new(
///     state_manager,
///     client,
///     settings,
///     runtime.handle().clone(),
/// )?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    /// The Slint UI window
    ui: MainWindow,

    /// Event loop bridge for coordinating between tokio and Slint
    bridge: EventLoopBridge<MainWindow>,

    /// Shared hdc client, also used for the shutdown `kill`
    client: Arc<HdcClient>,

    settings: Arc<ToolSettings>,
}

impl GuiController {
    /// Create the window, register callbacks and start mirroring state into it
    pub fn new(
        state_manager: Arc<StateManager>,
        client: Arc<HdcClient>,
        settings: ToolSettings,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;
        let bridge = EventLoopBridge::new(&ui, tokio_handle);
        let settings = Arc::new(settings);

        ui.set_app_name(APP_NAME.into());
        ui.set_app_author(APP_AUTHOR.into());
        ui.set_app_version(VERSION.into());
        ui.set_project_url(PROJECT_URL.into());

        Self::sync_ui_with_state(&ui, &state_manager);
        Self::setup_callbacks(&ui, &bridge, &state_manager, &client, &settings);
        Self::setup_state_subscription(&bridge, &state_manager);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            bridge,
            client,
            settings,
        })
    }

    /// Run the GUI (blocks until window is closed)
    ///
    /// An initial refresh is dispatched before the event loop starts. Once the
    /// window is gone the hdc server is stopped if the settings ask for it.
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        self.ui.invoke_refresh_devices();

        let result = self.ui.run();
        tracing::info!("GUI event loop finished");

        if self.settings.kill_server_on_exit {
            let output = self.bridge.clone_handle().block_on(self.client.kill_server());
            if !output.launched() {
                tracing::warn!("Failed to stop hdc server: {}", output.stderr);
            }
        }

        result
    }

    /// Push the full current state into the window
    fn sync_ui_with_state(ui: &MainWindow, state_manager: &StateManager) {
        let state = state_manager.snapshot();

        ui.set_devices(Self::device_model(&state.devices));
        ui.set_selected_index(state.selected_index());
        ui.set_device_selector_enabled(state.can_select_device());
        ui.set_udid_text(state.udid_display.clone().into());
        ui.set_status_text(state.status_message.clone().into());
        ui.set_refreshing(state.is_refreshing);
        ui.set_copy_enabled(state.can_copy());
    }

    fn device_model(devices: &[String]) -> ModelRc<SharedString> {
        let items: Vec<SharedString> = devices.iter().map(|d| SharedString::from(d.as_str())).collect();
        ModelRc::new(VecModel::from(items))
    }

    /// Set up all Slint callbacks
    fn setup_callbacks(
        ui: &MainWindow,
        bridge: &EventLoopBridge<MainWindow>,
        state_manager: &Arc<StateManager>,
        client: &Arc<HdcClient>,
        settings: &Arc<ToolSettings>,
    ) {
        // Refresh devices
        let bridge_handle = bridge.clone_handle();
        let state = Arc::clone(state_manager);
        let hdc = Arc::clone(client);
        let tool_settings = Arc::clone(settings);
        ui.on_refresh_devices(move || {
            tracing::info!("Refresh requested");
            Self::dispatch_refresh(&bridge_handle, &state, &hdc, &tool_settings);
        });

        // Device picked in the selector
        let bridge_handle = bridge.clone_handle();
        let state = Arc::clone(state_manager);
        let hdc = Arc::clone(client);
        ui.on_device_selected(move |device| {
            let device = device.to_string();
            if device.is_empty() {
                return;
            }
            if state.read(|s| s.is_refreshing) {
                tracing::debug!("Ignoring selection of {} during refresh", device);
                return;
            }

            tracing::info!("Device selected: {}", device);
            Self::dispatch_udid_fetch(&bridge_handle, &state, &hdc, device);
        });

        // Copy UDID
        let state = Arc::clone(state_manager);
        let ui_weak = ui.as_weak();
        let clipboard: RefCell<Option<arboard::Clipboard>> = RefCell::new(None);
        ui.on_copy_udid(move || {
            let Some(udid) = state.copyable_udid() else {
                tracing::debug!("Copy requested with nothing copyable");
                return;
            };

            let mut slot = clipboard.borrow_mut();
            match Self::copy_to_clipboard(&mut slot, &udid) {
                Ok(()) => {
                    tracing::info!("Copied UDID to clipboard");
                    if let Some(ui) = ui_weak.upgrade() {
                        ui.set_toast_text(TOAST_COPIED.into());
                        ui.set_show_toast(true);
                    }
                }
                Err(e) => {
                    tracing::error!("Clipboard write failed: {:#}", e);
                    state.set_status(format!("Error: could not copy to clipboard ({})", e));
                }
            }
        });

        // Exit
        let ui_weak = ui.as_weak();
        ui.on_exit_app(move || {
            tracing::info!("Exit requested");
            if let Some(ui) = ui_weak.upgrade() {
                if let Err(e) = ui.hide() {
                    tracing::error!("Failed to close window: {}", e);
                }
            }
        });

        // About dialog
        let state = Arc::clone(state_manager);
        let ui_weak = ui.as_weak();
        ui.on_show_about(move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_hdc_path(state.read(|s| s.hdc_path_label()).into());
                ui.set_show_about_dialog(true);
            }
        });

        let ui_weak = ui.as_weak();
        ui.on_about_dismissed(move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_about_dialog(false);
            }
        });

        ui.on_open_project_page(|| {
            if let Err(e) = open::that(PROJECT_URL) {
                tracing::warn!("Failed to open {}: {}", PROJECT_URL, e);
            }
        });
    }

    /// Start a device refresh unless one is already running.
    ///
    /// When the listing comes back non-empty, the UDID of the resulting selection
    /// is fetched right away.
    fn dispatch_refresh(
        bridge: &EventLoopBridgeHandle<MainWindow>,
        state_manager: &Arc<StateManager>,
        client: &Arc<HdcClient>,
        settings: &Arc<ToolSettings>,
    ) {
        if state_manager.read(|s| s.is_refreshing) {
            tracing::debug!("Refresh already in progress");
            return;
        }

        let generation = state_manager.begin_refresh();

        let bridge_clone = bridge.clone();
        let state = Arc::clone(state_manager);
        let client = Arc::clone(client);
        let settings = Arc::clone(settings);

        bridge.spawn_async(move || async move {
            if settings.start_server_on_refresh {
                let output = client.start_server().await;
                if !output.launched() {
                    tracing::warn!("hdc start failed: {}", output.stderr);
                }
                tokio::time::sleep(settings.server_settle_delay()).await;
            }

            let listing = client.list_targets().await;
            if let Some(device) = state.finish_refresh(generation, listing) {
                Self::dispatch_udid_fetch(&bridge_clone, &state, &client, device);
            }
        });
    }

    /// Select `device` and query its UDID in the background
    fn dispatch_udid_fetch(
        bridge: &EventLoopBridgeHandle<MainWindow>,
        state_manager: &Arc<StateManager>,
        client: &Arc<HdcClient>,
        device: String,
    ) {
        let generation = state_manager.begin_udid_fetch(device.clone());

        let state = Arc::clone(state_manager);
        let client = Arc::clone(client);

        bridge.spawn_async(move || async move {
            let outcome = client.query_udid(&device).await;
            tracing::info!("UDID query for {} finished: {:?}", device, outcome);
            state.finish_udid_fetch(generation, &device, outcome);
        });
    }

    /// Write `text` to the system clipboard.
    ///
    /// The clipboard handle is kept alive between copies; on X11 the contents are
    /// served by that handle and vanish with it.
    fn copy_to_clipboard(slot: &mut Option<arboard::Clipboard>, text: &str) -> Result<()> {
        if slot.is_none() {
            *slot = Some(arboard::Clipboard::new().context("Failed to open clipboard")?);
        }
        if let Some(clipboard) = slot.as_mut() {
            clipboard
                .set_text(text.to_string())
                .context("Failed to write clipboard")?;
        }
        Ok(())
    }

    /// Mirror state change events into the window
    ///
    /// Runs on its own thread; every widget write is queued through the bridge so
    /// it happens on the event loop thread.
    fn setup_state_subscription(
        bridge: &EventLoopBridge<MainWindow>,
        state_manager: &Arc<StateManager>,
    ) {
        let bridge_handle = bridge.clone_handle();
        let state_manager_clone = Arc::clone(state_manager);
        let mut rx = state_manager.subscribe();

        let spawned = std::thread::Builder::new()
            .name("state-subscription".to_string())
            .spawn(move || {
                tracing::debug!("State subscription thread started");

                loop {
                    match rx.blocking_recv() {
                        Ok(change) => {
                            tracing::trace!("State change received: {:?}", change);
                            Self::apply_change(&bridge_handle, &state_manager_clone, change);
                        }
                        Err(RecvError::Closed) => {
                            tracing::info!(
                                "State broadcast channel closed - shutting down subscription thread"
                            );
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                "State subscription lagged - {} events skipped, resyncing",
                                skipped
                            );
                            let state = state_manager_clone.clone();
                            bridge_handle.update_ui(move |ui| Self::sync_ui_with_state(ui, &state));
                        }
                    }
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to start state subscription thread: {}", e);
        }
    }

    fn apply_change(
        bridge: &EventLoopBridgeHandle<MainWindow>,
        state_manager: &Arc<StateManager>,
        change: StateChange,
    ) {
        // A dropped write could leave any widget stale, so repaint everything first
        if bridge.take_missed_updates() {
            tracing::debug!("Resyncing window after dropped UI updates");
            let state = Arc::clone(state_manager);
            bridge.update_ui(move |ui| Self::sync_ui_with_state(ui, &state));
        }

        match change {
            StateChange::RefreshStarted { generation } => {
                tracing::debug!("Refresh {} started", generation);
                bridge.update_ui(|ui| {
                    ui.set_refreshing(true);
                    ui.set_device_selector_enabled(false);
                });
            }
            StateChange::RefreshFinished { device_count } => {
                tracing::debug!("Refresh finished with {} device(s)", device_count);
                let selectable = state_manager.read(|s| s.can_select_device());
                bridge.update_ui(move |ui| {
                    ui.set_refreshing(false);
                    ui.set_device_selector_enabled(selectable);
                });
            }
            StateChange::DevicesChanged { devices } => {
                let selected = state_manager.read(|s| s.selected_index());
                bridge.update_ui(move |ui| {
                    ui.set_devices(Self::device_model(&devices));
                    ui.set_selected_index(selected);
                });
            }
            StateChange::SelectionChanged { device } => {
                tracing::debug!("Selection changed: {:?}", device);
                let selected = state_manager.read(|s| s.selected_index());
                bridge.update_ui(move |ui| ui.set_selected_index(selected));
            }
            StateChange::UdidChanged { display, copyable } => {
                bridge.update_ui(move |ui| {
                    ui.set_udid_text(display.into());
                    ui.set_copy_enabled(copyable);
                });
            }
            StateChange::StatusChanged { message } => {
                bridge.update_ui(move |ui| ui.set_status_text(message.into()));
            }
            StateChange::UdidFetchStarted { device } => {
                tracing::debug!("UDID fetch started for {}", device);
            }
            StateChange::UdidFetchFinished { device, success } => {
                tracing::debug!("UDID fetch for {} finished (success: {})", device, success);
            }
            StateChange::StaleResultDiscarded { task, generation } => {
                tracing::debug!("Stale {:?} result dropped (generation {})", task, generation);
            }
        }
    }
}
