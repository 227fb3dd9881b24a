// State management module
//
// StateManager wraps AppState with thread-safe access using Arc<RwLock<T>> and
// emits change events for GUI updates. Background tasks never touch the window;
// they hand their results to the transition functions below, which reject
// anything tagged with an outdated generation.

use crate::models::AppState;
use crate::models::app_state::{
    DISPLAY_FETCHING, DISPLAY_NO_DEVICE, DISPLAY_REFRESHING, STATUS_REFRESHING,
};
use crate::services::devices::DeviceListing;
use crate::services::udid::UdidOutcome;
use camino::Utf8PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Kind of background task a generation belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Refresh,
    UdidFetch,
}

/// Change events emitted when state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A device refresh was dispatched
    RefreshStarted { generation: u64 },

    /// A device refresh result was applied
    RefreshFinished { device_count: usize },

    /// A UDID query was dispatched
    UdidFetchStarted { device: String },

    /// A UDID query result was applied
    UdidFetchFinished { device: String, success: bool },

    /// The device list was replaced
    DevicesChanged { devices: Vec<String> },

    /// The selected device changed
    SelectionChanged { device: Option<String> },

    /// The identifier display or its copy eligibility changed
    UdidChanged { display: String, copyable: bool },

    /// The status line changed
    StatusChanged { message: String },

    /// A background result arrived after it had been superseded
    StaleResultDiscarded { task: TaskKind, generation: u64 },
}

/// Thread-safe state manager with event emission
///
/// This is the only mutator of [`AppState`]:
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for reads
/// - transition functions (`begin_*` / `finish_*`) for mutations
/// - [`subscribe()`](Self::subscribe) for listening to changes
///
/// Each `begin_*` call returns a generation number that the dispatched task must
/// hand back to the matching `finish_*` call. Results from superseded tasks are
/// dropped and reported as [`StateChange::StaleResultDiscarded`].
pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100-event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Get a cloned snapshot of the current state
    pub fn snapshot(&self) -> AppState {
        self.read_guard().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let can_copy = state_manager.read(|state| state.can_copy());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.read_guard();
        f(&state)
    }

    /// Apply `update_fn`, detect what changed and broadcast the events.
    ///
    /// Kept crate-private so every outside mutation goes through a named transition.
    pub(crate) fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let changes = {
            let mut state = self.write_guard();
            let old_state = state.clone();
            update_fn(&mut state);
            Self::detect_changes(&old_state, &state)
        };

        for change in &changes {
            self.emit(change.clone());
        }

        changes
    }

    fn emit(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.state_tx.send(change);
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.is_refreshing != new.is_refreshing {
            if new.is_refreshing {
                changes.push(StateChange::RefreshStarted {
                    generation: new.refresh_generation,
                });
            } else {
                changes.push(StateChange::RefreshFinished {
                    device_count: new.devices.len(),
                });
            }
        }

        if old.is_fetching_udid != new.is_fetching_udid
            || (new.is_fetching_udid && old.udid_generation != new.udid_generation)
        {
            let device = new.selected_device.clone().unwrap_or_default();
            if new.is_fetching_udid {
                changes.push(StateChange::UdidFetchStarted { device });
            } else if new.udid_outcome.is_some() {
                changes.push(StateChange::UdidFetchFinished {
                    device,
                    success: new.udid_outcome.as_ref().is_some_and(UdidOutcome::is_success),
                });
            }
        }

        if old.devices != new.devices {
            changes.push(StateChange::DevicesChanged {
                devices: new.devices.clone(),
            });
        }

        if old.selected_device != new.selected_device {
            changes.push(StateChange::SelectionChanged {
                device: new.selected_device.clone(),
            });
        }

        if old.udid_display != new.udid_display || old.can_copy() != new.can_copy() {
            changes.push(StateChange::UdidChanged {
                display: new.udid_display.clone(),
                copyable: new.can_copy(),
            });
        }

        if old.status_message != new.status_message {
            changes.push(StateChange::StatusChanged {
                message: new.status_message.clone(),
            });
        }

        changes
    }

    // ===== Transitions =====

    /// Record the resolved bridge binary
    pub fn set_hdc_path(&self, path: Utf8PathBuf) -> Vec<StateChange> {
        self.update(|state| {
            state.hdc_path = Some(path);
        })
    }

    /// Replace the status line
    pub fn set_status(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| {
            state.status_message = message;
        })
    }

    /// Mark a device refresh as dispatched and return its generation.
    ///
    /// Any UDID query still in flight is superseded.
    pub fn begin_refresh(&self) -> u64 {
        let mut generation = 0;
        self.update(|state| {
            state.refresh_generation += 1;
            state.udid_generation += 1;
            generation = state.refresh_generation;

            state.is_refreshing = true;
            state.is_fetching_udid = false;
            state.udid_outcome = None;
            state.udid_display = DISPLAY_REFRESHING.to_string();
            state.status_message = STATUS_REFRESHING.to_string();
        });
        tracing::debug!("Refresh generation {} dispatched", generation);
        generation
    }

    /// Apply a device listing from refresh `generation`.
    ///
    /// Keeps the current selection when it is still attached, otherwise selects the
    /// first device. Returns the device whose UDID should be fetched next, or `None`
    /// when the list is empty or the result was stale.
    pub fn finish_refresh(&self, generation: u64, listing: DeviceListing) -> Option<String> {
        if self.read(|s| s.refresh_generation) != generation {
            self.discard_stale(TaskKind::Refresh, generation);
            return None;
        }

        let mut next = None;
        self.update(|state| {
            // Re-check under the write lock
            if state.refresh_generation != generation {
                return;
            }

            state.is_refreshing = false;
            state.status_message = listing.status_message();

            if listing.is_empty() {
                state.selected_device = None;
                state.udid_outcome = None;
                state.udid_display = DISPLAY_NO_DEVICE.to_string();
            } else {
                let keep = state
                    .selected_device
                    .as_ref()
                    .is_some_and(|current| listing.devices.contains(current));
                if !keep {
                    state.selected_device = listing.devices.first().cloned();
                }
                next = state.selected_device.clone();
            }

            state.devices = listing.devices;
        });
        next
    }

    /// Select `device`, mark its UDID query as dispatched and return the generation
    pub fn begin_udid_fetch(&self, device: impl Into<String>) -> u64 {
        let device = device.into();
        let mut generation = 0;
        self.update(|state| {
            state.udid_generation += 1;
            generation = state.udid_generation;

            state.status_message = format!("Fetching UDID for {}...", device);
            state.selected_device = Some(device);
            state.is_fetching_udid = true;
            state.udid_outcome = None;
            state.udid_display = DISPLAY_FETCHING.to_string();
        });
        tracing::debug!("UDID generation {} dispatched", generation);
        generation
    }

    /// Apply a classified UDID result from query `generation`.
    ///
    /// Returns false (and emits [`StateChange::StaleResultDiscarded`]) when a newer
    /// query or refresh has been dispatched since, or `device` is no longer selected.
    pub fn finish_udid_fetch(&self, generation: u64, device: &str, outcome: UdidOutcome) -> bool {
        let mut applied = false;
        self.update(|state| {
            if state.udid_generation != generation
                || state.selected_device.as_deref() != Some(device)
            {
                return;
            }

            state.is_fetching_udid = false;
            state.udid_display = outcome.display_text().to_string();
            state.status_message = outcome.status_message();
            state.udid_outcome = Some(outcome);
            applied = true;
        });

        if !applied {
            self.discard_stale(TaskKind::UdidFetch, generation);
        }
        applied
    }

    fn discard_stale(&self, task: TaskKind, generation: u64) {
        tracing::debug!("Discarding stale {:?} result (generation {})", task, generation);
        self.emit(StateChange::StaleResultDiscarded { task, generation });
    }

    /// Value to place on the clipboard, if the current outcome allows copying
    pub fn copyable_udid(&self) -> Option<String> {
        self.read(|s| s.copyable_udid().map(str::to_string))
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
