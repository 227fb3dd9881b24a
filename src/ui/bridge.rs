// EventLoopBridge - hands work between the Slint event loop and the tokio runtime
//
// The Slint window lives on the main thread and is the only place widgets may be
// touched. hdc calls run as tokio tasks. The bridge:
// - spawns those tasks from Slint callbacks
// - queues widget updates from any thread back onto the event loop

use slint::ComponentHandle;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

type UiUpdate<T> = Box<dyn FnOnce(&T) + Send>;

/// Bounded so a stalled event loop cannot grow the queue without limit
const UI_UPDATE_CAPACITY: usize = 100;

/// Coordinates between the tokio runtime and the Slint event loop
///
/// # Example
/// ```ignore
/// let bridge = EventLoopBridge::new(&ui, runtime.handle().clone());
/// let handle = bridge.clone_handle();
///
/// ui.on_refresh_devices(move || {
///     let updates = handle.clone();
///     handle.spawn_async(move || async move {
///         let listing = client.list_targets().await;
///         updates.update_ui(move |ui| ui.set_status_text(listing.status_message().into()));
///     });
/// });
/// ```
pub struct EventLoopBridge<T: ComponentHandle> {
    handle: EventLoopBridgeHandle<T>,
}

impl<T: ComponentHandle + 'static> EventLoopBridge<T> {
    /// Create the bridge and start the forwarding thread.
    ///
    /// The thread drains queued updates and posts each one with
    /// `upgrade_in_event_loop`; it exits once every handle is dropped or the
    /// event loop has quit.
    pub fn new(ui: &T, tokio_handle: tokio::runtime::Handle) -> Self {
        let forward_weak = ui.as_weak();
        let (handle, mut ui_update_rx) =
            EventLoopBridgeHandle::with_queue(tokio_handle, UI_UPDATE_CAPACITY);

        std::thread::Builder::new()
            .name("ui-bridge".to_string())
            .spawn(move || {
                tracing::debug!("UI bridge thread started");

                while let Some(update_fn) = ui_update_rx.blocking_recv() {
                    let result = forward_weak.upgrade_in_event_loop(move |ui| {
                        update_fn(&ui);
                    });

                    if let Err(e) = result {
                        tracing::warn!("Failed to queue UI update to event loop: {:?}", e);
                        break;
                    }
                }

                tracing::debug!("UI bridge thread terminated");
            })
            .map_err(|e| tracing::error!("Failed to start UI bridge thread: {}", e))
            .ok();

        Self { handle }
    }

    /// Cloneable handle for capturing in Slint callbacks and tokio tasks
    pub fn clone_handle(&self) -> EventLoopBridgeHandle<T> {
        self.handle.clone()
    }
}

/// Lightweight cloneable handle onto an [`EventLoopBridge`]
pub struct EventLoopBridgeHandle<T: ComponentHandle> {
    tokio_handle: tokio::runtime::Handle,
    ui_update_tx: mpsc::Sender<UiUpdate<T>>,

    /// Set when an update was dropped on a full queue
    missed_updates: Arc<AtomicBool>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for EventLoopBridgeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tokio_handle: self.tokio_handle.clone(),
            ui_update_tx: self.ui_update_tx.clone(),
            missed_updates: Arc::clone(&self.missed_updates),
        }
    }
}

impl<T: ComponentHandle + 'static> EventLoopBridgeHandle<T> {
    fn with_queue(
        tokio_handle: tokio::runtime::Handle,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<UiUpdate<T>>) {
        let (ui_update_tx, ui_update_rx) = mpsc::channel(capacity);
        let handle = Self {
            tokio_handle,
            ui_update_tx,
            missed_updates: Arc::new(AtomicBool::new(false)),
        };
        (handle, ui_update_rx)
    }

    /// Queue a widget update to run on the event loop thread.
    ///
    /// A full queue drops the update and flags the handle; see
    /// [`take_missed_updates`](Self::take_missed_updates).
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        match self.ui_update_tx.try_send(Box::new(update)) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("UI update channel full - dropping update, resync pending");
                self.missed_updates.store(true, Ordering::Release);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Failed to send UI update - bridge thread has stopped");
            }
        }
    }

    /// Returns true (once) if an update was dropped since the last call.
    ///
    /// The caller should follow up with a full resync of the window.
    pub fn take_missed_updates(&self) -> bool {
        self.missed_updates.swap(false, Ordering::AcqRel)
    }

    /// Spawn a detached task on the tokio runtime
    pub fn spawn_async<F, Fut>(&self, future_factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tokio_handle.spawn(async move {
            future_factory().await;
        });
    }

    /// Run a future to completion on the runtime, blocking the calling thread.
    ///
    /// Only for short shutdown work such as `hdc kill`; never call it from a
    /// tokio worker.
    pub fn block_on<Fut>(&self, future: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        self.tokio_handle.block_on(future)
    }
}
