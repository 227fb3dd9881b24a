// UI module - window controller and event loop bridge
//
// - EventLoopBridge: hands work between tokio tasks and the Slint event loop
// - GuiController: wires the window to the state manager and the hdc client

pub mod bridge;
pub mod controller;

pub use bridge::{EventLoopBridge, EventLoopBridgeHandle};
pub use controller::GuiController;
