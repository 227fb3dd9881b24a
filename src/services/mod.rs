//! Services module - hdc invocation and interpretation of its output.
//!
//! Nothing here depends on the UI layer. Each service is a plain function or a
//! small client that can be exercised directly from tests.
//!
//! # Components
//!
//! - [`HdcClient`]: launches the `hdc` executable and captures its output. Handles:
//!   - making a freshly unpacked binary executable (Unix)
//!   - the bundled shared-library path (macOS) and hidden console window (Windows)
//!   - an optional per-command timeout
//!   - turning launch failures into an "absent output" [`CommandOutput`]
//!
//! - [`parse_device_list`]: splits `hdc list targets` output into a [`DeviceListing`].
//!
//! - [`classify_udid`]: maps the output of `bm get -u` to a [`UdidOutcome`].
//!
//! - [`locate_hdc`]: finds the bridge executable next to the application.
//!
//! # Usage Example
//!
//! ```ignore
//! use hdc_udid::services::{HdcClient, locate_hdc};
//!
//! let client = HdcClient::new(locate_hdc(&settings)?);
//! let listing = client.list_targets().await;
//! for device in &listing.devices {
//!     let outcome = client.query_udid(device).await;
//!     println!("{}: {}", device, outcome.display_text());
//! }
//! ```

pub mod devices;
pub mod hdc;
pub mod resources;
pub mod udid;

pub use devices::{DeviceListing, parse_device_list};
pub use hdc::{CommandOutput, HdcClient, HdcError};
pub use resources::{ResourceError, library_dir, locate_hdc};
pub use udid::{UdidFailure, UdidOutcome, classify_udid};
