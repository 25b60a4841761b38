//! # cpnscrape
//!
//! Polls IOS-XR routers over SSH and reduces what they print into tables.
//!
//! Two reports are produced from a fixed inventory of nodes:
//!
//! - **Flaps**: IS-IS `ADJCHANGE` log lines within a time window, aggregated
//!   per node and interface into first/last transition, flap count and
//!   final state.
//! - **Links**: `show int des | i LR` rows, one record per interface that
//!   carries an `LR-<number>` circuit id, with the far-end site and rate.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with prompt-driven reads over a PTY
//! - Pure extractors that can be fed saved output without a device
//! - TOML inventory with shared defaults
//! - CSV and JSON export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cpnscrape::{Collector, Inventory, LogWindow, SshConnector};
//! use cpnscrape::transport::AuthMethod;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cpnscrape::Error> {
//!     let inventory = Inventory::load("inventory.toml")?;
//!     let connector = SshConnector::new(
//!         inventory.defaults.clone(),
//!         "noc",
//!         AuthMethod::Password("secret".to_string().into()),
//!     );
//!
//!     let window = LogWindow::for_day("2024-01-05", None, None)?;
//!     let flaps = Collector::new(connector, &inventory)
//!         .collect_flaps(&window)
//!         .await;
//!
//!     for event in &flaps.records {
//!         println!("{} {} {} flaps", event.node, event.interface, event.flaps());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The extractors work on plain text:
//!
//! ```rust
//! let raw = "Hu0/0/0/1  up  up  HQ\\LR-1234\n";
//! let links = cpnscrape::extract_links("CA4-01", raw);
//! assert_eq!(links[0].peer, "HQ");
//! assert_eq!(links[0].circuit_id, 1234);
//! ```

pub mod channel;
pub mod collector;
pub mod driver;
pub mod error;
pub mod export;
pub mod inventory;
pub mod parse;
pub mod platform;
pub mod transport;

// Re-export main types for convenience
pub use collector::{Collection, Collector, LogWindow, NodeFailure, SshConnector};
pub use driver::{Driver, DriverBuilder, GenericDriver, Response};
pub use error::{Error, Result};
pub use export::{Format, Tabular};
pub use inventory::{Inventory, Node};
pub use parse::{FlapEvent, LinkRate, LinkRecord, Status, extract_flaps, extract_links};
pub use platform::PlatformDefinition;
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
