//! Reduction of raw device output into records.
//!
//! Both extractors are pure functions of their input text: no I/O, no shared
//! state. Unusable lines and rows are skipped; only inconsistencies that make
//! a node's whole result untrustworthy are returned as errors.

pub mod classify;
mod flap;
mod link;

pub use classify::{LinkRate, SITE_CODES, Status};
pub use flap::{ADJCHANGE_MARKER, FlapEvent, LogTimestamp, extract_flaps};
pub use link::{LinkRecord, extract_links};
