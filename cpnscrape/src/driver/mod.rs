//! Session layer used by the collector: open, run show commands, close.

mod builder;
mod generic;
mod response;

pub use builder::DriverBuilder;
pub use generic::GenericDriver;
pub use response::Response;

use std::future::Future;

use crate::error::Result;

/// A command session on one device.
///
/// Implemented by [`GenericDriver`] over SSH. The collector only depends on
/// this trait, so it can be driven without a network.
pub trait Driver: Send {
    /// Connect, authenticate and wait for the first prompt.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Tear the session down. Safe to call on a driver that never opened.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Run `command` and collect its output up to the next prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    fn is_open(&self) -> bool;
}
