//! Channel layer: prompt-driven reads over an interactive PTY.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::PtyChannel;
