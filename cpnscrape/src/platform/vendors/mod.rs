//! Built-in vendor platform definitions.

pub mod cisco_iosxr;
pub mod linux;
