//! Classification rules shared by the extractors.

use std::fmt;

/// Site codes recognized in interface descriptions, in priority order.
pub const SITE_CODES: &[&str] = &["HQ", "CA4", "CA5", "RMD", "BNS", "MNS", "ALX", "MKT", "TNT"];

/// Interface-name prefixes and the rate class they imply.
const RATE_PREFIXES: &[(&str, LinkRate)] = &[("Hu", LinkRate::Hundred), ("Te", LinkRate::Ten)];

/// Up/down state of an adjacency or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Up,
    Down,
}

impl Status {
    /// Status of an adjacency-change log line.
    ///
    /// Only the text after the last comma is inspected; a line without a comma
    /// is inspected whole.
    pub fn from_log_line(line: &str) -> Self {
        let tail = line.rsplit(',').next().unwrap_or(line);
        if tail.contains("Down") {
            Status::Down
        } else {
            Status::Up
        }
    }

    /// Status of an interface-description row: up only if both the
    /// administrative and protocol columns read exactly `up`.
    pub fn from_states(admin: &str, protocol: &str) -> Self {
        if admin == "up" && protocol == "up" {
            Status::Up
        } else {
            Status::Down
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => f.write_str("Up"),
            Status::Down => f.write_str("Down"),
        }
    }
}

/// Nominal link speed class, inferred from the interface naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRate {
    Hundred,
    Ten,
    Unknown,
}

impl LinkRate {
    /// Classify an interface name (`HundredGigE0/0/0/1`, `Te0/1/0/3`, ...).
    pub fn from_interface(interface: &str) -> Self {
        RATE_PREFIXES
            .iter()
            .find(|(prefix, _)| interface.starts_with(prefix))
            .map(|(_, rate)| *rate)
            .unwrap_or(LinkRate::Unknown)
    }
}

impl fmt::Display for LinkRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRate::Hundred => f.write_str("100G"),
            LinkRate::Ten => f.write_str("10G"),
            LinkRate::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Infer the far-end site from an interface description.
///
/// Only the part before the first backslash is considered. The first known
/// site code contained in it wins; if none is, that part is returned as-is.
pub fn infer_peer(description: &str) -> &str {
    let candidate = description.split('\\').next().unwrap_or(description);
    SITE_CODES
        .iter()
        .find(|code| candidate.contains(*code))
        .copied()
        .unwrap_or(candidate)
}
