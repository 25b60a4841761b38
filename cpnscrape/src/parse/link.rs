//! LR circuit extraction from `show interfaces description` output.
//!
//! ```text
//! RP/0/RSP0/CPU0:CA4-01#show int des | i LR
//! Hu0/0/0/1          up          up          TO-HQ-SITE\A\LR-1234
//! Te0/1/0/3          admin-down  admin-down  CA5-BACKUP\LR-88
//! ```
//!
//! The row pattern is applied to the whole text and whitespace between
//! columns may include line breaks, so the input is expected to be
//! filtered down to LR rows by the device, as the `| i LR` above does.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::classify::{LinkRate, Status, infer_peer};

static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^(?P<interface>\S+)\s+(?P<state1>\S+)\s+(?P<state2>\S+)\s+(?P<desc>.+LR-(?P<lrnum>\d+))",
    )
    .expect("valid interface description regex")
});

/// One interface's circuit as described on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Node the table was collected from.
    pub node: String,

    /// Far-end site code, or the raw description head when unrecognized.
    pub peer: String,

    pub interface: String,

    pub rate: LinkRate,

    /// Number following `LR-` in the description.
    pub circuit_id: u64,

    pub status: Status,
}

/// Turn a node's interface description table into link records.
///
/// Only rows whose description ends in `LR-<digits>` produce a record.
/// Records come out in table order and duplicates are kept.
pub fn extract_links(node: &str, raw: &str) -> Vec<LinkRecord> {
    ROW.captures_iter(raw)
        .filter_map(|caps| {
            let interface = &caps["interface"];
            let lrnum = &caps["lrnum"];

            let circuit_id = match lrnum.parse::<u64>() {
                Ok(id) => id,
                Err(e) => {
                    debug!("{}: skipping {} with LR-{}: {}", node, interface, lrnum, e);
                    return None;
                }
            };

            Some(LinkRecord {
                node: node.to_string(),
                peer: infer_peer(&caps["desc"]).to_string(),
                interface: interface.to_string(),
                rate: LinkRate::from_interface(interface),
                circuit_id,
                status: Status::from_states(&caps["state1"], &caps["state2"]),
            })
        })
        .collect()
}
