//! Adjacency flap extraction from `show logging` output.
//!
//! Every `ADJCHANGE` line is one state transition of an IS-IS adjacency.
//! Transitions are folded per (node, interface) into a [`FlapEvent`] that
//! remembers the first and last transition, how many there were, and the
//! most recent state.
//!
//! ```text
//! RP/0/RSP0/CPU0:Jan 5 10:00:00.101 UTC: isis[1011]: %ROUTING-ISIS-5-ADJCHANGE : Adjacency to HQ-01 (Hu0/0/0/1) (L2),Down
//! RP/0/RSP0/CPU0:Jan 5 10:00:05.433 UTC: isis[1011]: %ROUTING-ISIS-5-ADJCHANGE : Adjacency to HQ-01 (Hu0/0/0/1) (L2),Up
//! ```

use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use indexmap::IndexMap;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use super::classify::Status;
use crate::error::{ParseError, Result};

/// Substring that marks an adjacency-change log line.
pub const ADJCHANGE_MARKER: &str = "ADJCHANGE";

/// `Mon D HH:MM:SS`, the syslog timestamp without a year.
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w{3} \d{1,2} \d{2}:\d{2}:\d{2})").expect("valid timestamp regex")
});

/// First parenthesized group on the line holds the interface.
static INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((.*?)\)").expect("valid interface regex"));

const RESOLVED_FORMAT: &str = "%Y %b %d %H:%M:%S";

/// A syslog timestamp as printed by the device, without a year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogTimestamp(String);

impl LogTimestamp {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The timestamp exactly as it appeared in the log.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Place the timestamp in `year`.
    ///
    /// Returns `None` when the month name is unknown, the day does not
    /// exist in that year (`Feb 29` outside a leap year), or the seconds
    /// field is a leap second (`:60`).
    pub fn resolve(&self, year: i32) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&format!("{year} {}", self.0), RESOLVED_FORMAT)
            .ok()
            // chrono keeps a leap second as nanoseconds past one billion
            .filter(|dt| dt.nanosecond() < 1_000_000_000)
    }
}

impl fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All transitions of one interface on one node within the queried window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlapEvent {
    /// Node the log was collected from.
    pub node: String,

    /// Interface named in the adjacency change.
    pub interface: String,

    /// Timestamp of the first transition.
    pub first_seen: LogTimestamp,

    /// Timestamp of the last transition.
    pub last_seen: LogTimestamp,

    /// Number of transitions observed, at least one.
    pub transitions: u32,

    /// State reported by the last transition.
    pub status: Status,
}

impl FlapEvent {
    /// Number of flaps: each pair of transitions is one flap, and a trailing
    /// unpaired transition counts as a whole one.
    pub fn flaps(&self) -> u32 {
        self.transitions.div_ceil(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FlapKey<'a> {
    node: &'a str,
    interface: &'a str,
}

#[derive(Debug)]
struct Accumulator<'a> {
    first_seen: &'a str,
    last_seen: &'a str,
    transitions: u32,
    status: Status,
}

/// A single adjacency-change line reduced to what the aggregation needs.
#[derive(Debug, PartialEq, Eq)]
struct Transition<'a> {
    timestamp: &'a str,
    interface: &'a str,
    status: Status,
}

impl<'a> Transition<'a> {
    /// Parse a log line, or `None` if it is not a usable adjacency change.
    fn parse(line: &'a str) -> Option<Self> {
        if !line.contains(ADJCHANGE_MARKER) {
            return None;
        }

        let Some(timestamp) = TIMESTAMP.captures(line).and_then(|c| c.get(1)) else {
            debug!("skipping ADJCHANGE line without timestamp: {:?}", line);
            return None;
        };

        let Some(interface) = INTERFACE.captures(line).and_then(|c| c.get(1)) else {
            debug!("skipping ADJCHANGE line without interface: {:?}", line);
            return None;
        };

        Some(Self {
            timestamp: timestamp.as_str(),
            interface: interface.as_str().trim(),
            status: Status::from_log_line(line),
        })
    }
}

/// Fold a node's adjacency-change log into per-interface flap events.
///
/// Events are ordered by their first transition, placed in
/// `reference_year`. Lines without the marker, a timestamp or an interface
/// are skipped. A timestamp that does not exist in `reference_year` fails
/// the whole call with [`ParseError::Timestamp`].
pub fn extract_flaps(node: &str, raw: &str, reference_year: i32) -> Result<Vec<FlapEvent>> {
    let mut entries: IndexMap<FlapKey<'_>, Accumulator<'_>> = IndexMap::new();

    for transition in raw.lines().filter_map(Transition::parse) {
        let key = FlapKey {
            node,
            interface: transition.interface,
        };

        entries
            .entry(key)
            .and_modify(|acc| {
                acc.last_seen = transition.timestamp;
                acc.transitions += 1;
                acc.status = transition.status;
            })
            .or_insert(Accumulator {
                first_seen: transition.timestamp,
                last_seen: transition.timestamp,
                transitions: 1,
                status: transition.status,
            });
    }

    trace!("{}: {} interfaces with adjacency changes", node, entries.len());

    let mut events = Vec::with_capacity(entries.len());
    for (key, acc) in entries {
        let first_seen = LogTimestamp::new(acc.first_seen);
        let started = first_seen
            .resolve(reference_year)
            .ok_or_else(|| ParseError::Timestamp {
                node: key.node.to_string(),
                timestamp: acc.first_seen.to_string(),
                year: reference_year,
            })?;

        events.push((
            started,
            FlapEvent {
                node: key.node.to_string(),
                interface: key.interface.to_string(),
                first_seen,
                last_seen: LogTimestamp::new(acc.last_seen),
                transitions: acc.transitions,
                status: acc.status,
            },
        ));
    }

    // Stable, so interfaces that started flapping in the same second keep log order.
    events.sort_by_key(|(started, _)| *started);

    Ok(events.into_iter().map(|(_, event)| event).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const NODE: &str = "CA4-01";

    fn adj(ts: &str, intf: &str, state: &str) -> String {
        format!(
            "RP/0/RSP0/CPU0:{ts}.101 UTC: isis[1011]: %ROUTING-ISIS-5-ADJCHANGE : Adjacency to HQ-01 ({intf}) (L2),{state}"
        )
    }

    #[test]
    fn test_down_then_up_is_one_flap() {
        let log = [
            adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down"),
            adj("Jan 5 10:00:05", "Hu0/0/0/1", "Up"),
        ]
        .join("\n");

        let events = extract_flaps(NODE, &log, 2024).unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.node, "CA4-01");
        assert_eq!(event.interface, "Hu0/0/0/1");
        assert_eq!(event.first_seen.as_str(), "Jan 5 10:00:00");
        assert_eq!(event.last_seen.as_str(), "Jan 5 10:00:05");
        assert_eq!(event.transitions, 2);
        assert_eq!(event.flaps(), 1);
        assert_eq!(event.status, Status::Up);
    }

    #[test]
    fn test_single_transition() {
        let log = adj("Mar 12 08:15:42", "Te0/1/0/3", "Down");
        let events = extract_flaps(NODE, &log, 2024).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].first_seen, events[0].last_seen);
        assert_eq!(events[0].transitions, 1);
        assert_eq!(events[0].flaps(), 1);
        assert_eq!(events[0].status, Status::Down);
    }

    #[test]
    fn test_odd_transitions_round_up() {
        let log = [
            adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down"),
            adj("Jan 5 10:00:05", "Hu0/0/0/1", "Up"),
            adj("Jan 5 10:01:00", "Hu0/0/0/1", "Down"),
        ]
        .join("\n");

        let events = extract_flaps(NODE, &log, 2024).unwrap();
        assert_eq!(events[0].transitions, 3);
        assert_eq!(events[0].flaps(), 2);
        assert_eq!(events[0].status, Status::Down);
        assert_eq!(events[0].last_seen.as_str(), "Jan 5 10:01:00");
    }

    #[test]
    fn test_flaps_is_ceil_half() {
        for transitions in 1..=9u32 {
            let event = FlapEvent {
                node: NODE.into(),
                interface: "Hu0/0/0/1".into(),
                first_seen: LogTimestamp::new("Jan 5 10:00:00"),
                last_seen: LogTimestamp::new("Jan 5 10:00:00"),
                transitions,
                status: Status::Up,
            };
            assert_eq!(event.flaps(), (transitions + 1) / 2);
        }
    }

    #[test]
    fn test_skips_unusable_lines() {
        let log = [
            // No marker
            "RP/0/RSP0/CPU0:Jan 5 09:00:00.000 UTC: isis[1011]: %ROUTING-ISIS-4-SNPTOOBIG (Hu0/0/0/9),Down"
                .to_string(),
            // No timestamp
            "isis[1011]: %ROUTING-ISIS-5-ADJCHANGE : Adjacency to HQ-01 (Hu0/0/0/8) (L2),Down"
                .to_string(),
            // No parenthesized interface
            "RP/0/RSP0/CPU0:Jan 5 09:30:00.000 UTC: isis[1011]: ADJCHANGE Adjacency to HQ-01,Down"
                .to_string(),
            String::new(),
            adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down"),
        ]
        .join("\n");

        let events = extract_flaps(NODE, &log, 2024).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].interface, "Hu0/0/0/1");
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let log = "RP/0/RSP0/CPU0:Jan 5 10:00:00.000 UTC: adjchange (Hu0/0/0/1),Down";
        assert!(extract_flaps(NODE, log, 2024).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_flaps(NODE, "", 2024).unwrap().is_empty());
        assert!(
            extract_flaps(NODE, "show logging\nNo entries\n", 2024)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_interface_is_first_group_trimmed() {
        let log = "Jan 5 10:00:00 ADJCHANGE ( BE100 ) (L2) (extra),Up";
        let events = extract_flaps(NODE, log, 2024).unwrap();
        assert_eq!(events[0].interface, "BE100");
    }

    #[test]
    fn test_sorted_by_first_transition() {
        let log = [
            adj("Feb 2 00:00:01", "Hu0/0/0/3", "Down"),
            adj("Jan 31 23:59:59", "Hu0/0/0/2", "Down"),
            adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down"),
            // Later transition of an early interface does not move it
            adj("Mar 1 00:00:00", "Hu0/0/0/1", "Up"),
        ]
        .join("\n");

        let events = extract_flaps(NODE, &log, 2024).unwrap();
        let order: Vec<_> = events.iter().map(|e| e.interface.as_str()).collect();
        assert_eq!(order, ["Hu0/0/0/1", "Hu0/0/0/2", "Hu0/0/0/3"]);

        let starts: Vec<_> = events
            .iter()
            .map(|e| e.first_seen.resolve(2024).unwrap())
            .collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_ties_keep_log_order() {
        let log = [
            adj("Jan 5 10:00:00", "Te0/0/0/9", "Down"),
            adj("Jan 5 10:00:00", "Te0/0/0/1", "Down"),
        ]
        .join("\n");

        let events = extract_flaps(NODE, &log, 2024).unwrap();
        assert_eq!(events[0].interface, "Te0/0/0/9");
        assert_eq!(events[1].interface, "Te0/0/0/1");
    }

    #[test]
    fn test_leap_day_depends_on_reference_year() {
        let log = adj("Feb 29 12:00:00", "Hu0/0/0/1", "Down");

        assert_eq!(extract_flaps(NODE, &log, 2024).unwrap().len(), 1);

        let err = extract_flaps(NODE, &log, 2023).unwrap_err();
        match err {
            Error::Parse(ParseError::Timestamp {
                node,
                timestamp,
                year,
            }) => {
                assert_eq!(node, NODE);
                assert_eq!(timestamp, "Feb 29 12:00:00");
                assert_eq!(year, 2023);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_month_is_fatal() {
        let log = "Foo 5 10:00:00 ADJCHANGE (Hu0/0/0/1),Down";
        assert!(matches!(
            extract_flaps(NODE, log, 2024),
            Err(Error::Parse(ParseError::Timestamp { .. }))
        ));
    }

    #[test]
    fn test_idempotent() {
        let log = [
            adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down"),
            adj("Jan 5 10:00:02", "Te0/0/0/4", "Down"),
            adj("Jan 5 10:00:05", "Hu0/0/0/1", "Up"),
        ]
        .join("\n");

        let first = extract_flaps(NODE, &log, 2024).unwrap();
        let second = extract_flaps(NODE, &log, 2024).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_crlf_lines() {
        let log = format!(
            "{}\r\n{}\r\n",
            adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down"),
            adj("Jan 5 10:00:05", "Hu0/0/0/1", "Up")
        );
        let events = extract_flaps(NODE, &log, 2024).unwrap();
        assert_eq!(events[0].status, Status::Up);
        assert_eq!(events[0].transitions, 2);
    }

    #[test]
    fn test_timestamp_resolve() {
        let ts = LogTimestamp::new("Dec 31 23:59:59");
        let resolved = ts.resolve(2023).unwrap();
        assert_eq!(resolved.to_string(), "2023-12-31 23:59:59");
        assert!(LogTimestamp::new("Jan 5 25:00:00").resolve(2024).is_none());
        assert!(LogTimestamp::new("Jan 5 10:00:60").resolve(2023).is_none());
    }

    #[test]
    fn test_leap_second_is_fatal() {
        let log = adj("Jan 5 10:00:60", "Hu0/0/0/1", "Down");
        match extract_flaps(NODE, &log, 2023) {
            Err(Error::Parse(ParseError::Timestamp { timestamp, year, .. })) => {
                assert_eq!(timestamp, "Jan 5 10:00:60");
                assert_eq!(year, 2023);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
