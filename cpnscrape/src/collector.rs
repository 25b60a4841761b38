//! Polls every inventory node and merges the extracted records.
//!
//! Nodes are polled one after another. A node that cannot be reached,
//! rejects the command, or returns output that fails extraction is logged
//! and recorded as a [`NodeFailure`]; the remaining nodes are still polled.

use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, error, info};

use crate::driver::{Driver, DriverBuilder, GenericDriver};
use crate::error::{ParseError, Result};
use crate::inventory::{Defaults, Inventory, Node};
use crate::parse::{FlapEvent, LinkRecord, extract_flaps, extract_links};
use crate::transport::AuthMethod;

/// Lists interface descriptions carrying an LR circuit number.
pub const LINK_COMMAND: &str = "show int des | i LR";

const COMMAND_TIME_FORMAT: &str = "%Y %b %d %H:%M:%S";

/// Time range of the log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl LogWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(ParseError::EmptyWindow {
                start: start.to_string(),
                end: end.to_string(),
            }
            .into());
        }
        Ok(Self { start, end })
    }

    /// A window within one day.
    ///
    /// `date` is `YYYY-MM-DD`; `start` and `end` are `HH:MM:SS` and default
    /// to the whole day.
    pub fn for_day(date: &str, start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            ParseError::Window {
                field: "date",
                value: date.to_string(),
            }
        })?;

        let start = parse_time("start time", start, NaiveTime::MIN)?;
        let end = parse_time("end time", end, day_end())?;

        Self::new(day.and_time(start), day.and_time(end))
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Year log timestamps are placed in.
    pub fn reference_year(&self) -> i32 {
        self.start.year()
    }

    /// The `show logging` command for this window, filtered to IS-IS.
    pub fn command(&self) -> String {
        format!(
            "show logging start {} end {} | i isis",
            self.start.format(COMMAND_TIME_FORMAT),
            self.end.format(COMMAND_TIME_FORMAT)
        )
    }
}

fn day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn parse_time(field: &'static str, value: Option<&str>, default: NaiveTime) -> Result<NaiveTime> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => NaiveTime::parse_from_str(text, "%H:%M:%S").map_err(|_| {
            ParseError::Window {
                field,
                value: text.to_string(),
            }
            .into()
        }),
    }
}

/// Creates an unopened driver for a node.
pub trait Connect {
    type Driver: Driver;

    fn connect(&self, node: &Node) -> Result<Self::Driver>;
}

/// Connects to nodes over SSH using the inventory defaults.
#[derive(Debug, Clone)]
pub struct SshConnector {
    defaults: Defaults,
    username: String,
    auth: AuthMethod,
}

impl SshConnector {
    pub fn new(defaults: Defaults, username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            defaults,
            username: username.into(),
            auth,
        }
    }
}

impl Connect for SshConnector {
    type Driver = GenericDriver;

    fn connect(&self, node: &Node) -> Result<GenericDriver> {
        let mut builder = DriverBuilder::new(&node.host)
            .port(self.defaults.port_for(node))
            .username(&self.username)
            .auth(self.auth.clone())
            .platform(&self.defaults.platform)
            .timeout(self.defaults.timeout())
            .host_key_verification(self.defaults.host_key_verification);

        if let Some(path) = &self.defaults.known_hosts {
            builder = builder.known_hosts_path(path);
        }

        builder.build()
    }
}

/// A node whose records are missing from the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node: String,
    pub host: String,
    pub message: String,
}

/// Records merged across nodes, plus the nodes that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    /// Records in node order, each node's records in extractor order.
    pub records: Vec<T>,
    pub failures: Vec<NodeFailure>,
    /// Number of nodes attempted.
    pub polled: usize,
}

impl<T> Collection<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            polled: 0,
        }
    }

    /// True when nodes were polled and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.polled > 0 && self.failures.len() == self.polled
    }
}

/// Polls the inventory's nodes in order.
pub struct Collector<C> {
    connector: C,
    nodes: Vec<Node>,
    pause: Duration,
}

impl<C: Connect> Collector<C> {
    pub fn new(connector: C, inventory: &Inventory) -> Self {
        Self {
            connector,
            nodes: inventory.nodes.clone(),
            pause: Duration::ZERO,
        }
    }

    /// Wait this long between nodes.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Adjacency flaps within `window` from every node, each node's events
    /// ordered by first transition.
    pub async fn collect_flaps(&self, window: &LogWindow) -> Collection<FlapEvent> {
        let year = window.reference_year();
        self.collect(&window.command(), |node, output| {
            extract_flaps(&node.name, output, year)
        })
        .await
    }

    /// LR circuits from every node.
    pub async fn collect_links(&self) -> Collection<LinkRecord> {
        self.collect(LINK_COMMAND, |node, output| {
            Ok(extract_links(&node.name, output))
        })
        .await
    }

    async fn collect<T, F>(&self, command: &str, extract: F) -> Collection<T>
    where
        F: Fn(&Node, &str) -> Result<Vec<T>>,
    {
        let mut collection = Collection::new();

        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            collection.polled += 1;
            info!("Connecting to {} ({})...", node.name, node.host);

            let outcome = self
                .run(node, command)
                .await
                .and_then(|output| extract(node, &output));

            match outcome {
                Ok(records) => {
                    info!("{}: {} records", node.name, records.len());
                    collection.records.extend(records);
                }
                Err(e) => {
                    error!("{} ({}): {}", node.name, node.host, e);
                    collection.failures.push(NodeFailure {
                        node: node.name.clone(),
                        host: node.host.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        collection
    }

    /// Run one command on a node and return its output.
    async fn run(&self, node: &Node, command: &str) -> Result<String> {
        let mut driver = self.connector.connect(node)?;

        if let Err(e) = driver.open().await {
            shutdown(node, &mut driver).await;
            return Err(e);
        }

        let response = driver.send_command(command).await;
        shutdown(node, &mut driver).await;

        response?.into_output()
    }
}

/// Close a driver, logging rather than returning a failure.
async fn shutdown<D: Driver>(node: &Node, driver: &mut D) {
    if let Err(e) = driver.close().await {
        debug!("{}: close failed: {}", node.name, e);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use secrecy::SecretString;

    use super::*;
    use crate::driver::Response;
    use crate::error::{ChannelError, DriverError, Error};
    use crate::parse::{LinkRate, Status};

    #[derive(Clone)]
    enum Script {
        Output(String),
        Rejected(&'static str),
        Unreachable,
    }

    #[derive(Default)]
    struct FakeConnector {
        scripts: HashMap<String, Script>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
        closed: Arc<Mutex<Vec<String>>>,
    }

    impl FakeConnector {
        fn script(mut self, node: &str, script: Script) -> Self {
            self.scripts.insert(node.to_string(), script);
            self
        }
    }

    struct FakeDriver {
        host: String,
        script: Script,
        open: bool,
        sent: Arc<Mutex<Vec<(String, String)>>>,
        closed: Arc<Mutex<Vec<String>>>,
    }

    impl Connect for FakeConnector {
        type Driver = FakeDriver;

        fn connect(&self, node: &Node) -> Result<FakeDriver> {
            Ok(FakeDriver {
                host: node.host.clone(),
                script: self
                    .scripts
                    .get(&node.name)
                    .cloned()
                    .unwrap_or(Script::Output(String::new())),
                open: false,
                sent: self.sent.clone(),
                closed: self.closed.clone(),
            })
        }
    }

    impl Driver for FakeDriver {
        async fn open(&mut self) -> Result<()> {
            if let Script::Unreachable = self.script {
                return Err(ChannelError::Closed.into());
            }
            self.open = true;
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.open = false;
            self.closed.lock().unwrap().push(self.host.clone());
            Ok(())
        }

        async fn send_command(&mut self, command: &str) -> Result<Response> {
            if !self.open {
                return Err(DriverError::NotConnected.into());
            }
            self.sent
                .lock()
                .unwrap()
                .push((self.host.clone(), command.to_string()));

            let response = match &self.script {
                Script::Output(text) => {
                    Response::new(command, text.clone(), text.clone(), "", Duration::ZERO)
                }
                Script::Rejected(msg) => {
                    Response::new(command, *msg, *msg, "", Duration::ZERO).with_failure(*msg)
                }
                Script::Unreachable => unreachable!(),
            };
            Ok(response)
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn inventory() -> Inventory {
        Inventory::new(vec![
            Node::new("CA4-01", "10.18.4.27"),
            Node::new("HQ-01", "10.30.2.26"),
            Node::new("RMD-01", "10.28.3.35"),
        ])
        .unwrap()
    }

    fn adj(ts: &str, intf: &str, state: &str) -> String {
        format!(
            "RP/0/RSP0/CPU0:{ts}.000 UTC: isis[1011]: %ROUTING-ISIS-5-ADJCHANGE : Adjacency to X ({intf}) (L2),{state}\n"
        )
    }

    #[test]
    fn test_window_command() {
        let window = LogWindow::for_day("2024-01-05", None, Some("12:30:00")).unwrap();
        assert_eq!(
            window.command(),
            "show logging start 2024 Jan 05 00:00:00 end 2024 Jan 05 12:30:00 | i isis"
        );
        assert_eq!(window.reference_year(), 2024);
    }

    #[test]
    fn test_window_defaults_to_whole_day() {
        let window = LogWindow::for_day("2023-12-31", Some(""), None).unwrap();
        assert_eq!(window.start().to_string(), "2023-12-31 00:00:00");
        assert_eq!(window.end().to_string(), "2023-12-31 23:59:59");
    }

    #[test]
    fn test_window_rejects_bad_input() {
        assert!(matches!(
            LogWindow::for_day("05/01/2024", None, None),
            Err(Error::Parse(ParseError::Window { field: "date", .. }))
        ));
        assert!(matches!(
            LogWindow::for_day("2024-01-05", Some("25:00:00"), None),
            Err(Error::Parse(ParseError::Window { field: "start time", .. }))
        ));
        assert!(matches!(
            LogWindow::for_day("2024-01-05", Some("12:00:00"), Some("11:00:00")),
            Err(Error::Parse(ParseError::EmptyWindow { .. }))
        ));
    }

    #[tokio::test]
    async fn test_collect_flaps_merges_nodes_in_order() {
        let connector = FakeConnector::default()
            .script(
                "CA4-01",
                Script::Output(
                    adj("Jan 5 10:00:07", "Te0/0/0/2", "Down")
                        + &adj("Jan 5 10:00:00", "Hu0/0/0/1", "Down")
                        + &adj("Jan 5 10:00:05", "Hu0/0/0/1", "Up"),
                ),
            )
            .script("HQ-01", Script::Output(adj("Jan 5 09:00:00", "Hu0/0/0/4", "Down")));
        let sent = connector.sent.clone();

        let collector = Collector::new(connector, &inventory());
        let window = LogWindow::for_day("2024-01-05", None, None).unwrap();
        let collection = collector.collect_flaps(&window).await;

        assert_eq!(collection.polled, 3);
        assert!(collection.failures.is_empty());

        let rows: Vec<_> = collection
            .records
            .iter()
            .map(|e| (e.node.as_str(), e.interface.as_str(), e.flaps()))
            .collect();
        assert_eq!(
            rows,
            [
                ("CA4-01", "Hu0/0/0/1", 1),
                ("CA4-01", "Te0/0/0/2", 1),
                ("HQ-01", "Hu0/0/0/4", 1),
            ]
        );

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(_, cmd)| *cmd == window.command()));
    }

    #[tokio::test]
    async fn test_failed_nodes_are_skipped() {
        let connector = FakeConnector::default()
            .script("CA4-01", Script::Unreachable)
            .script("HQ-01", Script::Rejected("% Invalid input detected"))
            .script(
                "RMD-01",
                Script::Output("Hu0/0/0/1  up  up  TO-HQ-SITE\\A\\LR-1234\n".to_string()),
            );
        let closed = connector.closed.clone();

        let collection = Collector::new(connector, &inventory())
            .collect_links()
            .await;

        assert_eq!(collection.polled, 3);
        assert!(!collection.all_failed());
        assert_eq!(collection.records.len(), 1);
        assert_eq!(collection.records[0].node, "RMD-01");
        assert_eq!(collection.records[0].rate, LinkRate::Hundred);
        assert_eq!(collection.records[0].status, Status::Up);

        let failed: Vec<_> = collection.failures.iter().map(|f| f.node.as_str()).collect();
        assert_eq!(failed, ["CA4-01", "HQ-01"]);
        assert_eq!(collection.failures[0].host, "10.18.4.27");
        assert!(collection.failures[1].message.contains("% Invalid input detected"));

        // Every session is closed, including the one that failed to open
        assert_eq!(
            *closed.lock().unwrap(),
            ["10.18.4.27", "10.30.2.26", "10.28.3.35"]
        );
    }

    #[tokio::test]
    async fn test_bad_timestamp_fails_only_that_node() {
        let connector = FakeConnector::default()
            .script("CA4-01", Script::Output(adj("Feb 29 10:00:00", "Hu0/0/0/1", "Down")))
            .script("HQ-01", Script::Output(adj("Feb 28 10:00:00", "Hu0/0/0/1", "Down")));

        let window = LogWindow::for_day("2023-02-28", None, None).unwrap();
        let collection = Collector::new(connector, &inventory())
            .collect_flaps(&window)
            .await;

        assert_eq!(collection.records.len(), 1);
        assert_eq!(collection.records[0].node, "HQ-01");
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].node, "CA4-01");
        assert!(collection.failures[0].message.contains("Feb 29 10:00:00"));
    }

    #[tokio::test]
    async fn test_failed_open_still_closes() {
        let connector = FakeConnector::default().script("HQ-01", Script::Unreachable);
        let closed = connector.closed.clone();
        let sent = connector.sent.clone();

        let collection = Collector::new(connector, &inventory())
            .collect_links()
            .await;

        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].node, "HQ-01");
        assert!(closed.lock().unwrap().contains(&"10.30.2.26".to_string()));
        assert!(sent.lock().unwrap().iter().all(|(host, _)| host != "10.30.2.26"));
    }

    #[tokio::test]
    async fn test_all_failed() {
        let connector = FakeConnector::default()
            .script("CA4-01", Script::Unreachable)
            .script("HQ-01", Script::Unreachable)
            .script("RMD-01", Script::Unreachable);

        let collection = Collector::new(connector, &inventory())
            .collect_links()
            .await;
        assert!(collection.all_failed());
        assert!(collection.records.is_empty());
    }

    #[test]
    fn test_ssh_connector_builds_iosxr_driver() {
        let inventory = inventory();
        let connector = SshConnector::new(
            inventory.defaults.clone(),
            "noc",
            AuthMethod::Password(SecretString::from("secret".to_string())),
        );
        let driver = connector.connect(&inventory.nodes[1]).unwrap();
        assert_eq!(driver.host(), "10.30.2.26");
        assert_eq!(driver.platform().name, "cisco_iosxr");
    }
}
