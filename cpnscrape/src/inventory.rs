//! Inventory of nodes to poll, loaded from TOML.
//!
//! ```toml
//! [defaults]
//! platform = "cisco_iosxr"
//! timeout_secs = 60
//!
//! [[nodes]]
//! name = "CA4-01"
//! host = "10.18.4.27"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{InventoryError, Result};
use crate::transport::HostKeyVerification;

/// Settings shared by every node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    /// Platform name passed to the driver builder.
    pub platform: String,

    pub port: u16,

    /// Connect and per-command read timeout.
    pub timeout_secs: u64,

    /// Pause between nodes; the command's own default when unset.
    pub pause_secs: Option<u64>,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; the user's default when unset.
    pub known_hosts: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            platform: "cisco_iosxr".to_string(),
            port: 22,
            timeout_secs: 60,
            pause_secs: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts: None,
        }
    }
}

impl Defaults {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// SSH port for `node`: its own, or the default.
    pub fn port_for(&self, node: &Node) -> u16 {
        node.port.unwrap_or(self.port)
    }
}

/// A router to poll.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Node {
    /// Name used in the MTX-A column.
    pub name: String,

    /// Management address.
    #[serde(alias = "ip")]
    pub host: String,

    /// Overrides the default SSH port.
    #[serde(default)]
    pub port: Option<u16>,
}

impl Node {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: None,
        }
    }
}

/// Nodes to poll, in polling order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Inventory {
    /// Build an inventory from nodes, with default settings.
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        let inventory = Self {
            defaults: Defaults::default(),
            nodes,
        };
        inventory.validate()?;
        Ok(inventory)
    }

    /// Parse and validate an inventory document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let inventory: Self = toml::from_str(text).map_err(InventoryError::Toml)?;
        inventory.validate()?;
        Ok(inventory)
    }

    /// Read an inventory file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(InventoryError::Empty.into());
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(InventoryError::DuplicateNode {
                    name: node.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::Error;

    const INVENTORY: &str = r#"
[defaults]
timeout_secs = 90
pause_secs = 2
host_key_verification = "strict"

[[nodes]]
name = "CA4-01"
host = "10.18.4.27"

[[nodes]]
name = "HQ-01"
ip = "10.30.2.26"
port = 2222
"#;

    #[test]
    fn test_parse_inventory() {
        let inventory = Inventory::from_toml(INVENTORY).unwrap();

        assert_eq!(inventory.defaults.platform, "cisco_iosxr");
        assert_eq!(inventory.defaults.timeout(), Duration::from_secs(90));
        assert_eq!(inventory.defaults.pause_secs, Some(2));
        assert_eq!(
            inventory.defaults.host_key_verification,
            HostKeyVerification::Strict
        );

        let names: Vec<_> = inventory.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["CA4-01", "HQ-01"]);
        assert_eq!(inventory.nodes[1].host, "10.30.2.26");
        assert_eq!(inventory.defaults.port_for(&inventory.nodes[0]), 22);
        assert_eq!(inventory.defaults.port_for(&inventory.nodes[1]), 2222);
    }

    #[test]
    fn test_defaults_optional() {
        let inventory = Inventory::from_toml(
            r#"
[[nodes]]
name = "RMD-01"
host = "10.28.3.35"
"#,
        )
        .unwrap();
        assert_eq!(inventory.defaults, Defaults::default());
    }

    #[test]
    fn test_empty_inventory() {
        assert!(matches!(
            Inventory::from_toml("[defaults]\nport = 22\n"),
            Err(Error::Inventory(InventoryError::Empty))
        ));
    }

    #[test]
    fn test_duplicate_node() {
        let result = Inventory::new(vec![
            Node::new("CA5-01", "10.21.2.9"),
            Node::new("CA5-01", "10.21.2.12"),
        ]);
        assert!(matches!(
            result,
            Err(Error::Inventory(InventoryError::DuplicateNode { name })) if name == "CA5-01"
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Inventory::from_toml(
            r#"
[[nodes]]
name = "RMD-01"
hostname = "10.28.3.35"
"#,
        );
        assert!(matches!(result, Err(Error::Inventory(InventoryError::Toml(_)))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();

        let inventory = Inventory::load(file.path()).unwrap();
        assert_eq!(inventory.nodes.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Inventory::load("/nonexistent/inventory.toml"),
            Err(Error::Inventory(InventoryError::Read { .. }))
        ));
    }

    #[test]
    fn test_shipped_inventory() {
        let inventory = Inventory::from_toml(include_str!("../inventory.toml")).unwrap();
        assert_eq!(inventory.nodes.len(), 8);
        assert_eq!(inventory.nodes[0].name, "CA4-01");
    }
}
