//! Linux platform definition.
//!
//! Lets the collector run against a lab host that replays captured
//! router output (`cat flaps.log` and the like).

use crate::platform::{PlatformDefinition, PromptLevel};

/// Create the Linux platform definition.
pub fn platform() -> PlatformDefinition {
    let user = PromptLevel::new("user", r"[$]\s*$").unwrap();
    let root = PromptLevel::new("root", r"[#]\s*$").unwrap();

    PlatformDefinition::new("linux")
        .with_prompt(user)
        .with_prompt(root)
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
        .with_terminal_size(511, 24)
}
