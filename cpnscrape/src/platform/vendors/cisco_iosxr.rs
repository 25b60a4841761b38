//! Cisco IOS-XR platform definition.
//!
//! Polling only needs exec mode, but the configuration prompt is still
//! recognized so a session left in config mode does not hang the reader.
//!
//! # Prompt Examples
//!
//! ```text
//! RP/0/RSP0/CPU0:CA4-01#                 # exec mode
//! RP/0/RSP0/CPU0:CA4-01(config)#         # configuration mode
//! RP/0/RP0/CPU0:HQ-02(config-if)#        # config sub-mode
//! ```

use crate::platform::{PlatformDefinition, PromptLevel};

/// Create the IOS-XR platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PromptLevel::new("exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PromptLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/:]{1,63}\(config[\w.\-@/:]{0,32}\)#\s?$",
    )
    .unwrap();

    PlatformDefinition::new("cisco_iosxr")
        .with_prompt(exec)
        .with_prompt(configuration)
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_terminal_size(511, 24)
}
