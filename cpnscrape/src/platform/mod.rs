//! Platform definitions: what a device's prompts look like, how to prepare
//! its terminal, and which output means a command was rejected.

mod definition;
mod prompt;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use prompt::PromptLevel;

use crate::error::{PlatformError, Result};

/// Names accepted by [`by_name`].
pub const PLATFORMS: &[&str] = &["cisco_iosxr", "linux"];

/// Look up a built-in platform definition.
pub fn by_name(name: &str) -> Result<PlatformDefinition> {
    match name {
        "cisco_iosxr" | "cisco_xr" => Ok(vendors::cisco_iosxr::platform()),
        "linux" => Ok(vendors::linux::platform()),
        _ => Err(PlatformError::UnknownPlatform {
            name: name.to_string(),
        }
        .into()),
    }
}
