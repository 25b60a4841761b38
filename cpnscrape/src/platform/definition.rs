//! Platform definition for vendor-specific configurations.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::prompt::PromptLevel;

/// Everything vendor-specific the driver needs to run show commands.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_iosxr", "linux").
    pub name: String,

    /// Prompts the device can present, in matching priority.
    pub prompts: IndexMap<String, PromptLevel>,

    /// Output substrings that mean the device rejected a command.
    pub failed_when_contains: Vec<String>,

    /// Commands run right after the session opens (paging off, ...).
    pub on_open_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompts: IndexMap::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    pub fn with_prompt(mut self, level: PromptLevel) -> Self {
        self.prompts.insert(level.name.clone(), level);
        self
    }

    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// One regex matching any of the platform's prompts.
    pub fn prompt_pattern(&self) -> Result<Regex, regex::Error> {
        if self.prompts.is_empty() {
            return Regex::new(r"[$#>]\s*$");
        }

        let alternatives: Vec<String> = self
            .prompts
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect();
        Regex::new(&alternatives.join("|"))
    }

    /// The prompt level a prompt string belongs to.
    pub fn level_for(&self, prompt: &str) -> Option<&PromptLevel> {
        self.prompts.values().find(|level| level.matches(prompt))
    }

    /// First failure pattern found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .map(String::as_str)
            .find(|pattern| output.contains(pattern))
    }

    /// Strip the command echo and the trailing prompt line from raw output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let output = raw.trim_start_matches(['\r', '\n']);
        let output = output
            .strip_prefix(command)
            .unwrap_or(output)
            .trim_start_matches(['\r', '\n']);

        let body = match memchr::memrchr(b'\n', output.as_bytes()) {
            Some(pos) => &output[..pos],
            None if self.level_for(output.trim()).is_some() => "",
            None => output,
        };

        body.trim_end_matches(['\r', '\n']).to_string()
    }
}
