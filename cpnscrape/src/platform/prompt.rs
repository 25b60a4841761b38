//! Prompt level definition.

use regex::bytes::Regex;

/// One prompt a device can sit at (exec, configuration, ...).
#[derive(Debug, Clone)]
pub struct PromptLevel {
    /// Name of the level, e.g. "exec" or "configuration".
    pub name: String,

    /// Pattern matching the prompt at the end of the output.
    pub pattern: Regex,

    /// Substrings that must NOT be in the prompt for this level to match.
    /// Used to tell `router#` apart from `router(config)#`.
    pub not_contains: Vec<String>,
}

impl PromptLevel {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            not_contains: vec![],
        })
    }

    /// Add a not_contains substring.
    pub fn with_not_contains(mut self, text: impl Into<String>) -> Self {
        self.not_contains.push(text.into());
        self
    }

    /// Check if this level matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        !self.not_contains.iter().any(|nc| prompt.contains(nc.as_str()))
            && self.pattern.is_match(prompt.as_bytes())
    }
}
