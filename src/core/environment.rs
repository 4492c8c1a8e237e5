//! Environment variable overlays for task execution.
//!
//! Local runs apply the overlay on top of the inherited process
//! environment; grid runs render it into the launch descriptor's
//! environment line so the remote shell sees the same variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variables passed to a task during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the named variables from the current process environment.
    ///
    /// Variables that are unset (or not valid UTF-8) are skipped rather
    /// than forwarded empty.
    pub fn capture_from_process<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vars = keys
            .into_iter()
            .filter_map(|k| {
                let key = k.as_ref();
                std::env::var(key).ok().map(|v| (key.to_string(), v))
            })
            .collect();
        Self { vars }
    }

    /// Builder: add an environment variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Add an environment variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Get an environment variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Check if a variable exists.
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Get the number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Merge another environment into this one.
    /// Variables from `other` override existing variables.
    pub fn merge(&mut self, other: &Environment) {
        for (k, v) in &other.vars {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    /// Iterate over the environment variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    /// Render the overlay as a single shell line for a launch descriptor,
    /// e.g. `export PATH=/usr/bin PYTHONPATH=/opt/lib`.
    ///
    /// Keys are sorted so the rendered descriptor is deterministic.
    /// Returns `None` when the overlay is empty, in which case the
    /// descriptor omits the environment line entirely.
    pub fn shell_line(&self) -> Option<String> {
        if self.vars.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self.vars.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let joined = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        Some(format!("export {}", joined))
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Environment {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
