//! INI-style configuration: `# comments`, `[Section]` headers and
//! `key = value` pairs. Keys before the first header are globals.

use std::collections::HashMap;
use std::fs;

#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// Returns a message naming the path when the file cannot be read.
    pub fn load(path: &str) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Error reading file {path}: {e}"))?;
        Ok(Self::parse(&content))
    }

    /// Parses configuration text. Malformed lines are skipped.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut cfg = Self::empty();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = Some(name.trim().to_string());
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let value = value.trim().trim_matches('"').to_string();
                match &current_section {
                    None => {
                        cfg.globals.insert(key, value);
                    }
                    Some(sec) => {
                        let section = cfg.sections.entry(sec.clone()).or_default();
                        section.insert(key, value);
                    }
                }
            }
        }
        cfg
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key)
            .or_else(|| self.get_global(key))
            .unwrap_or(default)
    }

    /// `true`/`yes`/`on`/`1` and their negations; anything else yields `default`.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self
            .get_non_empty(section, key)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("true" | "yes" | "on" | "1") => true,
            Some("false" | "no" | "off" | "0") => false,
            _ => default,
        }
    }

    #[must_use]
    pub fn get_u64(&self, section: &str, key: &str, default: u64) -> u64 {
        self.get_non_empty(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Comma separated list with blanks removed.
    #[must_use]
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Drops a trailing `# comment`. URLs never contain `#` in this file format.
fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const SAMPLE: &str = r#"
mode = loopback
# ICE
[Ice]
servers = stun:stun.l.google.com:19302, turn:10.0.0.1:3478 ,
host_addresses = 127.0.0.1   # loopback only

[Media]
video = off
label = "front camera"
[Call]
connect_timeout_ms = 2500
"#;

    #[test]
    fn sections_globals_and_comments() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get_global("mode"), Some("loopback"));
        assert_eq!(cfg.get("Ice", "host_addresses"), Some("127.0.0.1"));
        assert_eq!(cfg.get("Media", "label"), Some("front camera"));
        assert_eq!(cfg.get("Media", "missing"), None);
        assert_eq!(cfg.get_or_default("Media", "mode", "x"), "loopback");
    }

    #[test]
    fn typed_getters() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(
            cfg.get_list("Ice", "servers"),
            vec!["stun:stun.l.google.com:19302", "turn:10.0.0.1:3478"]
        );
        assert!(!cfg.get_bool("Media", "video", true));
        assert!(cfg.get_bool("Media", "audio", true));
        assert_eq!(cfg.get_u64("Call", "connect_timeout_ms", 0), 2500);
        assert_eq!(cfg.get_u64("Call", "nope", 7), 7);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.conf").unwrap_err();
        assert!(err.contains("/definitely/not/here.conf"));
    }
}
