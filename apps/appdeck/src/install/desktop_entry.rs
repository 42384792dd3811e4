//! Minimal freedesktop `.desktop` file editing.
//!
//! Only what integration needs: read a key, replace a key everywhere it
//! occurs, repoint `Exec` keys at another program, and write the file back
//! with every other line untouched.

use std::fmt;
use std::path::Path;

const MAIN_GROUP: &str = "Desktop Entry";
const EXEC_KEY: &str = "Exec";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Group { name: String, raw: String },
    Entry { key: String, raw: String },
    Other(String),
}

/// A parsed desktop entry that preserves line order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesktopEntry {
    lines: Vec<Line>,
}

impl DesktopEntry {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|raw| {
                let trimmed = raw.trim();
                if let Some(name) = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    Line::Group {
                        name: name.trim().to_string(),
                        raw: raw.to_string(),
                    }
                } else if !trimmed.starts_with('#')
                    && let Some((key, _)) = trimmed.split_once('=')
                {
                    Line::Entry {
                        key: key.trim_end().to_string(),
                        raw: raw.to_string(),
                    }
                } else {
                    Line::Other(raw.to_string())
                }
            })
            .collect();
        Self { lines }
    }

    /// Value of the first `key` in the main group, falling back to the first
    /// anywhere when the file has no group headers.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut group: Option<&str> = None;
        for line in &self.lines {
            match line {
                Line::Group { name, .. } => group = Some(name.as_str()),
                Line::Entry { key: k, raw } if k.as_str() == key && group.is_none_or(|g| g == MAIN_GROUP) => {
                    return raw.split_once('=').map(|(_, value)| value.trim());
                }
                _ => {}
            }
        }
        None
    }

    /// Replaces every `key` line with `key=value`. Without any, the pair is
    /// appended to the main group, or to the end of the file if there is no
    /// main group.
    pub fn set(&mut self, key: &str, value: &str) {
        let replacement = format!("{key}={value}");
        let mut replaced = false;
        for line in &mut self.lines {
            if let Line::Entry { key: k, raw } = line
                && k.as_str() == key
            {
                raw.clone_from(&replacement);
                replaced = true;
            }
        }
        if replaced {
            return;
        }

        let entry = Line::Entry {
            key: key.to_string(),
            raw: replacement,
        };
        match self.main_group_end() {
            Some(index) => self.lines.insert(index, entry),
            None => self.lines.push(entry),
        }
    }

    /// Points every `Exec` key at `command`. Whatever followed the original
    /// program (field codes such as `%U`, action flags) is kept.
    pub fn set_exec(&mut self, command: &str) {
        let mut replaced = false;
        for line in &mut self.lines {
            if let Line::Entry { key, raw } = line
                && key.as_str() == EXEC_KEY
            {
                let args = raw
                    .split_once('=')
                    .map_or("", |(_, value)| exec_arguments(value.trim()));
                let updated = if args.is_empty() {
                    format!("{EXEC_KEY}={command}")
                } else {
                    format!("{EXEC_KEY}={command} {args}")
                };
                *raw = updated;
                replaced = true;
            }
        }
        if !replaced {
            self.set(EXEC_KEY, command);
        }
    }

    /// Index just past the last key of the main group.
    fn main_group_end(&self) -> Option<usize> {
        let start = self
            .lines
            .iter()
            .position(|l| matches!(l, Line::Group { name, .. } if name == MAIN_GROUP))?;
        let mut end = start + 1;
        for (offset, line) in self.lines[start + 1..].iter().enumerate() {
            match line {
                Line::Group { .. } => break,
                Line::Entry { .. } => end = start + 1 + offset + 1,
                Line::Other(_) => {}
            }
        }
        Some(end)
    }
}

impl fmt::Display for DesktopEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            let (Line::Group { raw, .. } | Line::Entry { raw, .. } | Line::Other(raw)) = line;
            writeln!(f, "{raw}")?;
        }
        Ok(())
    }
}

/// Arguments of an `Exec` value, i.e. everything after the program, which
/// may be double-quoted.
fn exec_arguments(value: &str) -> &str {
    let rest = if let Some(quoted) = value.strip_prefix('"') {
        let mut escaped = false;
        let close = quoted.char_indices().find_map(|(i, c)| {
            if escaped {
                escaped = false;
                None
            } else if c == '\\' {
                escaped = true;
                None
            } else if c == '"' {
                Some(i + 1)
            } else {
                None
            }
        });
        close.map_or("", |i| &quoted[i..])
    } else {
        value.split_once(char::is_whitespace).map_or("", |(_, rest)| rest)
    };
    rest.trim()
}

/// Quotes `path` when it contains whitespace, as desktop `Exec` keys require.
#[must_use]
pub fn quote_exec_path(path: &Path) -> String {
    let text = path.display().to_string();
    if text.chars().any(char::is_whitespace) {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text
    }
}

/// `Exec` value launching `bundle`. With `prompt_opt_out` the bundle is told
/// to skip third-party integration prompts.
#[must_use]
pub fn exec_line(bundle: &Path, prompt_opt_out: bool) -> String {
    let quoted = quote_exec_path(bundle);
    if prompt_opt_out {
        format!("env {}=1 {quoted}", super::integrate::PROMPT_OPT_OUT_ENV)
    } else {
        quoted
    }
}
