//! Line scanner for Terraform `.tf` files.
//!
//! Recognizes just enough of the HCL syntax to pull a single resource's
//! `ami`, `instance_type` and tags out of a config file:
//! ```text
//! resource "aws_instance" "web" {
//!   ami           = "ami-0abc"   # pinned
//!   instance_type = "t2.micro"
//!   tags = {
//!     Name = "web"
//!   }
//! }
//! ```
//! Anything else in the file is skipped. Variables and expressions are kept
//! as their literal text.

use crate::error::{Error, Result};
use crate::types::{AWS_INSTANCE, DeclaredInstance};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// `key = value`, where the key may be quoted.
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"([^"]+)"|([A-Za-z_][\w.\-/]*))\s*=\s*(.*)$"#)
        .expect("valid key/value regex (verified by tests)")
});

/// Where the scanner is relative to the target resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    InsideResourceBlock,
    InsideTagsBlock,
}

/// Extracts a [`DeclaredInstance`] for one resource type from config text.
#[derive(Debug, Clone)]
pub struct ConfigScanner {
    resource_type: String,
}

impl Default for ConfigScanner {
    fn default() -> Self {
        Self::new(AWS_INSTANCE)
    }
}

impl ConfigScanner {
    /// Scanner for the given resource type (e.g., "aws_instance").
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Scan a config file.
    ///
    /// Only an unreadable file is an error; a file without the resource
    /// yields an empty [`DeclaredInstance`].
    pub async fn scan_file(&self, path: &Path) -> Result<DeclaredInstance> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::ConfigUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.scan_str(&content))
    }

    /// Scan config text.
    pub fn scan_str(&self, content: &str) -> DeclaredInstance {
        let kind_literal = format!("\"{}\"", self.resource_type);
        let mut declared = DeclaredInstance::default();
        let mut state = ScanState::Outside;

        for line in content.lines() {
            let line = line.trim();

            // Skip empty lines and full-line comments
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let line = strip_trailing_comment(line);
            if line.is_empty() {
                continue;
            }

            state = match state {
                ScanState::Outside => {
                    if line.starts_with("resource") && line.contains(&kind_literal) {
                        ScanState::InsideResourceBlock
                    } else {
                        ScanState::Outside
                    }
                }
                ScanState::InsideResourceBlock => {
                    if line == "}" {
                        ScanState::Outside
                    } else if line.starts_with("tags") && line.contains('{') {
                        ScanState::InsideTagsBlock
                    } else {
                        if let Some((key, value)) = parse_key_value(line) {
                            match key.as_str() {
                                "ami" => declared.ami = value,
                                "instance_type" => declared.instance_type = value,
                                _ => {}
                            }
                        }
                        ScanState::InsideResourceBlock
                    }
                }
                ScanState::InsideTagsBlock => {
                    if line == "}" {
                        ScanState::InsideResourceBlock
                    } else {
                        if let Some((key, value)) = parse_key_value(line) {
                            declared.tags.insert(key, value);
                        }
                        ScanState::InsideTagsBlock
                    }
                }
            };
        }

        declared
    }
}

/// Scan a config file for an `aws_instance` resource.
pub async fn scan_file(path: &Path) -> Result<DeclaredInstance> {
    ConfigScanner::default().scan_file(path).await
}

/// Scan config text for an `aws_instance` resource.
pub fn scan_str(content: &str) -> DeclaredInstance {
    ConfigScanner::default().scan_str(content)
}

/// Cut a `#` or `//` comment that is not inside a quoted value.
fn strip_trailing_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for (idx, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if c == q && prev != '\\' {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => return line[..idx].trim_end(),
                '/' if prev == '/' => return line[..idx - 1].trim_end(),
                _ => {}
            },
        }
        prev = c;
    }

    line
}

/// Split `key = value`, trimming both and unquoting the value.
fn parse_key_value(line: &str) -> Option<(String, String)> {
    let caps = KEY_VALUE.captures(line)?;
    let key = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();

    let raw = caps.get(3).map_or("", |m| m.as_str()).trim();
    let raw = raw.strip_suffix(',').unwrap_or(raw).trim_end();
    let value = unquote(raw).trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}
