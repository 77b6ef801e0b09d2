//! Historical report snapshots, one per Cppcheck version

use crate::message::Message;
use glob::glob;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Messages parsed from one historical report
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: String,
    pub messages: Vec<Message>,
}

impl Snapshot {
    pub fn new(version: &str, messages: Vec<Message>) -> Self {
        Self {
            version: version.to_string(),
            messages,
        }
    }
}

/// A historical report on disk, not yet parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSource {
    pub version: String,
    pub path: PathBuf,
}

/// Find `<prefix><version>.xml` files in `dir`, ordered by version
pub fn discover(dir: &Path, prefix: &str) -> std::io::Result<Vec<SnapshotSource>> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("snapshot directory not found: {}", dir.display()),
        ));
    }

    let name_re = Regex::new(&format!(r"^{}(.+)\.xml$", regex::escape(prefix)))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let pattern = format!(
        "{}/{}*.xml",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(prefix)
    );

    let mut sources = Vec::new();
    let entries = glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    for entry in entries.flatten() {
        if !entry.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(caps) = name_re.captures(name) {
            sources.push(SnapshotSource {
                version: caps[1].to_string(),
                path: entry.clone(),
            });
        }
    }

    sources.sort_by(|a, b| compare_versions(&a.version, &b.version));
    Ok(sources)
}

/// Order version labels segment by segment, numerically where both segments are numbers
///
/// `1.9 < 1.10 < 1.10.1`; non-numeric segments compare lexically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(n), Ok(m)) => n.cmp(&m),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
