//! Source files indexed per language
//!
//! Every file belongs to at most one language. Extensions claimed by several
//! configured languages (`.h`) go to the configured header language when it is
//! one of the claimants, otherwise to the first claimant in configuration order.

use glob::glob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while collecting files
#[derive(Debug, Error)]
#[error("Invalid file pattern '{pattern}': {source}")]
pub struct IndexError {
    pub pattern: String,
    #[source]
    pub source: glob::PatternError,
}

/// File extensions known for a language
pub fn language_extensions(language: &str) -> &'static [&'static str] {
    match language {
        "c" => &["c", "h"],
        "cpp" => &["cpp", "cc", "cxx", "c++", "hpp", "hh", "hxx", "h++", "h"],
        _ => &[],
    }
}

/// The one language a file is indexed under, if any
pub fn owning_language<'l>(
    path: &Path,
    languages: &'l [String],
    header_language: &str,
) -> Option<&'l str> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    let mut claimants = languages
        .iter()
        .map(String::as_str)
        .filter(|lang| language_extensions(lang).iter().any(|e| *e == ext));

    let first = claimants.next()?;
    if first == header_language {
        return Some(first);
    }
    Some(claimants.find(|lang| *lang == header_language).unwrap_or(first))
}

/// Collect files under `base` matching `patterns` (all files when empty),
/// grouped by owning language
///
/// Every configured language gets an entry, possibly empty.
pub fn index_files(
    base: &Path,
    languages: &[String],
    patterns: &[String],
    header_language: &str,
) -> Result<BTreeMap<String, Vec<PathBuf>>, IndexError> {
    let root = glob::Pattern::escape(&base.to_string_lossy());
    let patterns: Vec<String> = if patterns.is_empty() {
        vec!["**/*".to_string()]
    } else {
        patterns.to_vec()
    };

    let mut index: BTreeMap<String, Vec<PathBuf>> = languages
        .iter()
        .map(|lang| (lang.clone(), Vec::new()))
        .collect();

    for pattern in &patterns {
        let full = format!("{}/{}", root, pattern.trim_start_matches("./"));
        let matches = glob(&full).map_err(|source| IndexError {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in matches.flatten() {
            if !entry.is_file() {
                continue;
            }
            if let Some(lang) = owning_language(&entry, languages, header_language) {
                if let Some(files) = index.get_mut(lang) {
                    files.push(entry);
                }
            }
        }
    }

    for files in index.values_mut() {
        files.sort();
        files.dedup();
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn langs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn names(files: &[PathBuf], base: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/util")).unwrap();
        fs::create_dir_all(temp.path().join("test")).unwrap();
        for name in ["src/a.c", "src/a.h", "src/b.cpp", "src/b.hpp", "src/util/u.cc", "test/t.c", "README.md"] {
            fs::write(temp.path().join(name), "").unwrap();
        }
        temp
    }

    #[test]
    fn test_owning_language() {
        let both = langs(&["c", "cpp"]);
        assert_eq!(owning_language(Path::new("a.c"), &both, "cpp"), Some("c"));
        assert_eq!(owning_language(Path::new("a.hpp"), &both, "cpp"), Some("cpp"));
        assert_eq!(owning_language(Path::new("a.h"), &both, "cpp"), Some("cpp"));
        assert_eq!(owning_language(Path::new("a.h"), &both, "c"), Some("c"));
        assert_eq!(owning_language(Path::new("a.md"), &both, "cpp"), None);

        // header language not configured: first claimant wins
        let c_only = langs(&["c"]);
        assert_eq!(owning_language(Path::new("a.h"), &c_only, "cpp"), Some("c"));
    }

    #[test]
    fn test_header_indexed_under_one_language() {
        let temp = project();
        let index = index_files(temp.path(), &langs(&["c", "cpp"]), &[], "cpp").unwrap();

        assert_eq!(names(&index["c"], temp.path()), vec!["src/a.c", "test/t.c"]);
        assert_eq!(
            names(&index["cpp"], temp.path()),
            vec!["src/a.h", "src/b.cpp", "src/b.hpp", "src/util/u.cc"]
        );
    }

    #[test]
    fn test_patterns_restrict_files() {
        let temp = project();
        let patterns = vec!["./src/*".to_string()];
        let index = index_files(temp.path(), &langs(&["c", "cpp"]), &patterns, "c").unwrap();

        assert_eq!(names(&index["c"], temp.path()), vec!["src/a.c", "src/a.h"]);
        assert_eq!(names(&index["cpp"], temp.path()), vec!["src/b.cpp", "src/b.hpp"]);
    }

    #[test]
    fn test_overlapping_patterns_deduplicated() {
        let temp = project();
        let patterns = vec!["src/*.c".to_string(), "**/*.c".to_string()];
        let index = index_files(temp.path(), &langs(&["c"]), &patterns, "cpp").unwrap();

        assert_eq!(names(&index["c"], temp.path()), vec!["src/a.c", "test/t.c"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let err = index_files(temp.path(), &langs(&["c"]), &["[".to_string()], "cpp").unwrap_err();
        assert_eq!(err.pattern, "[");
    }
}
