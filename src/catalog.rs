//! Rule catalog compiled from historical Cppcheck reports
//!
//! Every report Cppcheck ever produced with `--errorlist` is a snapshot of the
//! rules known to that version. Merging them yields one entry per rule id with
//! the range of versions that knew it. Text from the newest version wins.

use crate::events::EventSink;
use crate::message::Message;
use crate::parser::{stream_file, ParseError};
use crate::replacements::ReplacementTable;
use crate::snapshot::{Snapshot, SnapshotSource};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// A snapshot could not be read; the whole compile is abandoned
#[derive(Debug, Error)]
#[error("Unable to compile rule catalog: snapshot {version} ({}): {source}", .path.display())]
pub struct CatalogCompileError {
    pub version: String,
    pub path: PathBuf,
    #[source]
    pub source: ParseError,
}

/// Render the observed version range of a rule
///
/// `latest` is the version of the last snapshot in the compile.
pub fn render_version_range(min_version: &str, max_version: &str, latest: &str) -> String {
    if max_version == latest {
        format!("since {}", min_version)
    } else if min_version == max_version {
        format!("({})", min_version)
    } else {
        format!("({}-{})", min_version, max_version)
    }
}

/// One rule of the compiled catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Most recently observed definition
    pub message: Message,
    /// First version that reported the rule
    pub min_version: String,
    /// Last version that reported the rule
    pub max_version: String,
    /// Rendered version range (e.g. "since 1.60")
    pub versions: String,
    /// Effective replacement pointer
    pub replacement: Option<String>,
    /// The rule vanished and reappeared between versions
    pub needs_review: bool,
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        &self.message.id
    }

    pub fn deprecated(&self) -> bool {
        self.replacement.is_some()
    }

    /// Short message with the version range appended
    pub fn display_msg(&self) -> String {
        format!("{} {}", self.message.msg, self.versions)
    }

    /// The entry as it appears in the catalog file
    pub fn to_definition(&self) -> Message {
        Message::definition(
            self.id(),
            self.message.severity.as_deref(),
            &self.display_msg(),
            &self.message.verbose,
            self.replacement.as_deref(),
        )
    }
}

/// Compiled catalog, ordered by rule id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
    latest_version: Option<String>,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Version of the newest snapshot merged
    pub fn latest_version(&self) -> Option<&str> {
        self.latest_version.as_deref()
    }

    /// Entries that appeared in a non-contiguous set of versions
    pub fn needing_review(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values().filter(|e| e.needs_review)
    }

    /// All entries as catalog-file definitions, ordered by id
    pub fn definitions(&self) -> Vec<Message> {
        self.entries.values().map(CatalogEntry::to_definition).collect()
    }
}

struct Draft {
    message: Message,
    min_version: String,
    max_version: String,
    needs_review: bool,
}

/// Merges snapshots, oldest first, into a [`Catalog`]
pub struct CatalogCompiler<'a> {
    sink: &'a dyn EventSink,
    replacements: Option<&'a ReplacementTable>,
    drafts: BTreeMap<String, Draft>,
    previous_version: Option<String>,
    current_version: Option<String>,
}

impl<'a> CatalogCompiler<'a> {
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self {
            sink,
            replacements: None,
            drafts: BTreeMap::new(),
            previous_version: None,
            current_version: None,
        }
    }

    /// Use an external replacement table; its pointers override those in the snapshots
    pub fn with_replacements(mut self, table: &'a ReplacementTable) -> Self {
        self.replacements = Some(table);
        self
    }

    /// Merge in-memory snapshots, sorted ascending by version
    pub fn compile(mut self, snapshots: &[Snapshot]) -> Catalog {
        for snapshot in snapshots {
            self.begin_snapshot(&snapshot.version);
            for message in &snapshot.messages {
                self.observe(message.clone());
            }
        }
        self.finish()
    }

    /// Stream on-disk snapshots, sorted ascending by version, into the catalog
    ///
    /// Stops at the first unreadable or malformed snapshot.
    pub fn compile_files(mut self, sources: &[SnapshotSource]) -> Result<Catalog, CatalogCompileError> {
        for source in sources {
            let fail = |e: ParseError| CatalogCompileError {
                version: source.version.clone(),
                path: source.path.clone(),
                source: e,
            };
            let sink = self.sink;
            let stream = stream_file(&source.path, sink).map_err(fail)?;
            self.begin_snapshot(&source.version);
            for message in stream {
                self.observe(message.map_err(fail)?);
            }
        }
        Ok(self.finish())
    }

    fn begin_snapshot(&mut self, version: &str) {
        self.previous_version = self.current_version.take();
        self.current_version = Some(version.to_string());
    }

    fn observe(&mut self, message: Message) {
        let Some(version) = self.current_version.clone() else {
            return;
        };

        match self.drafts.get_mut(&message.id) {
            None => {
                self.drafts.insert(
                    message.id.clone(),
                    Draft {
                        message,
                        min_version: version.clone(),
                        max_version: version,
                        needs_review: false,
                    },
                );
            }
            Some(draft) => {
                if draft.max_version == version {
                    self.sink.warn(&format!(
                        "Duplicate rule {} in snapshot {}, keeping the last definition",
                        message.id, version
                    ));
                } else if self.previous_version.as_deref() != Some(draft.max_version.as_str()) {
                    self.sink.warn(&format!(
                        "Merge of rule, which appear and disappear from version to version: {} (last seen {}, back in {})",
                        message.id, draft.max_version, version
                    ));
                    draft.needs_review = true;
                }
                draft.max_version = version;
                draft.message = message;
            }
        }
    }

    fn finish(self) -> Catalog {
        let Some(latest) = self.current_version else {
            return Catalog::default();
        };

        if let Some(table) = self.replacements {
            for id in table.ids().filter(|id| !self.drafts.contains_key(*id)) {
                self.sink
                    .warn(&format!("Replacement defined for unknown rule: {}", id));
            }
        }

        let entries = self
            .drafts
            .into_iter()
            .map(|(id, draft)| {
                let replacement = self
                    .replacements
                    .and_then(|t| t.get(&id))
                    .or_else(|| draft.message.replacement())
                    .map(String::from);
                let entry = CatalogEntry {
                    versions: render_version_range(&draft.min_version, &draft.max_version, &latest),
                    message: draft.message,
                    min_version: draft.min_version,
                    max_version: draft.max_version,
                    replacement,
                    needs_review: draft.needs_review,
                };
                (id, entry)
            })
            .collect();

        Catalog {
            entries,
            latest_version: Some(latest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    fn def(id: &str, msg: &str) -> Message {
        Message::definition(id, Some("error"), msg, &format!("{} verbose", msg), None)
    }

    fn snapshot(version: &str, ids: &[&str]) -> Snapshot {
        Snapshot::new(
            version,
            ids.iter().map(|id| def(id, &format!("{} in {}", id, version))).collect(),
        )
    }

    #[test]
    fn test_render_version_range() {
        assert_eq!(render_version_range("1.60", "1.60", "1.72"), "(1.60)");
        assert_eq!(render_version_range("1.60", "1.72", "1.72"), "since 1.60");
        assert_eq!(render_version_range("1.60", "1.65", "1.72"), "(1.60-1.65)");
        assert_eq!(render_version_range("1.72", "1.72", "1.72"), "since 1.72");
    }

    #[test]
    fn test_latest_text_wins() {
        let sink = MemorySink::new();
        let catalog = CatalogCompiler::new(&sink).compile(&[
            snapshot("1.60", &["a", "b"]),
            snapshot("1.65", &["a", "b"]),
            snapshot("1.72", &["a"]),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.latest_version(), Some("1.72"));

        let a = catalog.get("a").unwrap();
        assert_eq!(a.message.msg, "a in 1.72");
        assert_eq!(a.min_version, "1.60");
        assert_eq!(a.max_version, "1.72");
        assert_eq!(a.versions, "since 1.60");
        assert_eq!(a.display_msg(), "a in 1.72 since 1.60");

        let b = catalog.get("b").unwrap();
        assert_eq!(b.message.msg, "b in 1.65");
        assert_eq!(b.versions, "(1.60-1.65)");
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_single_old_version() {
        let sink = MemorySink::new();
        let catalog = CatalogCompiler::new(&sink)
            .compile(&[snapshot("1.60", &["gone"]), snapshot("1.72", &["kept"])]);
        assert_eq!(catalog.get("gone").unwrap().versions, "(1.60)");
        assert_eq!(catalog.get("kept").unwrap().versions, "since 1.72");
    }

    #[test]
    fn test_reappearing_rule_is_merged_and_flagged() {
        let sink = MemorySink::new();
        let catalog = CatalogCompiler::new(&sink).compile(&[
            snapshot("1.60", &["flaky", "steady"]),
            snapshot("1.65", &["steady"]),
            snapshot("1.72", &["flaky", "steady"]),
        ]);

        let flaky = catalog.get("flaky").unwrap();
        assert_eq!(flaky.min_version, "1.60");
        assert_eq!(flaky.versions, "since 1.60");
        assert_eq!(flaky.message.msg, "flaky in 1.72");
        assert!(flaky.needs_review);
        assert!(!catalog.get("steady").unwrap().needs_review);

        assert_eq!(catalog.needing_review().count(), 1);
        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("flaky"));
    }

    #[test]
    fn test_duplicate_id_in_snapshot() {
        let sink = MemorySink::new();
        let catalog = CatalogCompiler::new(&sink).compile(&[Snapshot::new(
            "1.60",
            vec![def("a", "first"), def("a", "second")],
        )]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().message.msg, "second");
        assert!(!catalog.get("a").unwrap().needs_review);
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn test_replacement_table_overrides() {
        let sink = MemorySink::new();
        let mut table = ReplacementTable::new();
        table.insert("a", "nullPointer:c");
        table.insert("ghost", "nullPointer");

        let snap = Snapshot::new(
            "1.60",
            vec![
                Message::definition("a", None, "m", "v", Some("other")),
                Message::definition("b", None, "m", "v", Some("kept")),
                def("c", "plain"),
            ],
        );
        let catalog = CatalogCompiler::new(&sink).with_replacements(&table).compile(&[snap]);

        assert_eq!(catalog.get("a").unwrap().replacement.as_deref(), Some("nullPointer:c"));
        assert_eq!(catalog.get("b").unwrap().replacement.as_deref(), Some("kept"));
        assert!(catalog.get("a").unwrap().deprecated());
        assert!(!catalog.get("c").unwrap().deprecated());
        assert!(sink.warnings().iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_empty_compile() {
        let sink = MemorySink::new();
        let catalog = CatalogCompiler::new(&sink).compile(&[]);
        assert!(catalog.is_empty());
        assert_eq!(catalog.latest_version(), None);
    }

    #[test]
    fn test_compile_files_aborts_on_bad_snapshot() {
        let temp = tempfile::TempDir::new().unwrap();
        let good = temp.path().join("cppcheck-1.60.xml");
        let bad = temp.path().join("cppcheck-1.65.xml");
        std::fs::write(&good, r#"<results><error id="a" msg="m" verbose="v"/></results>"#).unwrap();
        std::fs::write(&bad, r#"<results><oops/></results>"#).unwrap();

        let sink = MemorySink::new();
        let err = CatalogCompiler::new(&sink)
            .compile_files(&[
                SnapshotSource { version: "1.60".into(), path: good },
                SnapshotSource { version: "1.65".into(), path: bad },
            ])
            .unwrap_err();

        assert_eq!(err.version, "1.65");
        assert!(matches!(err.source, ParseError::MalformedReport { .. }));
    }

    #[test]
    fn test_compile_files_missing_snapshot() {
        let sink = MemorySink::new();
        let err = CatalogCompiler::new(&sink)
            .compile_files(&[SnapshotSource {
                version: "1.60".into(),
                path: PathBuf::from("does-not-exist.xml"),
            }])
            .unwrap_err();
        assert!(matches!(err.source, ParseError::ReportNotFound { .. }));
    }
}
