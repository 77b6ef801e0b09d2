//! Cppcheck report importer and rule catalog compiler
//!
//! Reads the XML reports Cppcheck writes with `--xml --xml-version=2` and serves
//! two consumers:
//!
//! - analysis time: a report is parsed into [`Message`]s and mapped onto rules
//!   and files by the [`Importer`];
//! - build time: the `--errorlist` output of many Cppcheck versions is merged by
//!   the [`CatalogCompiler`] into one rule catalog, which is written back in the
//!   same XML dialect.
//!
//! # Architecture
//!
//! ```text
//! snapshots -> parser -> CatalogCompiler -> Catalog -> writer -> cppcheck.xml
//! cppcheck.xml -> parser -> RuleRepository (per language, deprecation resolved)
//! report -> parser -> Importer (+ RuleRepository) -> issues
//! ```

pub mod catalog;
pub mod config;
pub mod deprecation;
pub mod events;
pub mod import;
pub mod index;
pub mod message;
pub mod parser;
pub mod replacements;
pub mod rule;
pub mod snapshot;
pub mod writer;

// Re-export main types
pub use catalog::{render_version_range, Catalog, CatalogCompileError, CatalogCompiler, CatalogEntry};
pub use config::{Config, ConfigError};
pub use deprecation::{resolve, ReplacementPointer, Resolution};
pub use events::{EventSink, LogSink, MemorySink};
pub use import::{Importer, Issue, LanguageScope};
pub use index::{index_files, IndexError};
pub use message::{Location, Message, Payload};
pub use parser::{parse_file, parse_reader, stream_file, MessageStream, ParseError};
pub use replacements::{ReplacementError, ReplacementTable};
pub use rule::{Rule, RulePriority, RuleRepository, RuleStatus};
pub use snapshot::{Snapshot, SnapshotSource};
pub use writer::{render_catalog, save_catalog, CatalogWriter};
