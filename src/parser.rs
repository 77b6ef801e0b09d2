//! Streaming Cppcheck XML report parser using quick-xml
//!
//! Two report shapes are accepted:
//!
//! ```text
//! <results version="2">              <results>
//!   <cppcheck version="1.72"/>          <error id=".." .../>
//!   <errors>                            <error id=".." .../>
//!     <error id=".." .../>            </results>
//!   </errors>
//! </results>
//! ```
//!
//! The document is read in a single forward pass; nothing beyond the current
//! `error` element is held in memory.

use crate::events::EventSink;
use crate::message::{Location, Message};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tool-info element wrapping the version attribute
pub const TOOL_ELEMENT: &str = "cppcheck";
/// Container of error elements
pub const ERRORS_ELEMENT: &str = "errors";
/// One diagnostic
pub const ERROR_ELEMENT: &str = "error";
/// Location child of a diagnostic
pub const LOCATION_ELEMENT: &str = "location";
/// Attribute carrying the replacement pointer of a rule definition
pub const REPLACEMENT_ATTRIBUTE: &str = "SonarQube";

/// Error while reading a report
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Cppcheck report not found or unreadable: {}", .path.display())]
    ReportNotFound { path: PathBuf },

    #[error("Unexpected cppcheck file format, unexpected xml element: {element}")]
    MalformedReport { element: String },

    #[error("Element <{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Parse a report file into messages
pub fn parse_file(path: &Path, sink: &dyn EventSink) -> Result<Vec<Message>, ParseError> {
    stream_file(path, sink)?.collect()
}

/// Parse a report from any buffered reader
pub fn parse_reader<R: BufRead>(reader: R, sink: &dyn EventSink) -> Result<Vec<Message>, ParseError> {
    MessageStream::new(reader, sink).collect()
}

/// Open a report file as a lazy message stream
///
/// The file handle lives inside the stream and is closed when the stream is
/// dropped, whether or not it was read to the end.
pub fn stream_file<'s>(
    path: &Path,
    sink: &'s dyn EventSink,
) -> Result<MessageStream<'s, BufReader<File>>, ParseError> {
    let not_found = || ParseError::ReportNotFound {
        path: path.to_path_buf(),
    };
    let metadata = std::fs::metadata(path).map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }
    let file = File::open(path).map_err(|_| not_found())?;
    Ok(MessageStream::new(BufReader::new(file), sink))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeRoot,
    InRoot,
    InErrors,
    Done,
}

/// Start tag with its attributes decoded
struct Head {
    name: String,
    attrs: HashMap<String, String>,
}

impl Head {
    fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }
}

enum Tag {
    Open(Head),
    Empty(Head),
    Close,
    Eof,
}

/// Pull-based iterator over the `error` elements of a report
pub struct MessageStream<'s, R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    state: State,
    sink: &'s dyn EventSink,
}

impl<'s, R: BufRead> MessageStream<'s, R> {
    pub fn new(input: R, sink: &'s dyn EventSink) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            state: State::BeforeRoot,
            sink,
        }
    }

    fn xml_error(&self, message: impl ToString) -> ParseError {
        ParseError::Xml {
            position: self.reader.buffer_position(),
            message: message.to_string(),
        }
    }

    /// Read up to the next tag, skipping text, comments and declarations
    fn next_tag(&mut self) -> Result<Tag, ParseError> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    return Err(ParseError::Xml {
                        position: self.reader.buffer_position(),
                        message: e.to_string(),
                    })
                }
            };
            let (start, is_empty) = match event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok(Tag::Close),
                Event::Eof => return Ok(Tag::Eof),
                _ => continue,
            };

            let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
            let mut attrs = HashMap::new();
            for attr in start.attributes() {
                let attr = attr.map_err(|e| ParseError::Xml {
                    position: self.reader.buffer_position(),
                    message: e.to_string(),
                })?;
                let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                let value = attr.unescape_value().map_err(|e| ParseError::Xml {
                    position: self.reader.buffer_position(),
                    message: e.to_string(),
                })?;
                attrs.insert(key, value.into_owned());
            }

            let head = Head { name, attrs };
            return Ok(if is_empty { Tag::Empty(head) } else { Tag::Open(head) });
        }
    }

    /// Consume the rest of an element whose start tag was just read
    fn skip_element(&mut self) -> Result<(), ParseError> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_tag()? {
                Tag::Open(_) => depth += 1,
                Tag::Close => depth -= 1,
                Tag::Empty(_) => {}
                Tag::Eof => return Err(self.xml_error("unexpected end of document")),
            }
        }
        Ok(())
    }

    /// Build a message from an `error` element, reading its children if it has any
    fn read_error(&mut self, head: Head, has_children: bool) -> Result<Message, ParseError> {
        let id = head.get("id").ok_or_else(|| ParseError::MissingAttribute {
            element: ERROR_ELEMENT.to_string(),
            attribute: "id".to_string(),
        })?;
        let severity = head.get("severity");
        let msg = head.get("msg").unwrap_or_default();
        let verbose = head.get("verbose").unwrap_or_default();

        let mut location: Option<Location> = None;
        if has_children {
            let mut depth = 0usize;
            loop {
                match self.next_tag()? {
                    Tag::Open(child) => {
                        if depth == 0 && location.is_none() && child.name == LOCATION_ELEMENT {
                            location = Some(location_of(&child));
                        }
                        depth += 1;
                    }
                    Tag::Empty(child) => {
                        if depth == 0 && location.is_none() && child.name == LOCATION_ELEMENT {
                            location = Some(location_of(&child));
                        }
                    }
                    Tag::Close if depth == 0 => break,
                    Tag::Close => depth -= 1,
                    Tag::Eof => return Err(self.xml_error("unexpected end of document")),
                }
            }
        }

        Ok(match location {
            Some(location) => Message::located(id, severity, msg, verbose, location),
            None => Message::definition(id, severity, msg, verbose, head.get(REPLACEMENT_ATTRIBUTE)),
        })
    }

    fn step(&mut self) -> Result<Option<Message>, ParseError> {
        loop {
            match self.state {
                State::Done => return Ok(None),

                State::BeforeRoot => match self.next_tag()? {
                    Tag::Open(_) => self.state = State::InRoot,
                    Tag::Empty(_) => {
                        self.state = State::Done;
                        return Ok(None);
                    }
                    Tag::Close => return Err(self.xml_error("unexpected closing tag")),
                    Tag::Eof => {
                        return Err(ParseError::MalformedReport {
                            element: "(no root element)".to_string(),
                        })
                    }
                },

                State::InRoot => match self.next_tag()? {
                    Tag::Open(head) => match head.name.as_str() {
                        TOOL_ELEMENT => {
                            self.report_version(&head);
                            self.skip_element()?;
                        }
                        ERRORS_ELEMENT => self.state = State::InErrors,
                        ERROR_ELEMENT => return self.read_error(head, true).map(Some),
                        _ => return Err(ParseError::MalformedReport { element: head.name }),
                    },
                    Tag::Empty(head) => match head.name.as_str() {
                        TOOL_ELEMENT => self.report_version(&head),
                        ERRORS_ELEMENT => {}
                        ERROR_ELEMENT => return self.read_error(head, false).map(Some),
                        _ => return Err(ParseError::MalformedReport { element: head.name }),
                    },
                    Tag::Close => {
                        self.state = State::Done;
                        return Ok(None);
                    }
                    Tag::Eof => return Err(self.xml_error("unexpected end of document")),
                },

                State::InErrors => match self.next_tag()? {
                    Tag::Open(head) if head.name == ERROR_ELEMENT => {
                        return self.read_error(head, true).map(Some)
                    }
                    Tag::Empty(head) if head.name == ERROR_ELEMENT => {
                        return self.read_error(head, false).map(Some)
                    }
                    Tag::Open(_) => self.skip_element()?,
                    Tag::Empty(_) => {}
                    Tag::Close => self.state = State::InRoot,
                    Tag::Eof => return Err(self.xml_error("unexpected end of document")),
                },
            }
        }
    }

    fn report_version(&self, head: &Head) {
        if let Some(version) = head.get("version") {
            self.sink.info(&format!("Cppcheck version: {}", version));
        }
    }
}

fn location_of(head: &Head) -> Location {
    Location::new(head.get("file").unwrap_or_default(), head.get("line"))
}

impl<R: BufRead> Iterator for MessageStream<'_, R> {
    type Item = Result<Message, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(message)) => Some(Ok(message)),
            Ok(None) => None,
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::message::Payload;

    const WRAPPED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<results version="2">
  <cppcheck version="1.72"/>
  <errors>
    <error id="autoVariables" severity="error" msg="Assigning address of local auto-variable to a function parameter." verbose="Dangerous assignment - function parameter is assigned the address of a local auto-variable.">
      <location file="src/autoVariables/bad.c" line="4"/>
      <location file="src/autoVariables/other.c" line="9"/>
    </error>
    <error id="deallocDealloc" severity="error" msg="Deallocating a deallocated pointer" verbose="Deallocating a deallocated pointer: p" SonarQube="doubleFree"/>
  </errors>
</results>"#;

    const BARE: &str = r#"<results>
  <error id="autoVariables" severity="error" msg="Assigning address of local auto-variable to a function parameter." verbose="Dangerous assignment - function parameter is assigned the address of a local auto-variable.">
    <location file="src/autoVariables/bad.c" line="4"/>
    <location file="src/autoVariables/other.c" line="9"/>
  </error>
  <error id="deallocDealloc" severity="error" msg="Deallocating a deallocated pointer" verbose="Deallocating a deallocated pointer: p" SonarQube="doubleFree"/>
</results>"#;

    fn parse(xml: &str) -> Result<Vec<Message>, ParseError> {
        parse_reader(xml.as_bytes(), &MemorySink::new())
    }

    #[test]
    fn test_parse_wrapped_report() {
        let messages = parse(WRAPPED).unwrap();
        assert_eq!(messages.len(), 2);

        let first = &messages[0];
        assert_eq!(first.id, "autoVariables");
        assert_eq!(first.severity.as_deref(), Some("error"));
        assert!(first.verbose.starts_with("Dangerous assignment"));
        assert_eq!(first.filename(), Some("src/autoVariables/bad.c"));
        assert_eq!(first.line(), Some("4"));
        assert_eq!(first.replacement(), None);

        assert_eq!(messages[1].replacement(), Some("doubleFree"));
        assert!(messages[1].location().is_none());
    }

    #[test]
    fn test_shapes_yield_same_messages() {
        assert_eq!(parse(WRAPPED).unwrap(), parse(BARE).unwrap());
    }

    #[test]
    fn test_version_is_informational() {
        let sink = MemorySink::new();
        parse_reader(WRAPPED.as_bytes(), &sink).unwrap();
        assert_eq!(sink.infos(), vec!["Cppcheck version: 1.72".to_string()]);
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_location_wins_over_replacement() {
        let xml = r#"<results><errors>
            <error id="a" msg="m" verbose="v" SonarQube="b"><location file="x.c" line="1"/></error>
        </errors></results>"#;
        let messages = parse(xml).unwrap();
        assert!(matches!(messages[0].payload, Payload::Located(_)));
        assert_eq!(messages[0].replacement(), None);
    }

    #[test]
    fn test_location_without_line() {
        let xml = r#"<results><error id="a" msg="m" verbose="v"><location file="x.c"/></error></results>"#;
        let messages = parse(xml).unwrap();
        assert_eq!(messages[0].filename(), Some("x.c"));
        assert_eq!(messages[0].line(), None);
    }

    #[test]
    fn test_escaped_attributes() {
        let xml = r#"<results><error id="a" msg="a &lt; b &amp;&amp; &quot;c&quot;" verbose="v"/></results>"#;
        let messages = parse(xml).unwrap();
        assert_eq!(messages[0].msg, "a < b && \"c\"");
    }

    #[test]
    fn test_non_error_children_of_errors_are_skipped() {
        let xml = r#"<results><errors>
            <note><deep/></note>
            <error id="a" msg="m" verbose="v"><symbol>p</symbol></error>
        </errors></results>"#;
        let messages = parse(xml).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "a");
    }

    #[test]
    fn test_unexpected_top_level_element() {
        let xml = r#"<results><cppcheck version="1.72"/><warnings/></results>"#;
        match parse(xml) {
            Err(ParseError::MalformedReport { element }) => assert_eq!(element, "warnings"),
            other => panic!("expected MalformedReport, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_id() {
        let xml = r#"<results><error msg="m" verbose="v"/></results>"#;
        assert!(matches!(parse(xml), Err(ParseError::MissingAttribute { .. })));
    }

    #[test]
    fn test_empty_root() {
        assert!(parse("<results/>").unwrap().is_empty());
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(parse(""), Err(ParseError::MalformedReport { .. })));
    }

    #[test]
    fn test_truncated_document() {
        let xml = r#"<results><errors><error id="a" msg="m" verbose="v">"#;
        assert!(matches!(parse(xml), Err(ParseError::Xml { .. })));
    }

    #[test]
    fn test_stream_stops_after_error() {
        let xml = r#"<results><error id="a" msg="m" verbose="v"/><bogus/><error id="b" msg="m" verbose="v"/></results>"#;
        let sink = MemorySink::new();
        let items: Vec<_> = MessageStream::new(xml.as_bytes(), &sink).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_report_not_found() {
        let err = parse_file(Path::new("notfound.xml"), &MemorySink::new()).unwrap_err();
        assert!(matches!(err, ParseError::ReportNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "Cppcheck report not found or unreadable: notfound.xml"
        );
    }

    #[test]
    fn test_directory_is_not_a_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = parse_file(dir.path(), &MemorySink::new()).unwrap_err();
        assert!(matches!(err, ParseError::ReportNotFound { .. }));
    }
}
