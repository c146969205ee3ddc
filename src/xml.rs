//! XML well-formedness check and re-serialization.
//!
//! Documents are kept as the flat event stream `quick-xml` produces, which
//! is enough to check nesting and write the document back out.  Text,
//! attributes and comments come back byte for byte, as does a leading
//! UTF-8 BOM.  Whitespace inside end tags is not kept: `</a >` is written
//! as `</a>`.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("document ends with {depth} unclosed element(s)")]
    Unclosed { depth: usize },
    #[error("document has no root element")]
    NoRoot,
    #[error("XML write failed: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    events: Vec<Event<'static>>,
    /// The source started with a UTF-8 BOM, which the reader skips.
    bom:    bool,
}

impl XmlDocument {
    pub fn events(&self) -> &[Event<'static>] {
        &self.events
    }

    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Name of the first top-level element.
    pub fn root_name(&self) -> Option<String> {
        self.events.iter().find_map(|e| match e {
            Event::Start(tag) | Event::Empty(tag) => {
                Some(String::from_utf8_lossy(tag.name().as_ref()).into_owned())
            }
            _ => None,
        })
    }
}

/// Parse `bytes`, requiring balanced elements and at least one root.
pub fn parse(bytes: &[u8]) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_reader(bytes);
    let mut events = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message:  e.to_string(),
        })?;
        match &event {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        events.push(event.into_owned());
    }

    if depth != 0 {
        return Err(XmlError::Unclosed { depth });
    }
    if roots == 0 {
        return Err(XmlError::NoRoot);
    }
    Ok(XmlDocument { events, bom: bytes.starts_with(UTF8_BOM) })
}

pub fn serialize(document: &XmlDocument) -> Result<Vec<u8>, XmlError> {
    let mut out = Vec::new();
    if document.bom {
        out.extend_from_slice(UTF8_BOM);
    }
    let mut writer = Writer::new(out);
    for event in &document.events {
        writer
            .write_event(event.borrow())
            .map_err(|e| XmlError::Write(e.to_string()))?;
    }
    Ok(writer.into_inner())
}
