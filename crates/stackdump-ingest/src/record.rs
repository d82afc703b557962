//! One dump line to one sparse attribute set
//!
//! Dump files hold one `<row .../>` element per line, wrapped in an XML
//! declaration and a root element:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <badges>
//!   <row Id="1" UserId="7" Name="Teacher" Date="2021-01-01T00:00:00.000" Class="3" TagBased="False" />
//! </badges>
//! ```
//!
//! Blank lines and envelope lines parse to `None`. A `row` element parses to
//! a [`Record`] whose attribute names are lower-cased and whose values are
//! entity-unescaped but otherwise raw text.

use crate::error::RecordError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const RECORD_ELEMENT: &[u8] = b"row";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Attribute set of one source record, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    attributes: Vec<(String, String)>,
}

impl Record {
    /// Build a record from name/value pairs; names are taken as given
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

/// Parse one source line.
///
/// Returns `Ok(None)` for lines that carry no record: whitespace, the XML
/// declaration (with or without a leading byte order mark), comments, and
/// the root element's open and close tags.
pub fn parse(line: &str) -> Result<Option<Record>, RecordError> {
    let trimmed = line.trim_start_matches(BYTE_ORDER_MARK).trim();
    if trimmed.is_empty() || is_lone_end_tag(trimmed) {
        return Ok(None);
    }

    let mut reader = Reader::from_str(trimmed);
    let mut record = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                if element.name().as_ref() == RECORD_ELEMENT {
                    if record.is_some() {
                        return Err(RecordError::unparsable("more than one row element"));
                    }
                    record = Some(read_attributes(&element)?);
                } else if record.is_some() || element.attributes().next().is_some() {
                    return Err(RecordError::unparsable(format!(
                        "unexpected element <{}>",
                        String::from_utf8_lossy(element.name().as_ref())
                    )));
                }
            },
            Ok(Event::Text(text)) => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(RecordError::unparsable("text outside of an element"));
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => {
                return Err(RecordError::unparsable(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            },
        }
    }

    Ok(record)
}

/// `</badges>` on its own line; the reader would reject it as unmatched
fn is_lone_end_tag(line: &str) -> bool {
    line.starts_with("</") && line.ends_with('>') && line[1..].find('<').is_none()
}

fn read_attributes(element: &BytesStart<'_>) -> Result<Record, RecordError> {
    let mut attributes: Vec<(String, String)> = Vec::new();

    for attr in element.attributes() {
        let attr = attr.map_err(|e| RecordError::unparsable(e.to_string()))?;

        let name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| RecordError::unparsable(format!("attribute name: {}", e)))?
            .to_lowercase();

        if attributes.iter().any(|(k, _)| *k == name) {
            return Err(RecordError::unparsable(format!("duplicate attribute '{}'", name)));
        }

        let value = attr
            .unescape_value()
            .map_err(|e| RecordError::unparsable(format!("attribute '{}': {}", name, e)))?
            .into_owned();

        attributes.push((name, value));
    }

    Ok(Record { attributes })
}
