//! Streaming record decoder for gzipped XML dump archives
//!
//! A dump archive is a single gzipped XML document whose root element wraps
//! one child element per record (`<artists><artist>…</artist>…</artists>`).
//! [`DumpReader`] decompresses and parses it incrementally, yielding one
//! [`Record`] tree at a time, so memory stays bounded regardless of archive
//! size.
//!
//! The stream is forward-only. Resuming at an offset is done with
//! [`DumpReader::skip_records`], which discards leading record subtrees
//! without building them: O(n) parse work, O(1) memory. The archive format
//! has no index, so there is no cheaper way back to a position.
//!
//! Whitespace-only text between elements is dropped; empty elements
//! (`<name/>`) come back as children with no text. The underlying file is
//! closed when the reader is dropped, including on early termination.

use crate::error::DecodeError;
use crate::record::Record;
use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Decompressed read-ahead; archives are multi-gigabyte, reads are hot.
const BUFFER_CAPACITY: usize = 1024 * 1024;

/// Where the cursor stands relative to the document's root element.
///
/// The decoder only ever pauses between records, so a parse position is fully
/// described by this state plus the reader's byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// Nothing read yet; the root element has not been seen.
    BeforeRoot,
    /// Inside the root element, between two record subtrees.
    InRoot,
    /// The root element has closed; only end-of-file is acceptable.
    AfterRoot,
    /// Clean end of stream reached.
    Finished,
    /// A decode error was reported; the stream is fused.
    Failed,
}

/// An in-flight record node being assembled from parse events
struct PartialNode {
    tag: String,
    attrs: BTreeMap<String, String>,
    children: Vec<Record>,
    text: String,
}

impl PartialNode {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, DecodeError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = BTreeMap::new();

        for item in start.attributes() {
            let attr = match item {
                Ok(attr) => attr,
                Err(err) => return Err(DecodeError::Malformed(err.to_string())),
            };
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(err) => return Err(DecodeError::Malformed(err.to_string())),
            };
            attrs.insert(key, value);
        }

        Ok(Self {
            tag,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn push_text(&mut self, piece: &str) {
        self.text.push_str(piece);
    }

    fn into_record(self) -> Record {
        Record {
            tag: self.tag,
            attrs: self.attrs,
            children: self.children,
            text: if self.text.is_empty() {
                None
            } else {
                Some(self.text)
            },
        }
    }
}

/// Streaming reader over one collection archive.
///
/// Implements `Iterator<Item = Result<Record, DecodeError>>`. After yielding
/// an error the iterator is fused and returns `None`; decode failures are not
/// recoverable mid-stream.
#[derive(Debug)]
pub struct DumpReader {
    reader: Reader<BufReader<GzDecoder<File>>>,
    buf: Vec<u8>,
    state: ReaderState,
    root_tag: Option<String>,
}

impl DumpReader {
    /// Open an archive for streaming.
    ///
    /// Only the file is opened here; gzip and XML framing problems surface on
    /// the first read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let file = File::open(path.as_ref())?;
        let buf_reader = BufReader::with_capacity(BUFFER_CAPACITY, GzDecoder::new(file));
        let mut reader = Reader::from_reader(buf_reader);

        let config = reader.config_mut();
        config.trim_text(true);
        config.expand_empty_elements = true;

        Ok(Self {
            reader,
            buf: Vec::with_capacity(8192),
            state: ReaderState::BeforeRoot,
            root_tag: None,
        })
    }

    /// Discard the next `count` records without materializing them.
    ///
    /// Used to resume at a checkpoint. Stops early without error if the
    /// stream ends first; the following `next()` then reports end of
    /// sequence.
    pub fn skip_records(&mut self, count: u64) -> Result<(), DecodeError> {
        for _ in 0..count {
            let Some(node) = self.seek_record()? else {
                break;
            };
            self.discard_subtree(&node.tag)?;
        }
        Ok(())
    }

    /// Advance to the opening tag of the next record, handling the root
    /// element and document framing on the way.
    ///
    /// Returns the record's own node (tag and attributes already parsed) with
    /// the cursor just past its start tag, or `None` at clean end of stream.
    fn seek_record(&mut self) -> Result<Option<PartialNode>, DecodeError> {
        if matches!(self.state, ReaderState::Finished | ReaderState::Failed) {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    self.state = ReaderState::Failed;
                    return Err(DecodeError::Malformed(err.to_string()));
                },
            };

            match event {
                Event::Start(start) => match self.state {
                    ReaderState::BeforeRoot => {
                        self.root_tag =
                            Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                        self.state = ReaderState::InRoot;
                    },
                    ReaderState::InRoot => {
                        return Ok(Some(PartialNode::from_start(&start)?));
                    },
                    _ => {
                        self.state = ReaderState::Failed;
                        return Err(DecodeError::OutsideRoot);
                    },
                },
                Event::End(_) => {
                    // Record end tags are consumed while reading subtrees, so
                    // an end seen here can only close the root element.
                    self.state = ReaderState::AfterRoot;
                },
                Event::Text(_) | Event::CData(_) => {
                    if self.state == ReaderState::AfterRoot {
                        self.state = ReaderState::Failed;
                        return Err(DecodeError::OutsideRoot);
                    }
                    // Stray text between records carries no record data.
                },
                Event::Eof => {
                    if self.state == ReaderState::InRoot {
                        self.state = ReaderState::Failed;
                        return Err(DecodeError::Truncated {
                            tag: self.root_tag.clone().unwrap_or_default(),
                        });
                    }
                    self.state = ReaderState::Finished;
                    return Ok(None);
                },
                // Declarations, comments, processing instructions, doctypes
                _ => {},
            }
        }
    }

    /// Assemble the record whose start tag `seek_record` just consumed
    fn read_subtree(&mut self, root: PartialNode) -> Result<Record, DecodeError> {
        let mut stack = vec![root];

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    self.state = ReaderState::Failed;
                    return Err(DecodeError::Malformed(err.to_string()));
                },
            };

            match event {
                Event::Start(start) => {
                    stack.push(PartialNode::from_start(&start)?);
                },
                Event::End(_) => {
                    // Name matching is enforced by the parser, so this end
                    // closes the innermost open node.
                    if let Some(node) = stack.pop() {
                        let record = node.into_record();
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(record),
                            None => return Ok(record),
                        }
                    }
                },
                Event::Text(text) => {
                    let piece = match text.unescape() {
                        Ok(piece) => piece,
                        Err(err) => {
                            self.state = ReaderState::Failed;
                            return Err(DecodeError::Malformed(err.to_string()));
                        },
                    };
                    if let Some(top) = stack.last_mut() {
                        top.push_text(&piece);
                    }
                },
                Event::CData(cdata) => {
                    let piece = match String::from_utf8(cdata.to_vec()) {
                        Ok(piece) => piece,
                        Err(err) => {
                            self.state = ReaderState::Failed;
                            return Err(DecodeError::Malformed(err.to_string()));
                        },
                    };
                    if let Some(top) = stack.last_mut() {
                        top.push_text(&piece);
                    }
                },
                Event::Eof => {
                    let tag = stack.last().map(|n| n.tag.clone()).unwrap_or_default();
                    self.state = ReaderState::Failed;
                    return Err(DecodeError::Truncated { tag });
                },
                _ => {},
            }
        }
    }

    /// Skip the body of the record whose start tag `seek_record` just
    /// consumed, without building nodes
    fn discard_subtree(&mut self, tag: &str) -> Result<(), DecodeError> {
        let mut scratch = Vec::new();
        match self
            .reader
            .read_to_end_into(QName(tag.as_bytes()), &mut scratch)
        {
            Ok(_) => Ok(()),
            Err(err) => {
                self.state = ReaderState::Failed;
                Err(DecodeError::Malformed(err.to_string()))
            },
        }
    }

    fn next_record(&mut self) -> Result<Option<Record>, DecodeError> {
        match self.seek_record()? {
            Some(node) => Ok(Some(self.read_subtree(node)?)),
            None => Ok(None),
        }
    }
}

impl Iterator for DumpReader {
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_gzip(dir: &Path, name: &str, xml: &str) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    }

    #[test]
    fn test_streams_records_in_archive_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "artists.xml.gz",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<artists>
  <artist>
    <id>1</id>
    <name>First &amp; Foremost</name>
    <aliases>
      <alias>One</alias>
      <alias>Uno</alias>
    </aliases>
  </artist>
  <artist>
    <id>2</id>
    <name>Second</name>
  </artist>
</artists>"#,
        );

        let reader = DumpReader::open(&path).unwrap();
        let records: Vec<Record> = reader.map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, "artist");
        assert_eq!(records[0].identifier(), Some("1"));
        assert_eq!(records[0].child_text("name"), Some("First & Foremost"));
        let aliases = records[0].child("aliases").unwrap();
        assert_eq!(
            aliases
                .children_named("alias")
                .filter_map(|a| a.text.as_deref())
                .collect::<Vec<_>>(),
            vec!["One", "Uno"]
        );
        assert_eq!(records[1].identifier(), Some("2"));
    }

    #[test]
    fn test_attributes_and_empty_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "releases.xml.gz",
            r#"<releases>
  <release id="10" status="Accepted">
    <title>A &lt;B&gt;</title>
    <notes/>
  </release>
</releases>"#,
        );

        let mut reader = DumpReader::open(&path).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.attr("id"), Some("10"));
        assert_eq!(record.attr("status"), Some("Accepted"));
        assert_eq!(record.child_text("title"), Some("A <B>"));
        let notes = record.child("notes").unwrap();
        assert!(notes.text.is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_skip_records_resumes_mid_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut xml = String::from("<labels>");
        for i in 0..10 {
            xml.push_str(&format!("<label><id>{i}</id></label>"));
        }
        xml.push_str("</labels>");
        let path = write_gzip(dir.path(), "labels.xml.gz", &xml);

        let mut reader = DumpReader::open(&path).unwrap();
        reader.skip_records(7).unwrap();
        let rest: Vec<String> = reader
            .map(|r| r.unwrap().identifier().unwrap().to_string())
            .collect();
        assert_eq!(rest, vec!["7", "8", "9"]);
    }

    #[test]
    fn test_skip_past_end_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "labels.xml.gz",
            "<labels><label><id>0</id></label></labels>",
        );

        let mut reader = DumpReader::open(&path).unwrap();
        reader.skip_records(5).unwrap();
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_empty_root_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(dir.path(), "artists.xml.gz", "<artists></artists>");
        let mut reader = DumpReader::open(&path).unwrap();
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_empty_payload_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(dir.path(), "artists.xml.gz", "");
        let mut reader = DumpReader::open(&path).unwrap();
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_archive_fails_and_fuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "artists.xml.gz",
            "<artists><artist><id>1</id></artist><artist><name>cut",
        );

        let mut reader = DumpReader::open(&path).unwrap();
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unclosed_root_is_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "artists.xml.gz",
            "<artists><artist><id>1</id></artist>",
        );

        let mut reader = DumpReader::open(&path).unwrap();
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { tag } if tag == "artists"));
    }

    #[test]
    fn test_content_after_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "artists.xml.gz",
            "<artists><artist><id>1</id></artist></artists><extra/>",
        );

        let mut reader = DumpReader::open(&path).unwrap();
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::OutsideRoot));
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip(
            dir.path(),
            "artists.xml.gz",
            "<artists><artist><id>1</name></artist></artists>",
        );

        let mut reader = DumpReader::open(&path).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_not_gzip_fails_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artists.xml.gz");
        std::fs::write(&path, "<artists></artists>").unwrap();

        let mut reader = DumpReader::open(&path).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_missing_file_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = DumpReader::open(dir.path().join("absent.xml.gz")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}
