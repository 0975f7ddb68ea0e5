//! Incremental reading of `{ total_rows, rows: [{ doc }] }` snapshots.
//!
//! A parser thread walks the input with `serde_json`'s streaming deserializer
//! and hands each row over a bounded channel. When the channel is full the
//! parser blocks, so a slow consumer throttles input reading instead of
//! letting rows pile up in memory.

use crate::error::Error;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::error::Category;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

/// One entry of the `rows` array.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Document(Value),
    /// A row whose `doc` is absent or null (deleted packages).
    WithoutDoc { id: Option<String> },
}

#[derive(Debug)]
enum Event {
    TotalRows(u64),
    Row(Row),
    Failed(serde_json::Error),
}

/// Lazy, single-pass sequence of snapshot rows in input order.
#[derive(Debug)]
pub struct DocumentStream {
    receiver: Receiver<Event>,
    parser: Option<JoinHandle<()>>,
    total_rows: Option<u64>,
    last_id: Option<String>,
    rows: u64,
    done: bool,
}

impl DocumentStream {
    /// Open a snapshot file (plain or gzip) and start parsing it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the parser thread
    /// cannot be started.
    pub fn open(path: &Path, capacity: usize) -> Result<Self, Error> {
        let reader = npmgraph_util::fs::open_snapshot(path).map_err(|source| Error::SnapshotOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::spawn(reader, capacity)
    }

    /// Start parsing `reader` on a background thread.
    ///
    /// At most `capacity` rows are buffered ahead of the consumer.
    ///
    /// # Errors
    /// Returns an error if the parser thread cannot be started.
    pub fn spawn<R>(reader: R, capacity: usize) -> Result<Self, Error>
    where
        R: Read + Send + 'static,
    {
        let (sender, receiver) = sync_channel(capacity.max(1));
        let parser = thread::Builder::new()
            .name("snapshot-parser".to_string())
            .spawn(move || parse(reader, &sender))?;

        Ok(Self {
            receiver,
            parser: Some(parser),
            total_rows: None,
            last_id: None,
            rows: 0,
            done: false,
        })
    }

    /// `total_rows` from the snapshot header, once it has been read.
    #[must_use]
    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows
    }

    /// Rows yielded so far.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    /// Id of the last document yielded.
    #[must_use]
    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    fn fatal(&self, source: serde_json::Error) -> Error {
        match source.classify() {
            Category::Io => Error::Io(source.into()),
            Category::Data => Error::SnapshotShape {
                after: self.last_id.clone(),
                source,
            },
            Category::Syntax | Category::Eof => Error::SnapshotParse {
                after: self.last_id.clone(),
                source,
            },
        }
    }

    fn parser_panicked(&mut self) -> bool {
        self.parser
            .take()
            .is_some_and(|handle| handle.join().is_err())
    }
}

impl Iterator for DocumentStream {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.receiver.recv() {
                Ok(Event::TotalRows(total)) => self.total_rows = Some(total),
                Ok(Event::Row(row)) => {
                    self.rows += 1;
                    if let Row::Document(doc) = &row {
                        if let Some(id) = doc.get("_id").and_then(Value::as_str) {
                            self.last_id = Some(id.to_string());
                        }
                    }
                    return Some(Ok(row));
                }
                Ok(Event::Failed(source)) => {
                    self.done = true;
                    return Some(Err(self.fatal(source)));
                }
                Err(_) => {
                    self.done = true;
                    if self.parser_panicked() {
                        return Some(Err(Error::other("snapshot parser thread panicked")));
                    }
                }
            }
        }
        None
    }
}

fn parse<R: Read>(reader: R, sender: &SyncSender<Event>) {
    let closed = Cell::new(false);
    let mut de = serde_json::Deserializer::from_reader(reader);
    let result = Snapshot {
        sender,
        closed: &closed,
    }
    .deserialize(&mut de)
    .and_then(|()| de.end());

    match result {
        Ok(()) => {}
        // Consumer went away; nothing left to report to.
        Err(_) if closed.get() => tracing::trace!("snapshot consumer dropped, parser stopping"),
        Err(e) => {
            let _ = sender.send(Event::Failed(e));
        }
    }
}

#[derive(Clone, Copy)]
struct Snapshot<'a> {
    sender: &'a SyncSender<Event>,
    closed: &'a Cell<bool>,
}

impl Snapshot<'_> {
    fn send<E: de::Error>(self, event: Event) -> Result<(), E> {
        self.sender.send(event).map_err(|_| {
            self.closed.set(true);
            E::custom("snapshot consumer dropped")
        })
    }
}

impl<'de> DeserializeSeed<'de> for Snapshot<'_> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for Snapshot<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a `rows` array")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let mut saw_rows = false;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "total_rows" => {
                    if let Some(total) = map.next_value::<Option<u64>>()? {
                        self.send(Event::TotalRows(total))?;
                    }
                }
                "rows" => {
                    map.next_value_seed(Rows(self))?;
                    saw_rows = true;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        if !saw_rows {
            return Err(de::Error::missing_field("rows"));
        }
        Ok(())
    }
}

struct Rows<'a>(Snapshot<'a>);

#[derive(Deserialize)]
struct RawRow {
    id: Option<String>,
    doc: Option<Value>,
}

impl<'de> DeserializeSeed<'de> for Rows<'_> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Rows<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of rows")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(row) = seq.next_element::<RawRow>()? {
            let row = match row.doc {
                Some(doc) if !doc.is_null() => Row::Document(doc),
                _ => Row::WithoutDoc { id: row.id },
            };
            self.0.send(Event::Row(row))?;
        }
        Ok(())
    }
}
