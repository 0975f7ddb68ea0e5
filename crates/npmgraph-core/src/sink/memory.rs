use super::{GraphSink, Record, Stream};
use crate::error::Error;

/// Keeps every row in memory, per stream.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    rows: [Vec<Vec<String>>; Stream::ALL.len()],
    finished: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows written to `stream`, in write order.
    #[must_use]
    pub fn rows(&self, stream: Stream) -> &[Vec<String>] {
        &self.rows[stream.index()]
    }

    /// Number of rows written to `stream`.
    #[must_use]
    pub fn count(&self, stream: Stream) -> usize {
        self.rows[stream.index()].len()
    }

    /// Whether a row equal to `fields` was written to `stream`.
    #[must_use]
    pub fn contains(&self, stream: Stream, fields: &[&str]) -> bool {
        self.rows(stream).iter().any(|row| row == fields)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl GraphSink for MemorySink {
    fn write(&mut self, record: Record<'_>) -> Result<(), Error> {
        let row = record.fields().into_iter().map(|f| f.into_owned()).collect();
        self.rows[record.stream().index()].push(row);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.finished = true;
        Ok(())
    }
}
