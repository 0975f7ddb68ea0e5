use super::{GraphSink, Record, Stream};
use crate::error::Error;
use npmgraph_util::fs::{ensure_parent_dir, first_existing};
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

type Writer = ::csv::Writer<BufWriter<File>>;

/// Writes one CSV file per stream for `neo4j-admin import`.
#[derive(Debug)]
pub struct CsvSink {
    root: PathBuf,
    /// Indexed like [`Stream::ALL`].
    writers: Vec<Writer>,
}

impl CsvSink {
    /// Create every output file below `root` and write the headers.
    ///
    /// # Errors
    /// Returns [`Error::OutputExists`] if any target file is already present,
    /// before anything is created.
    pub fn create(root: &Path) -> Result<Self, Error> {
        let paths: Vec<PathBuf> = Stream::ALL
            .iter()
            .map(|stream| root.join(stream.relative_path()))
            .collect();

        if let Some(existing) = first_existing(paths.iter().map(PathBuf::as_path)) {
            return Err(Error::OutputExists {
                path: existing.to_path_buf(),
            });
        }

        let mut writers = Vec::with_capacity(paths.len());
        for (stream, path) in Stream::ALL.into_iter().zip(&paths) {
            ensure_parent_dir(path)?;
            let file = OpenOptions::new().write(true).create_new(true).open(path)?;
            let mut writer = ::csv::WriterBuilder::new().from_writer(BufWriter::new(file));
            writer
                .write_record(stream.header())
                .map_err(|source| sink_error(stream, source))?;
            writers.push(writer);
        }

        tracing::debug!(root = %root.display(), files = writers.len(), "Created CSV output");
        Ok(Self {
            root: root.to_path_buf(),
            writers,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn sink_error(stream: Stream, source: ::csv::Error) -> Error {
    Error::SinkWrite {
        stream: stream.name(),
        source,
    }
}

impl GraphSink for CsvSink {
    fn write(&mut self, record: Record<'_>) -> Result<(), Error> {
        let stream = record.stream();
        self.writers[stream.index()]
            .write_record(record.fields().iter().map(|f| f.as_bytes()))
            .map_err(|source| sink_error(stream, source))
    }

    fn finish(&mut self) -> Result<(), Error> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        tracing::debug!(root = %self.root.display(), "Flushed CSV output");
        Ok(())
    }
}
