//! Dedup, ordering and writing of one result batch.

use super::dedup::DedupWindow;
use crate::format::FormatEntry;
use crate::search::SearchResult;
use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Stdout, Write},
    path::Path,
};
use tracing::debug;

/// Destination of rendered entries; files are appended to, never truncated
pub enum OutputSink {
    Stdout(Stdout),
    File(BufWriter<File>),
}

impl OutputSink {
    pub fn stdout() -> Self {
        OutputSink::Stdout(io::stdout())
    }

    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(OutputSink::File(BufWriter::new(file)))
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout(out) => out.write(buf),
            OutputSink::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout(out) => out.flush(),
            OutputSink::File(file) => file.flush(),
        }
    }
}

/// Writes results through a formatter, skipping ids already printed
pub struct LogPrinter<F, W: Write> {
    formatter: F,
    sink: W,
    dedup: DedupWindow,
}

impl<F: FormatEntry, W: Write> LogPrinter<F, W> {
    pub fn new(formatter: F, sink: W) -> Self {
        Self { formatter, sink, dedup: DedupWindow::new() }
    }

    /// Format unseen entries, reverse them into chronological order and write
    /// them out. Returns the number of lines written.
    ///
    /// Entries without an id are always printed.
    pub fn print_result(&mut self, result: &SearchResult) -> io::Result<usize> {
        let mut lines = Vec::with_capacity(result.entries.len());
        for entry in &result.entries {
            match entry.id() {
                Some(id) if self.dedup.seen(id) => continue,
                Some(id) => {
                    lines.push(self.formatter.format(entry));
                    self.dedup.record(id);
                },
                None => lines.push(self.formatter.format(entry)),
            }
        }

        // Server order is newest first
        lines.reverse();

        for line in &lines {
            writeln!(self.sink, "{}", line)?;
        }
        self.sink.flush()?;

        debug!("Printed {} of {} entries", lines.len(), result.entries.len());
        Ok(lines.len())
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Flush and hand back the sink
    pub fn into_sink(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::LogEntry;
    use serde_json::{Value, json};

    fn result(ids: &[&str]) -> SearchResult {
        SearchResult {
            query: "*".to_string(),
            entries: ids
                .iter()
                .map(|id| {
                    LogEntry::new(json!({"_id": id, "message": id}).as_object().unwrap().clone())
                })
                .collect(),
            total_results: ids.len() as u64,
            from: None,
            to: None,
            elapsed_ms: None,
            used_indices: Value::Null,
            fields: vec![],
        }
    }

    fn message(entry: &LogEntry) -> String {
        entry.message().to_string()
    }

    #[test]
    fn newest_first_results_are_printed_oldest_first() {
        let mut printer = LogPrinter::new(message, Vec::new());
        assert_eq!(printer.print_result(&result(&["e3", "e2", "e1"])).unwrap(), 3);
        assert_eq!(String::from_utf8(printer.into_sink().unwrap()).unwrap(), "e1\ne2\ne3\n");
    }

    #[test]
    fn already_printed_entries_are_skipped() {
        let mut printer = LogPrinter::new(message, Vec::new());
        printer.print_result(&result(&["e2", "e1"])).unwrap();
        assert_eq!(printer.print_result(&result(&["e3", "e2"])).unwrap(), 1);
        assert_eq!(String::from_utf8(printer.sink().clone()).unwrap(), "e1\ne2\ne3\n");
    }

    #[test]
    fn entries_without_id_are_never_suppressed() {
        let mut printer = LogPrinter::new(message, Vec::new());
        let anonymous = LogEntry::new(json!({"message": "anon"}).as_object().unwrap().clone());
        let mut batch = result(&[]);
        batch.entries = vec![anonymous.clone(), anonymous];

        assert_eq!(printer.print_result(&batch).unwrap(), 2);
        assert_eq!(printer.print_result(&batch).unwrap(), 2);
    }

    #[test]
    fn file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, "existing\n").unwrap();

        let mut printer = LogPrinter::new(message, OutputSink::append_to(&path).unwrap());
        printer.print_result(&result(&["b", "a"])).unwrap();
        drop(printer);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\na\nb\n");
    }
}
