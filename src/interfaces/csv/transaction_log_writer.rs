use crate::domain::ports::{TransactionLog, TransactionLogEntry};
use crate::error::Result;
use async_trait::async_trait;
use std::io::Write;
use tokio::sync::Mutex;

/// Writes transaction log entries as CSV rows.
///
/// The column set is fixed when the log is created, normally from
/// `LogColumns::names`. Each row follows that order, with blanks for columns
/// an entry lacks; keys outside the set are ignored.
pub struct CsvTransactionLog<W: Write + Send> {
    inner: Mutex<CsvState<W>>,
}

struct CsvState<W: Write> {
    writer: csv::Writer<W>,
    columns: Vec<String>,
    header_pending: bool,
}

impl<W: Write + Send> CsvTransactionLog<W> {
    /// Creates a log over a fresh sink; the header precedes the first row.
    pub fn new(sink: W, columns: Vec<String>) -> Self {
        Self::build(sink, columns, true)
    }

    /// Creates a log over a sink that already starts with the header, such
    /// as a non-empty file opened for append.
    pub fn appending(sink: W, columns: Vec<String>) -> Self {
        Self::build(sink, columns, false)
    }

    fn build(sink: W, columns: Vec<String>, header_pending: bool) -> Self {
        let writer = csv::WriterBuilder::new().from_writer(sink);
        Self {
            inner: Mutex::new(CsvState {
                writer,
                columns,
                header_pending,
            }),
        }
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        let state = self.inner.into_inner();
        state
            .writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}

#[async_trait]
impl<W: Write + Send> TransactionLog for CsvTransactionLog<W> {
    async fn record(&self, entry: TransactionLogEntry) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        if state.header_pending {
            state.writer.write_record(&state.columns)?;
            state.header_pending = false;
        }
        let row: Vec<&str> = state
            .columns
            .iter()
            .map(|column| entry.get(column).map(String::as_str).unwrap_or_default())
            .collect();
        state.writer.write_record(&row)?;
        state.writer.flush()?;
        Ok(())
    }
}
