//! Input source
//!
//! Serves pre-loaded records in fixed-size batches on `ReadRequest`. An empty
//! batch tells the requester the input is exhausted.

use crate::actor::{Actor, Context};
use crate::error::{Error, Result};
use crate::message::Envelope;
use crate::protocol::{Message, Record};
use std::collections::VecDeque;
use std::io::BufRead;

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Field separator of the text input format
pub const FIELD_SEPARATOR: char = ';';

/// Source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Records per `Batch`
    pub batch_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SourceConfig {
    /// Create a new source configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }
}

/// Parse `;`-separated rows. The first line is a header and is skipped, as
/// are blank lines.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for line in reader.lines().skip(1) {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        records.push(line.split(FIELD_SEPARATOR).map(str::to_string).collect());
    }
    Ok(records)
}

/// Actor that hands out records in batches
pub struct LineSource {
    records: VecDeque<Record>,
    config: SourceConfig,
}

impl LineSource {
    /// Source over `records`
    pub fn new(records: Vec<Record>, config: SourceConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        Ok(Self {
            records: records.into(),
            config,
        })
    }
}

impl Actor for LineSource {
    type State = usize;
    type Message = Message;

    fn init(&mut self, ctx: &mut Context<Message>) -> Result<usize> {
        tracing::debug!(source = ctx.id(), records = self.records.len(), "source ready");
        Ok(0)
    }

    fn handle_message(
        &mut self,
        served: &mut usize,
        message: Envelope<Message>,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        match message.payload {
            Message::ReadRequest => {
                let requester = message.source.ok_or(Error::MissingSender("ReadRequest"))?;
                let take = self.config.batch_size.min(self.records.len());
                let batch: Vec<Record> = self.records.drain(..take).collect();
                *served += batch.len();
                tracing::debug!(rows = batch.len(), served = *served, "serving batch");
                ctx.send(requester, Message::Batch(batch))
            }
            Message::Terminated(_) => Ok(()),
            other => {
                tracing::debug!(kind = other.kind(), "ignoring message");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_after_header() {
        let text = "ID;Name;PasswordChars;PasswordLength;Password;Hint1\r\n\
                    1;Sophia;ABC;3;aa;bb\r\n\
                    \r\n\
                    2;Jackson;ABC;3;cc;dd\n";
        let records = parse_records(text.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ["1", "Sophia", "ABC", "3", "aa", "bb"]);
        assert_eq!(records[1][1], "Jackson");
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(parse_records("".as_bytes()).unwrap().is_empty());
        assert!(parse_records("header only\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = LineSource::new(Vec::new(), SourceConfig::new().with_batch_size(0));
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }
}
