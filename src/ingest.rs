//! Ingest loop: drain the stream, decode, print
//!
//! One line per flow, written to the supplied sink. The loop only ever
//! stops because the stream closed; malformed records and transient read
//! errors are logged and skipped.

use std::io::Write;

use log::{debug, warn};

use crate::codec;
use crate::stream::{FlowEventStream, RecordSource};

pub struct IngestLoop<S, W> {
    stream: FlowEventStream<S>,
    out: W,
}

impl<S, W> IngestLoop<S, W>
where
    S: RecordSource,
    W: Write + Send,
{
    pub fn new(stream: FlowEventStream<S>, out: W) -> Self {
        Self { stream, out }
    }

    /// Run until the stream reports closed.
    pub async fn run(mut self) {
        loop {
            match self.stream.next().await {
                Ok(Some(bytes)) => self.emit(&bytes),
                Ok(None) => {
                    debug!("Flow event stream closed, stopping ingest");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read flow event: {}", e);
                }
            }
        }
    }

    fn emit(&mut self, bytes: &[u8]) {
        let event = match codec::decode(bytes) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed flow record: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(self.out, "{}", event) {
            warn!("Failed to write flow event: {}", e);
        }
    }
}
