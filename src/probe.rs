//! Probe trait seam between the pipeline and the kernel

use async_trait::async_trait;

use crate::stream::RecordSource;
use crate::Result;

/// Lifecycle of an attached packet probe.
///
/// The production implementation drives an XDP program; tests substitute
/// in-memory fakes so the pipeline can run without a kernel.
#[async_trait]
pub trait Probe: Send {
    type Source: RecordSource;

    /// Attach the probe to `interface`. Attaching an already attached
    /// probe is a no-op.
    async fn attach(&mut self, interface: &str) -> Result<()>;

    /// Hand out the stream of raw flow records. Single-shot; the probe
    /// gives up ownership of its ring buffer.
    async fn open_stream(&mut self) -> Result<Self::Source>;

    /// Undo the interface attachment. Idempotent; failures are logged,
    /// never surfaced, so shutdown can always make progress.
    async fn release(&mut self);

    fn is_attached(&self) -> bool;
}
