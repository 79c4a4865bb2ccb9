//! Coordinated teardown of the probe pipeline
//!
//! Shutdown runs the acquisition steps in reverse: close the stream, wait
//! for the ingest loop to drain out, then release the probe. The sequence
//! runs at most once no matter how often it is requested.

use std::future::Future;

use log::{info, warn};
use tokio::task::JoinHandle;

use crate::probe::Probe;
use crate::stream::StreamHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    ShuttingDown,
}

pub struct ShutdownCoordinator<P> {
    state: State,
    stream: StreamHandle,
    ingest: Option<JoinHandle<()>>,
    probe: P,
}

impl<P: Probe> ShutdownCoordinator<P> {
    pub fn new(probe: P, stream: StreamHandle, ingest: JoinHandle<()>) -> Self {
        Self {
            state: State::Running,
            stream,
            ingest: Some(ingest),
            probe,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Wait for `signal`, then tear the pipeline down.
    pub async fn run(mut self, signal: impl Future<Output = ()>) {
        signal.await;
        info!("Shutdown signal received");
        self.shutdown().await;
    }

    /// Run the shutdown sequence. Later calls are no-ops.
    pub async fn shutdown(&mut self) {
        if self.state == State::ShuttingDown {
            return;
        }
        self.state = State::ShuttingDown;

        self.stream.close();

        if let Some(ingest) = self.ingest.take() {
            if let Err(e) = ingest.await {
                warn!("Ingest task ended abnormally: {}", e);
            }
        }

        self.probe.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::stream::{FlowEventStream, RecordSource};
    use crate::Result;

    struct NeverSource;

    #[async_trait]
    impl RecordSource for NeverSource {
        async fn recv(&mut self) -> io::Result<Vec<u8>> {
            std::future::pending().await
        }
    }

    struct MockProbe {
        attached: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Probe for MockProbe {
        type Source = NeverSource;

        async fn attach(&mut self, _interface: &str) -> Result<()> {
            self.attached = true;
            Ok(())
        }

        async fn open_stream(&mut self) -> Result<Self::Source> {
            Ok(NeverSource)
        }

        async fn release(&mut self) {
            self.attached = false;
            self.log.lock().unwrap().push("probe-released");
        }

        fn is_attached(&self) -> bool {
            self.attached
        }
    }

    fn pipeline(log: &Arc<Mutex<Vec<&'static str>>>) -> ShutdownCoordinator<MockProbe> {
        let probe = MockProbe {
            attached: true,
            log: Arc::clone(log),
        };

        let (mut stream, handle) = FlowEventStream::open(NeverSource);
        let task_log = Arc::clone(log);
        let ingest = tokio::spawn(async move {
            while let Ok(Some(_)) = stream.next().await {}
            task_log.lock().unwrap().push("stream-closed");
        });

        ShutdownCoordinator::new(probe, handle, ingest)
    }

    #[tokio::test]
    async fn tears_down_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = pipeline(&log);

        assert_eq!(coordinator.state(), State::Running);

        tokio::time::timeout(Duration::from_secs(5), coordinator.shutdown())
            .await
            .expect("shutdown did not finish");

        assert_eq!(coordinator.state(), State::ShuttingDown);
        assert_eq!(*log.lock().unwrap(), vec!["stream-closed", "probe-released"]);
        assert!(!coordinator.probe.is_attached());
    }

    #[tokio::test]
    async fn shutdown_runs_at_most_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = pipeline(&log);

        coordinator.shutdown().await;
        coordinator.shutdown().await;

        assert_eq!(*log.lock().unwrap(), vec!["stream-closed", "probe-released"]);
    }

    #[tokio::test]
    async fn run_waits_for_the_signal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = pipeline(&log);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn(coordinator.run(async {
            let _ = stop_rx.await;
        }));

        tokio::task::yield_now().await;
        assert!(log.lock().unwrap().is_empty());

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("run did not finish after the signal")
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["stream-closed", "probe-released"]);
    }
}
