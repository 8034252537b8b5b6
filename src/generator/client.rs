use crate::event::AppEvent;
use crate::generator::TokioRunner;
use crate::session::builder::{GenerationRequest, SessionBuilder};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use tokio::runtime::Handle;
use tracing::{error, info};

#[derive(Clone)]
pub struct GeneratorClient {
    tx: mpsc::Sender<AppEvent>,
    builder: Arc<SessionBuilder<TokioRunner>>,
    runtime_handle: Handle,
    busy: Arc<AtomicBool>,
}

impl GeneratorClient {
    pub fn new(
        runtime_handle: Handle,
        tx: mpsc::Sender<AppEvent>,
        builder: SessionBuilder<TokioRunner>,
    ) -> Self {
        Self {
            tx,
            builder: Arc::new(builder),
            runtime_handle,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn data_root(&self) -> &Path {
        self.builder.data_root()
    }

    pub fn output_extensions(&self) -> &[String] {
        &self.builder.settings().output_extensions
    }

    /// Returns `false` without doing anything while another request runs.
    pub fn submit(&self, request: GenerationRequest) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        if self.tx.send(AppEvent::GenerationStarted).is_err() {
            error!("event channel closed before generation start was delivered");
        }
        let tx = self.tx.clone();
        let builder = Arc::clone(&self.builder);
        let busy = Arc::clone(&self.busy);

        self.runtime_handle.spawn(async move {
            let outcome = builder.run(&request).await;
            match &outcome {
                Ok(success) => info!(session = %success.session_id, "generation finished"),
                Err(err) => error!("generation failed: {err}"),
            }
            busy.store(false, Ordering::SeqCst);
            if tx.send(AppEvent::GenerationFinished(outcome)).is_err() {
                error!("event channel closed before generation result was delivered");
            }
        });

        true
    }
}
