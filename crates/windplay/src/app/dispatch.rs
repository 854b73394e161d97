//! Sends generation requests on the runtime and returns tagged responses over a channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::coordinator::{GenerationOutcome, GenerationRequest, GenerationResponse};
use crate::infra::generation::GenerationService;

#[derive(Clone)]
pub struct RequestDispatcher {
    service: Arc<dyn GenerationService>,
    responses: mpsc::UnboundedSender<GenerationResponse>,
}

impl RequestDispatcher {
    /// Create a dispatcher together with the receiving end for its responses.
    pub fn new(
        service: Arc<dyn GenerationService>,
    ) -> (Self, mpsc::UnboundedReceiver<GenerationResponse>) {
        let (responses, rx) = mpsc::unbounded_channel();
        (Self { service, responses }, rx)
    }

    /// Spawn the request. Outstanding requests are never cancelled; the coordinator discards
    /// whatever arrives for superseded input.
    pub fn dispatch(&self, request: GenerationRequest) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let responses = self.responses.clone();
        tokio::spawn(async move {
            let outcome = execute(service.as_ref(), &request).await;
            if responses
                .send(GenerationResponse::new(request.id, outcome))
                .is_err()
            {
                tracing::debug!(request = %request.id, "response receiver dropped");
            }
        })
    }
}

/// Run one request to completion and classify the result.
pub async fn execute(
    service: &dyn GenerationService,
    request: &GenerationRequest,
) -> GenerationOutcome {
    match service.generate(request.target(), request.body()).await {
        Ok(Some(result)) => GenerationOutcome::Generated(result),
        Ok(None) => GenerationOutcome::Empty,
        Err(err) => GenerationOutcome::Failed(format!("{:#}", anyhow::Error::new(err))),
    }
}
