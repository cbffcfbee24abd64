//! A scripted [`ModelGateway`] for tests and offline runs.
//!
//! Records every request it receives and answers from a script instead of
//! the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::{ModelGateway, ModelReply, ModelRequest};

type Responder = Box<dyn Fn(&ModelRequest) -> Result<ModelReply, GatewayError> + Send + Sync>;

pub struct ScriptedGateway {
    responder: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedGateway {
    /// Answers every call with `reply`.
    pub fn replying(reply: ModelReply) -> Self {
        Self::with(move |_| Ok(reply.clone()))
    }

    /// Fails every call with the error `make` produces.
    pub fn failing<F>(make: F) -> Self
    where
        F: Fn() -> GatewayError + Send + Sync + 'static,
    {
        Self::with(move |_| Err(make()))
    }

    /// Computes each answer from the request.
    pub fn with<F>(responder: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelReply, GatewayError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests().pop()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}
