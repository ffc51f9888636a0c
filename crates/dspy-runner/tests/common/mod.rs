#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dspy_runner::{
    CompletionProvider, CompletionRequest, CompletionResponse, LmError, LmUsage, Message,
};

type Respond = dyn Fn(&CompletionRequest) -> Result<Message, LmError> + Send + Sync;

/// A backend whose replies are computed from the request.
///
/// Records every request it sees and the highest number of requests that
/// were outstanding at the same time.
pub struct ScriptedProvider {
    respond: Box<Respond>,
    requests: Mutex<Vec<CompletionRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        respond: impl Fn(&CompletionRequest) -> Result<Message, LmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answers every request with the last user message, prefixed.
    pub fn echo(prefix: &'static str) -> Self {
        Self::new(move |request| Ok(Message::assistant(format!("{prefix}{}", last_user(request)))))
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LmError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        // Let the other conversations make progress while this one is "on the wire".
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let reply = (self.respond)(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        reply.map(|message| CompletionResponse {
            message,
            usage: LmUsage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: 12,
                reasoning_tokens: None,
            },
        })
    }
}

pub fn last_user(request: &CompletionRequest) -> String {
    request
        .last_user_message()
        .map(|message| message.content().to_string())
        .unwrap_or_default()
}

pub fn transport_error() -> LmError {
    LmError::RateLimit {
        message: "slow down".to_string(),
    }
}
