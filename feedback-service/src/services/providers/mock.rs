//! Mock completion provider for testing.

use super::{CompletionProvider, CompletionRequest, ProviderError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Reply {
    Text(String),
    ApiError { status: u16, body: String },
    Empty,
    Panic(&'static str),
}

/// Replies with canned output and records every request it receives.
pub struct MockCompletionProvider {
    reply: Reply,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletionProvider {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answer every call with `text` as the model output.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Text(text.into()))
    }

    /// Answer every call with an upstream API error.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        Self::with_reply(Reply::ApiError {
            status,
            body: body.into(),
        })
    }

    /// Answer every call with a payload that has no output text.
    pub fn empty() -> Self {
        Self::with_reply(Reply::Empty)
    }

    /// Panic on every call.
    pub fn panicking(message: &'static str) -> Self {
        Self::with_reply(Reply::Panic(message))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::ApiError { status, body } => Err(ProviderError::Api {
                status: *status,
                body: body.clone(),
            }),
            Reply::Empty => Err(ProviderError::EmptyOutput),
            Reply::Panic(message) => panic!("{}", message),
        }
    }
}
