//! Scripted model for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::AiError;

use super::VisionModel;

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail { status: u16, message: String },
}

/// Mock model returning a fixed reply (or a fixed API error) for every call.
#[derive(Debug)]
pub struct MockModel {
    script: Script,
    model_id: String,
    calls: AtomicUsize,
}

impl MockModel {
    /// A model that always answers with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::scripted(Script::Reply(reply.into()))
    }

    /// A model that always fails with an API error.
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self::scripted(Script::Fail {
            status,
            message: message.into(),
        })
    }

    fn scripted(script: Script) -> Self {
        Self {
            script,
            model_id: "mock".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for MockModel {
    async fn generate(&self, _prompt: &str, _data: &[u8], _mime_type: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail { status, message } => Err(AiError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
