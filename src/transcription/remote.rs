//! Seam for cloud transcription clients
//!
//! The HTTP clients themselves live outside this crate; anything that can
//! turn an audio file into text plugs in here.

use async_trait::async_trait;
use std::path::Path;

/// Cloud transcription client
#[async_trait]
pub trait RemoteTranscriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
        model: &str,
        api_key: &str,
    ) -> crate::Result<String>;
}

/// Credentials and model used for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub api_key: String,
    pub model: String,
}

impl RemoteCredentials {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
