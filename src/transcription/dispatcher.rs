//! Single entry point for turning a recording into text

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Settings;
use crate::transcription::mode::{RemoteProvider, TranscriptionMode};
use crate::transcription::remote::{RemoteCredentials, RemoteTranscriber};
use crate::worker::ipc::{WorkerRequest, WorkerResponse};
use crate::worker::WorkerManager;
use crate::{Result, ScrivenerError};

/// What the recording coordinator needs from the transcription layer
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio file. Called at most once per recording; no
    /// retries happen underneath.
    async fn transcribe(&self, audio: &Path, mode: &TranscriptionMode) -> Result<String>;

    /// Bring the local worker up ahead of time
    async fn start_worker(&self);

    /// Release the local worker
    async fn stop_worker(&self);
}

struct RemoteBackend {
    client: Arc<dyn RemoteTranscriber>,
    credentials: RemoteCredentials,
}

/// Routes requests to the local worker or a registered cloud client
pub struct Dispatcher {
    worker: Arc<WorkerManager>,
    language: String,
    transcription_timeout: Duration,
    remotes: HashMap<RemoteProvider, RemoteBackend>,
}

impl Dispatcher {
    pub fn new(worker: Arc<WorkerManager>, language: impl Into<String>, transcription_timeout: Duration) -> Self {
        Self {
            worker,
            language: language.into(),
            transcription_timeout,
            remotes: HashMap::new(),
        }
    }

    /// Dispatcher around a real worker, without any cloud clients
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(WorkerManager::from_settings(settings)),
            settings.general.language.clone(),
            Duration::from_secs(settings.worker.transcription_timeout_secs),
        )
    }

    /// Register the client used for a cloud provider
    pub fn with_remote(
        mut self,
        provider: RemoteProvider,
        client: Arc<dyn RemoteTranscriber>,
        credentials: RemoteCredentials,
    ) -> Self {
        self.remotes
            .insert(provider, RemoteBackend { client, credentials });
        self
    }

    pub fn worker(&self) -> &Arc<WorkerManager> {
        &self.worker
    }

    async fn transcribe_local(&self, audio: &Path, model: &str) -> Result<String> {
        if !self.worker.is_running() {
            info!("Worker not running, starting it with model {}", model);
            self.worker.start_with_model(model).await;

            if !self.worker.is_running() {
                return Err(ScrivenerError::BackendUnavailable(
                    "local worker is not running".to_string(),
                ));
            }
        }

        let request = WorkerRequest::Transcribe {
            path: audio.to_string_lossy().into_owned(),
            language: self.language.clone(),
            model: model.to_string(),
        };

        let object = self
            .worker
            .request(&request, self.transcription_timeout)
            .await?;

        match WorkerResponse::from_object(&object) {
            Ok(WorkerResponse::Transcription { text }) => Ok(text),
            Ok(WorkerResponse::Error { message }) => Err(ScrivenerError::Backend(message)),
            Ok(other) => Err(ScrivenerError::Backend(format!(
                "unexpected response from worker: {:?}",
                other
            ))),
            Err(reason) => Err(ScrivenerError::Backend(format!(
                "invalid response from worker: {}",
                reason
            ))),
        }
    }

    async fn transcribe_remote(&self, audio: &Path, provider: RemoteProvider) -> Result<String> {
        let backend = self.remotes.get(&provider).ok_or_else(|| {
            ScrivenerError::BackendUnavailable(format!("no {} client configured", provider))
        })?;

        if !backend.credentials.has_api_key() {
            return Err(ScrivenerError::BackendUnavailable(format!(
                "{} API key is not configured",
                provider
            )));
        }

        backend
            .client
            .transcribe(
                audio,
                &self.language,
                &backend.credentials.model,
                &backend.credentials.api_key,
            )
            .await
    }
}

#[async_trait]
impl Transcriber for Dispatcher {
    async fn transcribe(&self, audio: &Path, mode: &TranscriptionMode) -> Result<String> {
        debug!("Transcribing {} via {}", audio.display(), mode);

        match mode {
            TranscriptionMode::Local { model } => self.transcribe_local(audio, model).await,
            TranscriptionMode::Remote { provider } => self.transcribe_remote(audio, *provider).await,
        }
    }

    async fn start_worker(&self) {
        self.worker.start().await;
    }

    async fn stop_worker(&self) {
        self.worker.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(PathBuf, String, String, String)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl RemoteTranscriber for RecordingClient {
        async fn transcribe(&self, audio: &Path, language: &str, model: &str, api_key: &str) -> Result<String> {
            self.calls.lock().unwrap().push((
                audio.to_path_buf(),
                language.to_string(),
                model.to_string(),
                api_key.to_string(),
            ));
            match &self.fail_with {
                Some(message) => Err(ScrivenerError::Backend(message.clone())),
                None => Ok("remote text".to_string()),
            }
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut settings = Settings::default();
        settings.general.language = "de".to_string();
        Dispatcher::from_settings(&settings)
    }

    #[tokio::test]
    async fn remote_mode_forwards_language_model_and_key() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = dispatcher().with_remote(
            RemoteProvider::OpenAi,
            client.clone(),
            RemoteCredentials::new("sk-test", "gpt-4o-transcribe"),
        );

        let text = dispatcher
            .transcribe(Path::new("/tmp/take.wav"), &TranscriptionMode::remote(RemoteProvider::OpenAi))
            .await
            .unwrap();

        assert_eq!(text, "remote text");
        let calls = client.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![(
                PathBuf::from("/tmp/take.wav"),
                "de".to_string(),
                "gpt-4o-transcribe".to_string(),
                "sk-test".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn remote_errors_are_forwarded_once() {
        let client = Arc::new(RecordingClient {
            fail_with: Some("quota exceeded".to_string()),
            ..Default::default()
        });
        let dispatcher = dispatcher().with_remote(
            RemoteProvider::Gemini,
            client.clone(),
            RemoteCredentials::new("key", "gemini-2.5-flash"),
        );

        let err = dispatcher
            .transcribe(Path::new("take.wav"), &TranscriptionMode::remote(RemoteProvider::Gemini))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrivenerError::Backend(ref m) if m == "quota exceeded"));
        assert_eq!(client.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unregistered_provider_is_unavailable() {
        let err = dispatcher()
            .transcribe(Path::new("take.wav"), &TranscriptionMode::remote(RemoteProvider::Gemini))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrivenerError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn blank_api_key_skips_the_client() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = dispatcher().with_remote(
            RemoteProvider::OpenAi,
            client.clone(),
            RemoteCredentials::new("   ", "gpt-4o-transcribe"),
        );

        let err = dispatcher
            .transcribe(Path::new("take.wav"), &TranscriptionMode::remote(RemoteProvider::OpenAi))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrivenerError::BackendUnavailable(_)));
        assert!(client.calls.lock().unwrap().is_empty());
    }
}
