//! Wire protocol spoken with the transcription worker
//!
//! Each direction carries exactly one compact JSON object followed by a
//! newline. Requests are tagged by their `command` field; responses are
//! untagged and recognised by which result field they carry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request sent to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Transcribe the audio file at `path`
    Transcribe {
        path: String,
        language: String,
        model: String,
    },

    /// Liveness probe
    Ping,

    /// Ask which models the worker knows about
    ListModels,

    /// Fetch a model into the worker's cache
    DownloadModel { model: String },

    /// Ask the worker to exit
    Shutdown,
}

impl WorkerRequest {
    /// Wire name of the command
    pub fn command(&self) -> &'static str {
        match self {
            Self::Transcribe { .. } => "transcribe",
            Self::Ping => "ping",
            Self::ListModels => "list_models",
            Self::DownloadModel { .. } => "download_model",
            Self::Shutdown => "shutdown",
        }
    }
}

/// A model entry reported by `list_models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,

    #[serde(default)]
    pub installed: bool,
}

/// Result of a successful `download_model`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The worker fetched the model
    Downloaded,

    /// The model was already in the cache
    AlreadyInstalled,
}

/// Decoded worker response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerResponse {
    /// Successful transcription
    Transcription { text: String },

    /// Model listing
    Models(Vec<ModelInfo>),

    /// Acknowledgement such as `"ok"` or `"shutting_down"`
    Status(String),

    /// Application-level failure reported by the worker
    Error { message: String },
}

impl WorkerResponse {
    /// Decode a response object.
    ///
    /// An `error` field wins over everything else, so a worker that reports
    /// both a partial `text` and an `error` is treated as failed.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, String> {
        if let Some(error) = object.get("error") {
            let message = match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            return Ok(Self::Error { message });
        }

        if let Some(text) = object.get("text") {
            return text
                .as_str()
                .map(|text| Self::Transcription {
                    text: text.to_string(),
                })
                .ok_or_else(|| "`text` field is not a string".to_string());
        }

        if let Some(models) = object.get("models") {
            let models: Vec<ModelInfo> =
                serde_json::from_value(models.clone()).map_err(|e| e.to_string())?;
            return Ok(Self::Models(models));
        }

        if let Some(status) = object.get("status").and_then(Value::as_str) {
            return Ok(Self::Status(status.to_string()));
        }

        Err("response carries no text, error, models or status field".to_string())
    }
}

/// Serialize a request to one newline-terminated line
pub fn serialize_request(request: &WorkerRequest) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(request).expect("Failed to serialize request");
    bytes.push(b'\n');
    bytes
}

/// Parse raw response bytes into a JSON object
pub fn deserialize_object(data: &[u8]) -> Result<Map<String, Value>, String> {
    match serde_json::from_slice::<Value>(data) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
