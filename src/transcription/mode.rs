//! Which backend handles a recording

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cloud transcription providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProvider {
    OpenAi,
    Gemini,
}

impl RemoteProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for RemoteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!(
                "unknown provider '{}'. Supported providers: openai, gemini",
                other
            )),
        }
    }
}

/// Backend selection for one recording. Equality is structural, so two
/// local modes differ when their model names differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum TranscriptionMode {
    /// The local worker, using the named model
    Local { model: String },

    /// A cloud provider
    Remote { provider: RemoteProvider },
}

impl TranscriptionMode {
    pub fn local(model: impl Into<String>) -> Self {
        Self::Local {
            model: model.into(),
        }
    }

    pub fn remote(provider: RemoteProvider) -> Self {
        Self::Remote { provider }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

impl fmt::Display for TranscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { model } => write!(f, "local ({})", model),
            Self::Remote { provider } => write!(f, "{}", provider),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_modes_compare_by_model() {
        assert_eq!(TranscriptionMode::local("small"), TranscriptionMode::local("small"));
        assert_ne!(TranscriptionMode::local("small"), TranscriptionMode::local("base"));
        assert_ne!(
            TranscriptionMode::remote(RemoteProvider::OpenAi),
            TranscriptionMode::remote(RemoteProvider::Gemini)
        );
    }

    #[test]
    fn parses_providers_case_insensitively() {
        assert_eq!("OpenAI".parse::<RemoteProvider>(), Ok(RemoteProvider::OpenAi));
        assert_eq!("gemini".parse::<RemoteProvider>(), Ok(RemoteProvider::Gemini));
        assert!("whisper".parse::<RemoteProvider>().is_err());
    }

    #[test]
    fn displays_mode() {
        assert_eq!(TranscriptionMode::local("tiny").to_string(), "local (tiny)");
        assert_eq!(
            TranscriptionMode::remote(RemoteProvider::Gemini).to_string(),
            "gemini"
        );
    }
}
