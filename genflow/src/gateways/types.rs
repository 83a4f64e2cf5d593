//! Request and response types exchanged with collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The kind of media a generation request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    /// Still image from a prompt.
    Image,
    /// Video conditioned on a source image.
    Video,
    /// Slowed-down copy of a source video.
    SlowMotion,
    /// Source video with a caption burned in.
    TextOverlay,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::SlowMotion => write!(f, "slow_motion"),
            Self::TextOverlay => write!(f, "text_overlay"),
        }
    }
}

/// A request to a generation or post-processing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// What to produce.
    pub kind: GenerationKind,
    /// Text prompt, when the kind takes one.
    pub prompt: Option<String>,
    /// Model identifier; the gateway picks its default when absent.
    pub model: Option<String>,
    /// Input media (image for video, video for post-processing).
    pub source_url: Option<String>,
    /// Model-specific parameters.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    /// Creates a request of the given kind.
    #[must_use]
    pub fn new(kind: GenerationKind) -> Self {
        Self {
            kind,
            prompt: None,
            model: None,
            source_url: None,
            params: serde_json::Map::new(),
        }
    }

    /// Sets the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Sets the source media URL.
    #[must_use]
    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Sets one parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Merges caller overrides into the parameters; overrides win.
    #[must_use]
    pub fn merge_params(mut self, overrides: &serde_json::Map<String, serde_json::Value>) -> Self {
        for (k, v) in overrides {
            self.params.insert(k.clone(), v.clone());
        }
        self
    }
}

/// Media produced by a generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMedia {
    /// Temporary URL of the produced media.
    pub url: String,
    /// Model that produced it.
    pub model: String,
}

impl GeneratedMedia {
    /// Creates a generated media record.
    #[must_use]
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
        }
    }
}

/// Message role in a completion conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// End-user content.
    User,
    /// Model output.
    Assistant,
}

/// A single message in a completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the sender.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Model override; the client's primary model is used when absent.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Ask the provider for a JSON object.
    pub json_mode: bool,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            model: None,
            temperature: 0.7,
            max_tokens: 2048,
            json_mode: false,
        }
    }
}

impl CompletionRequest {
    /// Creates a request from messages.
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Creates a request with an optional system prompt and one user prompt.
    #[must_use]
    pub fn prompt(prompt: impl Into<String>, system: Option<&str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        Self::new(messages)
    }

    /// Sets the model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enables JSON mode.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A completion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: String,
    /// Model that generated it.
    pub model: String,
    /// Token usage.
    #[serde(default)]
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// One model configuration a completion can be served by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g. "gemini/gemini-2.0-flash").
    pub model: String,
    /// Retries the gateway applies internally for this model.
    pub max_retries: u32,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl ModelConfig {
    /// Creates a config with 2 retries and a 120s timeout.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_retries: 2,
            timeout: Duration::from_secs(120),
        }
    }

    /// Sets the internal retry count.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a copy serving a different model.
    #[must_use]
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// Where uploaded content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// Fetch from a (temporary) URL.
    Url(String),
    /// Raw bytes.
    Bytes {
        /// File content.
        data: Vec<u8>,
        /// MIME type.
        content_type: String,
    },
}

/// A request to persist content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Content source.
    pub source: UploadSource,
    /// Destination key, e.g. `generations/2026/10/19/ab12cd34ef56.mp4`.
    pub key: String,
}

/// A persisted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Permanent URL.
    pub url: String,
    /// Storage key.
    pub key: String,
}
