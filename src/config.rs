//! Transform configuration.

/// Default Gemini REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted by [`StudioConfig::from_env`], in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "API_KEY"];

/// The fixed styling instruction sent with every portrait.
pub const STYLE_INSTRUCTION: &str = concat!(
    "Transform this photo into an ultra-realistic, Vogue-style high-fashion portrait with a cowboy-inspired aesthetic. \n",
    "The subject should wear a sophisticated tailored jacket and fitted trousers. \n",
    "Include a classic \"cowboy kofia\" (a unique fusion of a traditional kofia shape with cowboy elements). \n",
    "CRITICAL: Keep the subject's REAL FACE exactly as it is in the original image. NO facial changes. \n",
    "The background should be minimalist and high-end, similar to a professional studio fashion shoot. \n",
    "Style: Cinematic lighting, luxury textures, hyper-detailed.",
);

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the transform client.
///
/// The API key is optional here on purpose: a missing key is reported by
/// the transform call itself, so the studio can still be driven (and show
/// the error) without one.
#[derive(Clone, PartialEq, Eq)]
pub struct StudioConfig {
    /// Gemini API key.
    pub api_key: Option<String>,
    /// Model used for the edit.
    pub model: GeminiModel,
    /// Base URL of the Gemini REST API.
    pub endpoint: String,
    /// Instruction sent alongside the image.
    pub instruction: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            instruction: STYLE_INSTRUCTION.to_string(),
        }
    }
}

impl StudioConfig {
    /// Creates a config with defaults and no API key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config whose API key comes from the environment.
    ///
    /// Checks `GOOGLE_API_KEY`, then `API_KEY`. Empty values count as unset.
    pub fn from_env() -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty());
        Self {
            api_key,
            ..Self::default()
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model variant.
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the styling instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Returns the API key if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl std::fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
