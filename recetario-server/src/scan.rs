//! Transcription of scanned recipe pages through the hosted vision model.
//! Everything that can go wrong here is folded into [`ScanError`]; callers
//! never see a raw upstream error.

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPart,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionResponseFormat,
    ChatCompletionResponseFormatType, CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
};
use async_trait::async_trait;
use base64::Engine;
use recetario::basic_models::DraftRecipe;
use recetario::draft::PageImage;
use serde::Deserialize;

/// The fixed transcription instruction sent with every request.
const PROMPT: &str = include_str!("../prompts/transcribe.md");

const MODEL: &str = "gpt-4o-mini";

const FALLBACK_TITLE: &str = "Receta sin título";

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("No llegó ninguna imagen.")]
    NoImages,
    #[error("Falta la clave de la API. Revisa OPENAI_API_KEY.")]
    MissingApiKey,
    #[error("La IA leyó la imagen pero falló el formato. Intenta con mejor luz.")]
    Unreadable(String),
    #[error("La IA no pudo leer la receta: {0}")]
    ModelError(String),
    #[error("Error técnico: {0}")]
    Upstream(String),
}

/// Seam over the hosted model so the scan pipeline can be exercised
/// without network access.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one instruction plus inline images, returning the raw reply text.
    async fn describe(&self, prompt: &str, pages: &[PageImage]) -> Result<String, ScanError>;
}

/// Transcribe collected pages into an editable draft.
pub async fn scan_pages(
    model: &dyn VisionModel,
    pages: &[PageImage],
) -> Result<DraftRecipe, ScanError> {
    if pages.is_empty() {
        return Err(ScanError::NoImages);
    }
    let reply = model.describe(PROMPT, pages).await?;
    parse_model_reply(&reply)
}

/// What the model is asked to return. Every field is optional so a sloppy
/// reply still parses; the gaps are backfilled below.
#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    titulo: Option<String>,
    #[serde(default)]
    ingredientes: Option<Vec<String>>,
    #[serde(default)]
    pasos: Option<Vec<String>>,
    #[serde(default)]
    notas: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse the raw reply text: strip any markdown fence, parse the JSON,
/// surface a model-reported error, backfill missing fields.
pub fn parse_model_reply(text: &str) -> Result<DraftRecipe, ScanError> {
    let clean = strip_code_fences(text);
    let reply: ModelReply =
        serde_json::from_str(&clean).map_err(|e| ScanError::Unreadable(e.to_string()))?;
    if let Some(error) = reply.error.filter(|e| !e.trim().is_empty()) {
        return Err(ScanError::ModelError(error));
    }
    Ok(DraftRecipe {
        title: reply
            .titulo
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        ingredients: reply.ingredientes.unwrap_or_default(),
        steps: reply.pasos.unwrap_or_default(),
        notes: reply.notas.filter(|n| !n.trim().is_empty()),
    })
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

pub struct OpenAiVision {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVision {
    pub fn from_env() -> Result<Self, ScanError> {
        let api_key = dotenvy::var("OPENAI_API_KEY").map_err(|_| ScanError::MissingApiKey)?;
        let config = OpenAIConfig::new().with_api_key(api_key);
        Ok(Self {
            client: async_openai::Client::with_config(config),
            model: MODEL.to_string(),
        })
    }

    fn classify(err: OpenAIError) -> ScanError {
        match err {
            OpenAIError::ApiError(api) => {
                if api.message.to_lowercase().contains("api key") {
                    ScanError::MissingApiKey
                } else {
                    ScanError::Upstream(api.message)
                }
            }
            other => ScanError::Upstream(other.to_string()),
        }
    }

    fn build_err(err: OpenAIError) -> ScanError {
        ScanError::Upstream(err.to_string())
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn describe(&self, prompt: &str, pages: &[PageImage]) -> Result<String, ScanError> {
        let mut parts: Vec<ChatCompletionRequestMessageContentPart> =
            vec![ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(prompt)
                .build()
                .map_err(Self::build_err)?
                .into()];
        for page in pages {
            let data_url = format!(
                "data:{};base64,{}",
                page.mime,
                base64::engine::general_purpose::STANDARD.encode(&page.bytes)
            );
            parts.push(
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(data_url)
                            .detail(ImageDetail::High)
                            .build()
                            .map_err(Self::build_err)?,
                    )
                    .build()
                    .map_err(Self::build_err)?
                    .into(),
            );
        }

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(parts))
            .build()
            .map_err(Self::build_err)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .messages([ChatCompletionRequestMessage::User(message)])
            .build()
            .map_err(Self::build_err)?;

        tracing::info!(pages = pages.len(), model = %self.model, "Transcribing recipe pages");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::classify)?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ScanError::Upstream("el modelo no devolvió texto".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A model double that must never be reached.
    struct PanicModel;

    #[async_trait]
    impl VisionModel for PanicModel {
        async fn describe(&self, _: &str, _: &[PageImage]) -> Result<String, ScanError> {
            panic!("the model must not be called without images");
        }
    }

    struct CannedModel(String);

    #[async_trait]
    impl VisionModel for CannedModel {
        async fn describe(&self, _: &str, _: &[PageImage]) -> Result<String, ScanError> {
            Ok(self.0.clone())
        }
    }

    fn page() -> PageImage {
        PageImage {
            bytes: vec![0xFF],
            mime: "image/webp".into(),
        }
    }

    #[tokio::test]
    async fn zero_images_fail_before_any_call() {
        let err = scan_pages(&PanicModel, &[]).await.unwrap_err();
        assert!(matches!(err, ScanError::NoImages));
    }

    #[tokio::test]
    async fn fenced_json_parses() {
        let model = CannedModel(
            "```json\n{\"titulo\": \"Flan\", \"ingredientes\": [\"leche\"], \"pasos\": [\"Hornear\"]}\n```".into(),
        );
        let draft = scan_pages(&model, &[page()]).await.unwrap();
        assert_eq!(draft.title, "Flan");
        assert_eq!(draft.ingredients, vec!["leche"]);
        assert_eq!(draft.steps, vec!["Hornear"]);
    }

    #[test]
    fn missing_fields_are_backfilled() {
        let draft = parse_model_reply(r#"{"notas": "de la abuela"}"#).unwrap();
        assert_eq!(draft.title, "Receta sin título");
        assert!(draft.ingredients.is_empty());
        assert!(draft.steps.is_empty());
        assert_eq!(draft.notes.as_deref(), Some("de la abuela"));
    }

    #[test]
    fn model_reported_error_is_surfaced() {
        let err = parse_model_reply(r#"{"error": "imagen en blanco"}"#).unwrap_err();
        assert!(matches!(err, ScanError::ModelError(m) if m == "imagen en blanco"));
    }

    #[test]
    fn unparseable_reply_is_a_typed_error() {
        let err = parse_model_reply("lo siento, no es una receta").unwrap_err();
        assert!(matches!(err, ScanError::Unreadable(_)));
    }
}
