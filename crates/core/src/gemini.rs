use crate::config::Config;
use crate::error::{AppError, Result};
use gemini_rust::{Blob, Content, Gemini, Message, Part, Role};
use std::future::Future;

/// Instruction sent alongside the two images.
const TRY_ON_PROMPT: &str = "The first image shows a person, the second a garment. \
Produce a photorealistic image of the same person, in the same pose, framing and \
background, wearing the garment. Keep the face, body shape and lighting unchanged. \
Return only the image.";

/// Port for the remote image composition service.
pub trait Composer {
    /// Composes the garment onto the person.
    ///
    /// Both payloads are base64 without a data-URL header; the person image
    /// is always a JPEG. Returns the base64 payload of the result image.
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`AppError::Composition`].
    fn compose(
        &self,
        person_payload: &str,
        garment_payload: &str,
        garment_mime_type: &str,
    ) -> impl Future<Output = Result<String>>;
}

pub struct GeminiComposer {
    client: Gemini,
}

impl GeminiComposer {
    pub fn new(config: &Config) -> Result<Self> {
        if !config.has_api_key() {
            return Err(AppError::config(
                "GEMINI_API_KEY must be set in environment or .env file",
            ));
        }

        // Initialize the client with the API key and model, explicitly setting the base URL to avoid BadScheme error
        let base_url = url::Url::parse("https://generativelanguage.googleapis.com/v1beta/")
            .map_err(|e| AppError::config(format!("Invalid base URL: {}", e)))?;

        let model_name = if config.model_name.starts_with("models/") {
            config.model_name.clone()
        } else {
            format!("models/{}", config.model_name)
        };
        let model_url = format!("https://generativelanguage.googleapis.com/v1beta/{}", model_name);

        let client = Gemini::with_model_and_base_url(&config.gemini_api_key, model_url, base_url)
            .map_err(|e| AppError::config(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Composer for GeminiComposer {
    async fn compose(
        &self,
        person_payload: &str,
        garment_payload: &str,
        garment_mime_type: &str,
    ) -> Result<String> {
        let person_part = Part::InlineData {
            inline_data: Blob {
                mime_type: "image/jpeg".to_string(),
                data: person_payload.to_string(),
            },
            media_resolution: None,
        };

        let garment_part = Part::InlineData {
            inline_data: Blob {
                mime_type: garment_mime_type.to_string(),
                data: garment_payload.to_string(),
            },
            media_resolution: None,
        };

        let text_part = Part::Text {
            text: TRY_ON_PROMPT.to_string(),
            thought: None,
            thought_signature: None,
        };

        let message = Message {
            role: Role::User,
            content: Content {
                role: Some(Role::User),
                parts: Some(vec![person_part, garment_part, text_part]),
            },
        };

        tracing::debug!(garment_mime_type, "requesting composition");

        let response = self
            .client
            .generate_content()
            .with_messages(vec![message])
            .execute()
            .await
            .map_err(|e| AppError::composition(format!("API request failed: {:?}", e)))?;

        // The image usually follows a short text part, so scan every part.
        let image = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.as_ref())
            .and_then(|parts| {
                parts.iter().find_map(|part| match part {
                    Part::InlineData { inline_data, .. } => Some(inline_data.data.clone()),
                    _ => None,
                })
            });

        image.ok_or_else(|| AppError::composition("No image received from Gemini"))
    }
}
