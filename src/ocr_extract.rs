// src/ocr_extract.rs

use crate::config::{LlmBackend, LlmSection};
use crate::error::Error;
use crate::timecard::{self, ExtractionResult, RawRow};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// The prompt template that instructs the vision model to extract
/// structured attendance data from a time-card photo.
const EXTRACTION_PROMPT: &str = r#"You are a time-card transcription assistant.
Analyze this photo of a Japanese paper time-card (勤務表/タイムカード) and return ONLY valid JSON.

The JSON must match this schema exactly:
{
  "name": "employee name (氏名) printed on the card, or null if not found",
  "entries": [
    {
      "dayInt": integer day of the month (e.g. 1, 15, 31),
      "date": "the date cell as printed, digits only (e.g. '1', '20')",
      "dayOfWeek": "weekday as a single Japanese character (月, 火, 水, 木, 金, 土, 日)",
      "startTime1": "first period clock-in, HH:mm 24-hour",
      "endTime1": "first period clock-out, HH:mm 24-hour",
      "startTime2": "second period clock-in, HH:mm 24-hour",
      "endTime2": "second period clock-out, HH:mm 24-hour"
    }
  ]
}

Notes:
- Extract every row that has a printed day number, even when all time cells are blank.
- A blank time cell is the empty string "", never null.
- Do not include the month in the date field.
- Return ONLY the JSON object, no markdown fences, no commentary."#;

/// Structured payload requested from the OCR collaborator. Field presence
/// is never trusted; `RawRow` coercion handles the rest.
#[derive(Debug, Deserialize)]
struct OcrPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    entries: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: String,
}

/// Resolved endpoint configuration ready to make API calls.
struct ResolvedEndpoint {
    base_url: String,
    model: String,
    api_key: String,
}

/// Resolve the LLM config section into a concrete endpoint.
fn resolve_endpoint(llm: &LlmSection) -> Result<ResolvedEndpoint, Error> {
    match llm.backend {
        LlmBackend::Ollama => {
            info!(
                url = %llm.ollama.base_url,
                model = %llm.ollama.model,
                "Using Ollama (local) backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.ollama.base_url.clone(),
                model: llm.ollama.model.clone(),
                api_key: "ollama".to_string(), // required by API but ignored
            })
        }
        LlmBackend::Remote => {
            let api_key = std::env::var("OCR_API_KEY")
                .map_err(|_| Error::Config("OCR_API_KEY env var required for remote backend".into()))?;
            info!(
                url = %llm.remote.base_url,
                model = %llm.remote.model,
                "Using remote API backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.remote.base_url.clone(),
                model: llm.remote.model.clone(),
                api_key,
            })
        }
    }
}

/// Check if the Ollama server is reachable.
async fn check_ollama_health(client: &Client, base_url: &str) -> bool {
    // Ollama's health endpoint is at the root (not under /v1)
    let health_url = base_url.trim_end_matches("/v1").trim_end_matches("/v1/");

    match client
        .get(health_url)
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status().is_success() {
                info!("Ollama server is reachable");
                true
            } else {
                warn!(status = %resp.status(), "Ollama server returned non-OK status");
                false
            }
        }
        Err(e) => {
            warn!(error = %e, "Ollama server not reachable");
            false
        }
    }
}

/// Extract the outermost JSON object from a string that may contain
/// surrounding narrative text (thinking tokens, apologies, fences).
fn extract_json_object(s: &str) -> Result<&str, Error> {
    let s = s
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = s
        .find('{')
        .ok_or_else(|| Error::Extraction("no '{' found in OCR response".into()))?;
    let end = s
        .rfind('}')
        .ok_or_else(|| Error::Extraction("no '}' found in OCR response".into()))?;
    if end <= start {
        return Err(Error::Extraction("malformed JSON in OCR response".into()));
    }
    Ok(&s[start..=end])
}

/// Parse the raw model output into the structured payload.
fn parse_payload(content: &str) -> Result<OcrPayload, Error> {
    let json_str = extract_json_object(content)?;
    serde_json::from_str(json_str)
        .map_err(|e| Error::Extraction(format!("payload did not match schema: {e}")))
}

/// Reconstruct the attendance table from a parsed payload.
///
/// Fails when no raw row carries a usable day number, since nothing can
/// be sequenced from such a payload.
fn reconstruct_result(payload: OcrPayload) -> Result<ExtractionResult, Error> {
    let entries = timecard::reconstruct(payload.entries);
    if entries.is_empty() {
        return Err(Error::Extraction(
            "no rows with a usable day number".into(),
        ));
    }
    Ok(ExtractionResult {
        entries,
        detected_name: payload.name.unwrap_or_default(),
    })
}

/// Send one image to the vision model and reconstruct its attendance table.
async fn analyze_image(
    client: &Client,
    endpoint: &ResolvedEndpoint,
    image_bytes: &[u8],
    mime_type: &str,
) -> Result<ExtractionResult, Error> {
    let b64 = STANDARD.encode(image_bytes);

    let request = json!({
        "model": endpoint.model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": EXTRACTION_PROMPT },
                { "type": "image_url",
                  "image_url": { "url": format!("data:{mime_type};base64,{b64}") } }
            ]
        }],
        "temperature": 0.1
    });

    let url = format!("{}/chat/completions", endpoint.base_url);

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", endpoint.api_key))
        .json(&request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Extraction(format!("OCR API error {status}: {body}")));
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .map_err(|e| Error::Extraction(format!("unreadable OCR API response: {e}")))?;
    let content = chat_response
        .choices
        .first()
        .map(|c| c.message.content.as_str())
        .ok_or_else(|| Error::Extraction("empty response from OCR model".into()))?;

    let payload = parse_payload(content)?;
    info!(
        rows = payload.entries.len(),
        name = ?payload.name,
        "OCR payload parsed"
    );

    reconstruct_result(payload)
}

/// The OCR collaborator boundary. The batch layer talks to this trait so
/// tests can substitute the external service.
#[async_trait]
pub trait TimecardOcr {
    async fn analyze(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
    ) -> Result<ExtractionResult, Error>;
}

/// Vision-LLM backed implementation of [`TimecardOcr`].
pub struct LlmOcr {
    client: Client,
    endpoint: ResolvedEndpoint,
}

impl LlmOcr {
    pub fn new(llm: &LlmSection) -> Result<Self, Error> {
        Ok(Self {
            client: Client::new(),
            endpoint: resolve_endpoint(llm)?,
        })
    }

    /// Health check for local backends; remote endpoints carry their own
    /// transport errors.
    pub async fn ensure_reachable(&self, llm: &LlmSection) -> Result<(), Error> {
        if llm.backend == LlmBackend::Ollama
            && !check_ollama_health(&self.client, &self.endpoint.base_url).await
        {
            return Err(Error::Config(format!(
                "Ollama is not running at {}. Start it with: ollama serve",
                self.endpoint.base_url
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TimecardOcr for LlmOcr {
    async fn analyze(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
    ) -> Result<ExtractionResult, Error> {
        analyze_image(&self.client, &self.endpoint, image_bytes, mime_type).await
    }
}
