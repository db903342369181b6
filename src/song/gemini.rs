use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use super::{build_lyrics_prompt, build_speech_prompt, Lyrics, SongGenerator};
use crate::config::SongConfig;
use crate::emotion::UserEmotion;
use crate::error::AppError;

/// Gemini `generateContent` client for lyrics (JSON mode) and sung speech (audio modality).
pub struct GeminiClient {
    api_key: String,
    config: SongConfig,
    client: reqwest::Client,
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl GeminiClient {
    pub fn new(api_key: String, config: SongConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Upstream(format!("HTTP client error: {e}")))?;
        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model.trim()
        )
    }

    fn next_request_id() -> u64 {
        NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
    }

    fn response_request_id(headers: &reqwest::header::HeaderMap) -> String {
        const CANDIDATES: [&str; 3] = ["x-request-id", "x-goog-request-id", "request-id"];
        for key in CANDIDATES {
            if let Some(value) = headers.get(key).and_then(|v| v.to_str().ok()) {
                if !value.trim().is_empty() {
                    return value.to_string();
                }
            }
        }
        "n/a".to_string()
    }

    async fn generate_content(&self, kind: &str, model: &str, body: &Value) -> Result<Value, AppError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{kind} request failed: {e}")))?;

        let status = response.status();
        let upstream_request_id = Self::response_request_id(response.headers());
        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read {kind} response: {e}")))?;
        crate::app_log!(
            "[song-http] provider=gemini kind={} model={} request_id={} upstream_request_id={} status={} latency_ms={}",
            kind,
            model,
            Self::next_request_id(),
            upstream_request_id,
            status,
            started.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Gemini API error ({status}): {body_text}"
            )));
        }

        serde_json::from_str(&body_text)
            .map_err(|e| AppError::Upstream(format!("Failed to parse {kind} response: {e}")))
    }
}

pub fn lyrics_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "lyrics": { "type": "STRING" }
                },
                "required": ["title", "lyrics"]
            }
        }
    })
}

pub fn speech_request_body(prompt: &str, voice_name: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice_name }
                }
            }
        }
    })
}

/// Pull `{title, lyrics}` out of a JSON-mode response.
pub fn parse_lyrics_response(response: &Value) -> Result<Lyrics, AppError> {
    let text = response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| AppError::Upstream("Lyrics response has no text".into()))?;
    serde_json::from_str(text.trim())
        .map_err(|e| AppError::Upstream(format!("Lyrics response is not valid JSON: {e}")))
}

/// Pull the base64 PCM out of an audio-modality response.
pub fn parse_audio_response(response: &Value) -> Result<String, AppError> {
    response["candidates"][0]["content"]["parts"][0]["inlineData"]["data"]
        .as_str()
        .filter(|data| !data.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Upstream("Audio generation failed".into()))
}

impl SongGenerator for GeminiClient {
    async fn generate_lyrics(&self, emotions: &[UserEmotion]) -> Result<Lyrics, AppError> {
        let body = lyrics_request_body(&build_lyrics_prompt(emotions));
        let response = self
            .generate_content("lyrics", &self.config.lyrics_model, &body)
            .await?;
        parse_lyrics_response(&response)
    }

    async fn generate_song_audio(&self, lyrics: &str) -> Result<String, AppError> {
        let body = speech_request_body(&build_speech_prompt(lyrics), &self.config.voice_name);
        let response = self
            .generate_content("speech", &self.config.tts_model, &body)
            .await?;
        parse_audio_response(&response)
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}
