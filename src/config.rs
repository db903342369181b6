use serde::{Deserialize, Serialize};

use crate::audio::{SONG_CHANNELS, SONG_SAMPLE_RATE};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LYRICS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for the lyric and speech calls and for decoding their audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongConfig {
    pub base_url: String,
    pub lyrics_model: String,
    pub tts_model: String,
    pub voice_name: String,
    pub timeout_secs: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for SongConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            lyrics_model: DEFAULT_LYRICS_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice_name: DEFAULT_VOICE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sample_rate: SONG_SAMPLE_RATE,
            channels: SONG_CHANNELS,
        }
    }
}

impl SongConfig {
    /// Defaults with `COCOMPOSE_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = lookup("COCOMPOSE_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok());
        self.update(
            lookup("COCOMPOSE_BASE_URL"),
            lookup("COCOMPOSE_LYRICS_MODEL"),
            lookup("COCOMPOSE_TTS_MODEL"),
            lookup("COCOMPOSE_VOICE"),
            timeout,
        );
    }

    /// Apply partial settings. Blank strings are ignored and the timeout is clamped.
    pub fn update(
        &mut self,
        base_url: Option<String>,
        lyrics_model: Option<String>,
        tts_model: Option<String>,
        voice_name: Option<String>,
        timeout_secs: Option<u64>,
    ) {
        if let Some(url) = non_blank(base_url) {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_blank(lyrics_model) {
            self.lyrics_model = model;
        }
        if let Some(model) = non_blank(tts_model) {
            self.tts_model = model;
        }
        if let Some(voice) = non_blank(voice_name) {
            self.voice_name = voice;
        }
        if let Some(timeout) = timeout_secs {
            self.timeout_secs = timeout.clamp(5, 600);
        }
    }
}

/// API key from `GEMINI_API_KEY`, then `API_KEY`.
pub fn api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .into_iter()
        .find_map(|key| non_blank(std::env::var(key).ok()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
