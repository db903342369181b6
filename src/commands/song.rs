use std::fs;
use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use tauri::{AppHandle, Emitter, State};

use crate::audio::decoder::decode_song_audio;
use crate::audio::wav;
use crate::error::AppError;
use crate::security::keystore::KeyStore;
use crate::song::gemini::GeminiClient;
use crate::song::{generate_song, SongGenerator, SongResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub audio_path: String,
    pub text_path: String,
    pub duration_secs: f32,
    pub rms_level: f32,
}

/// Generate lyrics and sung audio from the collected emotions.
///
/// The workflow lock is released while the upstream calls run so the frontend
/// can keep polling `get_workflow` during the generating step. A missing key is
/// reported before the workflow leaves the board.
#[tauri::command]
pub async fn create_music(
    app: AppHandle,
    state: State<'_, AppState>,
    keystore: State<'_, KeyStore>,
) -> Result<SongResult, AppError> {
    let config = state.song_config.lock().unwrap().clone();
    let client = GeminiClient::new(keystore.resolve_gemini_key()?, config)?;

    let _ = app.emit("song:status", serde_json::json!({"status": "generating"}));
    crate::app_log!("[song] create_music provider={}", client.provider_name());
    let result = generate_song(&state.workflow, &client).await;
    match &result {
        Ok(_) => {
            let _ = app.emit("song:status", serde_json::json!({"status": "done"}));
        }
        Err(e) => {
            let _ = app.emit(
                "song:status",
                serde_json::json!({"status": "error", "message": e.to_string()}),
            );
        }
    }
    result
}

/// Save the current song as WAV plus a lyrics text file.
#[tauri::command]
pub fn export_song(
    output_dir: Option<String>,
    state: State<'_, AppState>,
) -> Result<ExportResult, AppError> {
    let song = state
        .workflow
        .lock()
        .unwrap()
        .song()
        .cloned()
        .ok_or_else(|| AppError::Workflow("No song to export yet".into()))?;
    let audio = song
        .audio_base64
        .as_deref()
        .ok_or_else(|| AppError::Workflow("Song has no audio".into()))?;
    let (sample_rate, channels) = {
        let config = state.song_config.lock().unwrap();
        (config.sample_rate, config.channels)
    };
    let buffer = decode_song_audio(audio, sample_rate, channels)?;

    let dir = resolve_output_dir(output_dir)?;
    fs::create_dir_all(&dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let base_name = format!("{}_{timestamp}", file_stem(&song.title));

    let wav_path = dir.join(format!("{base_name}.wav"));
    let wav_data = wav::encode_wav(&buffer);
    fs::write(&wav_path, &wav_data)?;
    crate::app_log!("[song] Saved WAV: {} ({} bytes)", wav_path.display(), wav_data.len());

    let txt_path = dir.join(format!("{base_name}.txt"));
    fs::write(&txt_path, format!("{}\n\n{}\n", song.title, song.lyrics))?;
    crate::app_log!("[song] Saved TXT: {}", txt_path.display());

    Ok(ExportResult {
        audio_path: wav_path.display().to_string(),
        text_path: txt_path.display().to_string(),
        duration_secs: buffer.duration_secs(),
        rms_level: wav::calculate_rms(&buffer),
    })
}

/// Keep letters and digits of any script, collapse everything else to `_`.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "song".to_string()
    } else {
        stem.chars().take(48).collect()
    }
}

fn resolve_output_dir(custom: Option<String>) -> Result<PathBuf, AppError> {
    if let Some(dir) = custom {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    // ~/Documents/CoCompose/songs/
    let home = std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Cannot determine home directory",
        )))?;

    Ok(home.join("Documents").join("CoCompose").join("songs"))
}
