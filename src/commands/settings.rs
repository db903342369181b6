use tauri::State;

use crate::config::{api_key_from_env, SongConfig};
use crate::error::AppError;
use crate::security::keystore::{KeyStore, GEMINI_ACCOUNT};
use crate::state::AppState;

/// Save the Gemini API key to the OS keychain.
#[tauri::command]
pub fn save_api_key(key: String, keystore: State<'_, KeyStore>) -> Result<(), AppError> {
    crate::app_log!("[settings] save_api_key key_len={}", key.trim().len());
    keystore.save_api_key(GEMINI_ACCOUNT, &key)
}

/// Whether a Gemini key is available from the keychain or the environment.
/// The frontend shows the key selection screen when this is false.
#[tauri::command]
pub fn has_api_key(keystore: State<'_, KeyStore>) -> Result<bool, AppError> {
    let in_keychain = keystore.get_api_key(GEMINI_ACCOUNT)?.is_some();
    let in_env = api_key_from_env().is_some();
    crate::app_log!(
        "[settings] has_api_key keychain={} env={}",
        in_keychain,
        in_env
    );
    Ok(in_keychain || in_env)
}

#[tauri::command]
pub fn delete_api_key(keystore: State<'_, KeyStore>) -> Result<(), AppError> {
    crate::app_log!("[settings] delete_api_key");
    keystore.delete_api_key(GEMINI_ACCOUNT)
}

/// Sync frontend settings to Rust state. Returns the effective configuration.
#[tauri::command]
pub fn sync_settings(
    state: State<'_, AppState>,
    base_url: Option<String>,
    lyrics_model: Option<String>,
    tts_model: Option<String>,
    voice_name: Option<String>,
    timeout_secs: Option<u64>,
) -> SongConfig {
    crate::app_log!(
        "[settings] sync_settings lyrics_model={:?} tts_model={:?} voice_name={:?} timeout_secs={:?}",
        lyrics_model,
        tts_model,
        voice_name,
        timeout_secs
    );
    let mut config = state.song_config.lock().unwrap();
    config.update(base_url, lyrics_model, tts_model, voice_name, timeout_secs);
    config.clone()
}
