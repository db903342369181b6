use serde::Serialize;
use tauri::State;

use crate::audio::output::{CpalOutput, OutputDevice};
use crate::error::AppError;
use crate::flow::play_current_song;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStarted {
    pub voice_id: u64,
    pub stream_rate: Option<u32>,
}

/// "Listen": decode the current song and play it once on the shared session.
///
/// Failures leave the workflow untouched so the user can simply try again.
#[tauri::command]
pub async fn play_song(state: State<'_, AppState>) -> Result<PlaybackStarted, AppError> {
    let (sample_rate, channels) = {
        let config = state.song_config.lock().unwrap();
        (config.sample_rate, config.channels)
    };
    let session = state
        .playback
        .ensure(sample_rate, || Box::new(CpalOutput::new()) as Box<dyn OutputDevice>)?;
    let workflow = state.workflow.lock().unwrap().clone();

    // Decoding and opening the device are blocking; keep them off the async workers.
    let started = tokio::task::spawn_blocking(move || {
        let handle = play_current_song(&workflow, &session, sample_rate, channels)?;
        Ok::<_, AppError>(PlaybackStarted {
            voice_id: handle.id(),
            stream_rate: session.stream_format().map(|f| f.sample_rate),
        })
    })
    .await
    .map_err(|e| AppError::Playback(format!("Playback task failed: {e}")))?;

    if let Err(e) = &started {
        crate::app_log!("[playback] play_song failed: {e}");
    }
    started
}

/// Silence everything currently playing.
#[tauri::command]
pub fn stop_playback(state: State<'_, AppState>) {
    if let Some(session) = state.playback.current() {
        session.stop_all();
        crate::app_log!("[playback] stopped all voices");
    }
}
