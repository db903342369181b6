pub mod audio;
pub mod config;
pub mod emotion;
pub mod error;
pub mod flow;
pub mod logger;
pub mod song;
pub mod state;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
pub mod security;

#[cfg(feature = "desktop")]
use security::keystore::KeyStore;
#[cfg(feature = "desktop")]
use state::AppState;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logger::init_file_logger();
    tauri::Builder::default()
        .manage(AppState::default())
        .manage(KeyStore::new())
        .invoke_handler(tauri::generate_handler![
            // App info
            commands::get_app_info,
            commands::get_workflow,
            // Flow
            commands::flow::start_flow,
            commands::flow::begin_emotion_input,
            commands::flow::add_emotion,
            commands::flow::remove_emotion,
            commands::flow::finalize_emotions,
            commands::flow::restart_flow,
            // Song
            commands::song::create_music,
            commands::song::export_song,
            // Playback
            commands::playback::play_song,
            commands::playback::stop_playback,
            // Settings / API key
            commands::settings::save_api_key,
            commands::settings::has_api_key,
            commands::settings::delete_api_key,
            commands::settings::sync_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
