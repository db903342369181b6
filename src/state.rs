use std::sync::Mutex;

use crate::audio::session::SessionSlot;
use crate::config::SongConfig;
use crate::flow::Workflow;

pub struct AppState {
    /// Current step, collected emotions and the generated song.
    pub workflow: Mutex<Workflow>,
    /// Audio output session, created on the first "listen".
    pub playback: SessionSlot,
    /// Models, voice and timeout, synced from frontend settings.
    pub song_config: Mutex<SongConfig>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            workflow: Mutex::new(Workflow::new()),
            playback: SessionSlot::new(),
            song_config: Mutex::new(SongConfig::from_env()),
        }
    }
}
