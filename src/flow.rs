use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::decoder::decode_song_audio;
use crate::audio::mixer::PlaybackHandle;
use crate::audio::session::PlaybackSession;
use crate::emotion::EmotionBoard;
use crate::error::AppError;
use crate::song::SongResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStep {
    Landing,
    Listening,
    EmotionInput,
    Board,
    Generating,
    Result,
}

/// Screen sequence of one audience session, plus what it has collected so far.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    step: AppStep,
    board: EmotionBoard,
    song: Option<SongResult>,
    processing: bool,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            step: AppStep::Landing,
            board: EmotionBoard::new(),
            song: None,
            processing: false,
        }
    }

    pub fn step(&self) -> AppStep {
        self.step
    }

    pub fn board(&self) -> &EmotionBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut EmotionBoard {
        &mut self.board
    }

    pub fn song(&self) -> Option<&SongResult> {
        self.song.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn start(&mut self) -> Result<(), AppError> {
        self.transition(AppStep::Landing, AppStep::Listening)
    }

    pub fn begin_input(&mut self) -> Result<(), AppError> {
        self.transition(AppStep::Listening, AppStep::EmotionInput)
    }

    pub fn finalize_emotions(&mut self) -> Result<(), AppError> {
        if self.step == AppStep::EmotionInput && self.board.is_empty() {
            return Err(AppError::Workflow("Enter at least one emotion first".into()));
        }
        self.transition(AppStep::EmotionInput, AppStep::Board)
    }

    /// Enter the generating step. Refused while another generation is running.
    pub fn begin_generation(&mut self) -> Result<(), AppError> {
        if self.processing {
            return Err(AppError::Workflow("A song is already being generated".into()));
        }
        self.transition(AppStep::Board, AppStep::Generating)?;
        self.processing = true;
        Ok(())
    }

    /// Record the outcome of a generation attempt.
    ///
    /// Success moves to the result step. Failure goes back to the board and hands the
    /// error back; collected emotions and any earlier song are untouched.
    pub fn complete_generation(
        &mut self,
        outcome: Result<SongResult, AppError>,
    ) -> Result<SongResult, AppError> {
        self.processing = false;
        match outcome {
            Ok(song) => {
                self.song = Some(song.clone());
                self.step = AppStep::Result;
                Ok(song)
            }
            Err(e) => {
                crate::app_log!("[flow] generation failed, back to board: {e}");
                self.step = AppStep::Board;
                Err(e)
            }
        }
    }

    /// Back to the landing screen with nothing collected.
    pub fn restart(&mut self) {
        self.step = AppStep::Landing;
        self.board.clear();
        self.song = None;
        self.processing = false;
    }

    fn transition(&mut self, from: AppStep, to: AppStep) -> Result<(), AppError> {
        if self.step != from {
            return Err(AppError::Workflow(format!(
                "Cannot move to {to:?} from {:?}",
                self.step
            )));
        }
        self.step = to;
        Ok(())
    }
}

/// Decode the current song's audio and start it on `session`.
///
/// Never mutates the workflow, so a failed attempt can simply be retried.
pub fn play_current_song(
    workflow: &Workflow,
    session: &PlaybackSession,
    sample_rate: u32,
    num_channels: u16,
) -> Result<PlaybackHandle, AppError> {
    let audio = workflow
        .song()
        .and_then(|song| song.audio_base64.as_deref())
        .ok_or_else(|| AppError::Playback("No song audio to play".into()))?;
    let buffer = decode_song_audio(audio, sample_rate, num_channels)?;
    session.resume()?;
    session.play(Arc::new(buffer))
}
