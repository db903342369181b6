pub mod gemini;

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::emotion::{join_texts, UserEmotion};
use crate::error::AppError;
use crate::flow::Workflow;

/// Title and lyrics returned by the lyric model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyrics {
    pub title: String,
    pub lyrics: String,
}

/// A finished song: lyrics plus the speech model's base64 PCM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongResult {
    pub title: String,
    pub lyrics: String,
    pub audio_base64: Option<String>,
}

/// Backend that writes lyrics and sings them.
#[allow(async_fn_in_trait)]
pub trait SongGenerator: Send + Sync {
    async fn generate_lyrics(&self, emotions: &[UserEmotion]) -> Result<Lyrics, AppError>;

    /// Returns base64 headerless 16-bit PCM.
    async fn generate_song_audio(&self, lyrics: &str) -> Result<String, AppError>;

    fn provider_name(&self) -> &str;
}

/// Build the lyric prompt around the participants' reactions.
pub fn build_lyrics_prompt(emotions: &[UserEmotion]) -> String {
    format!(
        "다음은 학생들이 연주를 듣고 느낀 감정들입니다: [{}]\n\
         이 감정들을 하나로 엮어 서정적이고 시적인 노래 가사를 만들어주세요.\n\
         \n\
         가사의 형식과 어조는 다음 예시를 참고하세요:\n\
         \"이제 모두 세월 따라 흔적도 없이 변해갔지만\n\
         덕수궁 돌담길엔 아직 남아 있어요\n\
         다정히 걸어가는 연인들\n\
         언젠가는 우리 모두 세월을 따라 떠나가지만\n\
         언덕 밑 정동길엔 아직 남아있어요\n\
         눈 덮인 조그만 교회당...\"\n\
         \n\
         [요구사항]\n\
         1. '1절', '후렴' 같은 명시적인 구분 기호는 넣지 마세요.\n\
         2. 문장이 자연스럽게 이어지는 서사적인 발라드 형식으로 작성하세요.\n\
         3. 학생들이 쓴 단어와 감정들을 가사의 중심 소재로 사용하여 그들의 마음이 느껴지게 하세요.\n\
         4. 특정한 장소나 시각적 이미지를 묘사하여 한 편의 그림 같은 가사를 만드세요.",
        join_texts(emotions)
    )
}

pub fn build_speech_prompt(lyrics: &str) -> String {
    format!("아름답고 감성적인 목소리로 이 가사를 노래하듯 읽어주세요: {lyrics}")
}

/// Produce the lyrics, then the sung audio. The two calls are strictly sequential.
pub async fn compose<G: SongGenerator>(
    generator: &G,
    emotions: &[UserEmotion],
) -> Result<SongResult, AppError> {
    let lyrics = generator.generate_lyrics(emotions).await?;
    crate::app_log!(
        "[song] lyrics ready provider={} title_len={} lyrics_len={}",
        generator.provider_name(),
        lyrics.title.chars().count(),
        lyrics.lyrics.chars().count()
    );
    let audio_base64 = generator.generate_song_audio(&lyrics.lyrics).await?;
    crate::app_log!("[song] audio ready base64_len={}", audio_base64.len());
    Ok(SongResult {
        title: lyrics.title,
        lyrics: lyrics.lyrics,
        audio_base64: Some(audio_base64),
    })
}

/// Run one generation attempt against the shared workflow.
///
/// The lock is only taken to begin and to complete, never across the upstream calls.
/// On failure the workflow returns to the board with every emotion intact.
pub async fn generate_song<G: SongGenerator>(
    workflow: &Mutex<Workflow>,
    generator: &G,
) -> Result<SongResult, AppError> {
    let emotions = {
        let mut workflow = lock_workflow(workflow);
        workflow.begin_generation()?;
        workflow.board().emotions().to_vec()
    };
    let pending = PendingGeneration {
        workflow,
        armed: true,
    };
    let outcome = compose(generator, &emotions).await;
    pending.complete(outcome)
}

fn lock_workflow(workflow: &Mutex<Workflow>) -> MutexGuard<'_, Workflow> {
    workflow.lock().unwrap_or_else(|e| e.into_inner())
}

/// Puts the workflow back on the board if the attempt is dropped before it completes.
struct PendingGeneration<'a> {
    workflow: &'a Mutex<Workflow>,
    armed: bool,
}

impl PendingGeneration<'_> {
    fn complete(mut self, outcome: Result<SongResult, AppError>) -> Result<SongResult, AppError> {
        self.armed = false;
        let result = lock_workflow(self.workflow).complete_generation(outcome);
        result
    }
}

impl Drop for PendingGeneration<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        crate::app_log!("[song] generation dropped before completing");
        let mut workflow = lock_workflow(self.workflow);
        if workflow.is_processing() {
            let _ = workflow.complete_generation(Err(AppError::Workflow(
                "Song generation was cancelled".into(),
            )));
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::testing::FakeGenerator;
    use super::*;
    use crate::flow::AppStep;

    fn board_workflow() -> Mutex<Workflow> {
        let mut workflow = Workflow::new();
        workflow.start().unwrap();
        workflow.begin_input().unwrap();
        workflow.board_mut().add("따뜻해요");
        workflow.board_mut().add("별이 떠오르는 기분");
        workflow.finalize_emotions().unwrap();
        Mutex::new(workflow)
    }

    /// Never answers, like a request stuck upstream.
    struct StalledGenerator;

    impl SongGenerator for StalledGenerator {
        async fn generate_lyrics(&self, _emotions: &[UserEmotion]) -> Result<Lyrics, AppError> {
            std::future::pending().await
        }

        async fn generate_song_audio(&self, _lyrics: &str) -> Result<String, AppError> {
            std::future::pending().await
        }

        fn provider_name(&self) -> &str {
            "stalled"
        }
    }

    #[test]
    fn test_lyrics_prompt_embeds_joined_emotions() {
        let mut board = crate::emotion::EmotionBoard::new();
        board.add("warm");
        board.add("starry");
        let prompt = build_lyrics_prompt(board.emotions());
        assert!(prompt.contains("[warm, starry]"));
        assert!(prompt.contains("[요구사항]"));
    }

    #[test]
    fn test_speech_prompt_wraps_lyrics() {
        assert!(build_speech_prompt("la la").ends_with(": la la"));
    }

    #[tokio::test]
    async fn test_generate_song_success() {
        let shared = board_workflow();
        let generator = FakeGenerator::ok("AAA=");

        let song = generate_song(&shared, &generator).await.unwrap();
        let workflow = shared.lock().unwrap();
        assert_eq!(song.title, "정동길");
        assert_eq!(song.audio_base64.as_deref(), Some("AAA="));
        assert_eq!(workflow.step(), AppStep::Result);
        assert_eq!(workflow.song(), Some(&song));
        assert!(!workflow.is_processing());

        let prompt = generator.seen_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("[따뜻해요, 별이 떠오르는 기분]"));
    }

    #[tokio::test]
    async fn test_lyrics_failure_skips_speech_and_keeps_emotions() {
        let shared = board_workflow();
        let mut generator = FakeGenerator::ok("AAA=");
        generator.lyrics = Err("quota exceeded".into());

        let err = generate_song(&shared, &generator).await.unwrap_err();
        let workflow = shared.lock().unwrap();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(generator.audio_calls.load(Ordering::SeqCst), 0);
        assert_eq!(workflow.step(), AppStep::Board);
        assert_eq!(workflow.board().len(), 2);
        assert!(workflow.song().is_none());
        assert!(!workflow.is_processing());
    }

    #[tokio::test]
    async fn test_speech_failure_discards_whole_attempt() {
        let shared = board_workflow();
        let mut generator = FakeGenerator::ok("AAA=");
        generator.audio = Err("Audio generation failed".into());

        assert!(generate_song(&shared, &generator).await.is_err());
        let workflow = shared.lock().unwrap();
        assert_eq!(workflow.step(), AppStep::Board);
        assert!(workflow.song().is_none());
        assert_eq!(workflow.board().len(), 2);
    }

    #[tokio::test]
    async fn test_generate_requires_board_step() {
        let shared = Mutex::new(Workflow::new());
        let generator = FakeGenerator::ok("AAA=");
        let err = generate_song(&shared, &generator).await.unwrap_err();
        assert!(matches!(err, AppError::Workflow(_)));
        assert_eq!(shared.lock().unwrap().step(), AppStep::Landing);
    }

    #[tokio::test]
    async fn test_dropped_generation_returns_to_board() {
        let shared = board_workflow();

        let attempt = generate_song(&shared, &StalledGenerator);
        let timed_out = tokio::time::timeout(Duration::from_millis(20), attempt).await;
        assert!(timed_out.is_err());

        let workflow = shared.lock().unwrap();
        assert_eq!(workflow.step(), AppStep::Board);
        assert!(!workflow.is_processing());
        assert_eq!(workflow.board().len(), 2);
        assert!(workflow.song().is_none());
    }

    #[tokio::test]
    async fn test_can_retry_after_dropped_generation() {
        let shared = board_workflow();
        let attempt = generate_song(&shared, &StalledGenerator);
        assert!(tokio::time::timeout(Duration::from_millis(20), attempt)
            .await
            .is_err());

        let song = generate_song(&shared, &FakeGenerator::ok("AAA=")).await.unwrap();
        assert_eq!(shared.lock().unwrap().song(), Some(&song));
    }
}
