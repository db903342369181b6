use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Mood tag shown on the board. Picked at random; it carries no analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Calm,
    Excited,
    Sad,
}

impl Sentiment {
    pub const ALL: [Sentiment; 5] = [
        Sentiment::Positive,
        Sentiment::Calm,
        Sentiment::Excited,
        Sentiment::Sad,
        Sentiment::Neutral,
    ];

    pub fn random() -> Self {
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Sentiment::Neutral)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEmotion {
    pub id: String,
    pub text: String,
    pub sentiment: Sentiment,
}

static NEXT_EMOTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// The participants' reactions, in the order they were entered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmotionBoard {
    emotions: Vec<UserEmotion>,
}

impl EmotionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reaction. Blank input is ignored.
    pub fn add(&mut self, text: &str) -> Option<&UserEmotion> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let seq = NEXT_EMOTION_SEQ.fetch_add(1, Ordering::Relaxed);
        self.emotions.push(UserEmotion {
            id: format!("{}-{seq}", Utc::now().timestamp_millis()),
            text: text.to_string(),
            sentiment: Sentiment::random(),
        });
        self.emotions.last()
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.emotions.len();
        self.emotions.retain(|e| e.id != id);
        self.emotions.len() != before
    }

    pub fn emotions(&self) -> &[UserEmotion] {
        &self.emotions
    }

    pub fn len(&self) -> usize {
        self.emotions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emotions.is_empty()
    }

    pub fn clear(&mut self) {
        self.emotions.clear();
    }
}

/// Comma-joined reaction texts, as embedded in the lyrics prompt.
pub fn join_texts(emotions: &[UserEmotion]) -> String {
    emotions
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
