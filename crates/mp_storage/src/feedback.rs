use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mp_core::{Feedback, FeedbackSink, Rating, Result};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use tracing::info;

const RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStatistics {
    pub total_feedback: usize,
    /// Share of positive ratings in percent, one decimal
    pub positive_ratio: f64,
    pub recent_feedback: usize,
}

/// Append-only log of reader feedback.
#[derive(Debug, Default)]
pub struct FeedbackLog {
    entries: RwLock<Vec<Feedback>>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, feedback: Feedback) {
        info!("💬 Feedback on {}: {:?}", feedback.article_id, feedback.rating);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(feedback);
    }

    pub fn all(&self) -> Vec<Feedback> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> FeedbackStatistics {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let total = entries.len();
        if total == 0 {
            return FeedbackStatistics {
                total_feedback: 0,
                positive_ratio: 0.0,
                recent_feedback: 0,
            };
        }

        let positive = entries.iter().filter(|f| f.rating == Rating::Positive).count();
        let cutoff = now - Duration::days(RECENT_DAYS);
        let recent = entries.iter().filter(|f| f.timestamp > cutoff).count();
        let ratio = positive as f64 / total as f64 * 100.0;

        FeedbackStatistics {
            total_feedback: total,
            positive_ratio: (ratio * 10.0).round() / 10.0,
            recent_feedback: recent,
        }
    }
}

#[async_trait]
impl FeedbackSink for FeedbackLog {
    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.record(feedback.clone());
        Ok(())
    }
}
