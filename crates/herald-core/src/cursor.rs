//! Opaque pagination cursor for the news API.
//!
//! A cursor is the query that produced a page plus the page position,
//! serialized as JSON and encoded as URL-safe base64 without padding.
//! Pages are produced by re-running the scrape with a larger limit and
//! slicing, so a cursor stays valid across process restarts.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{GeoContext, MAX_RESULT_LIMIT, TopicSlug};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub topic_filters: Vec<TopicSlug>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text_query: Option<String>,
    pub since_timestamp: DateTime<Utc>,
    pub page_size: usize,
    /// 1-based.
    pub page_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_context: Option<GeoContext>,
}

impl Cursor {
    pub fn encode(&self) -> Result<String, AppError> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode and validate a cursor string.
    pub fn decode(token: &str) -> Result<Self, AppError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| AppError::InvalidCursor(format!("not base64: {e}")))?;
        let cursor: Cursor = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::InvalidCursor(format!("bad payload: {e}")))?;
        cursor.validate()?;
        Ok(cursor)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.page_size == 0 || self.page_size > MAX_RESULT_LIMIT as usize {
            return Err(AppError::InvalidCursor(format!(
                "page size {} outside 1..={MAX_RESULT_LIMIT}",
                self.page_size
            )));
        }
        if self.page_number == 0 {
            return Err(AppError::InvalidCursor("page number must be at least 1".into()));
        }
        Ok(())
    }

    /// How many items the scrape must produce to cover this page, capped at
    /// the engine maximum.
    pub fn effective_limit(&self) -> usize {
        self.page_size
            .saturating_mul(self.page_number)
            .min(MAX_RESULT_LIMIT as usize)
    }

    /// Index range of this page within a scrape of [`effective_limit`](Self::effective_limit) items.
    pub fn page_range(&self, available: usize) -> std::ops::Range<usize> {
        let start = self
            .page_size
            .saturating_mul(self.page_number - 1)
            .min(available);
        let end = self.page_size.saturating_mul(self.page_number).min(available);
        start..end
    }

    /// The cursor for the page after this one.
    pub fn next(&self) -> Self {
        Self {
            page_number: self.page_number + 1,
            ..self.clone()
        }
    }
}

/// More pages may exist only when the scrape filled its limit and that
/// limit was below the engine maximum.
pub fn has_more(effective_limit: usize, returned: usize) -> bool {
    effective_limit < MAX_RESULT_LIMIT as usize && returned == effective_limit
}
