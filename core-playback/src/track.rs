//! Catalogue track descriptors.

use serde::{Deserialize, Serialize};

/// A streamable catalogue entry.
///
/// Tracks come from the host's catalogue and are never modified by the core.
/// `duration_seconds` may be `0` when the catalogue does not know it; the
/// resolver-reported duration takes precedence once a stream is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Uploader or artist label.
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            uploader: String::new(),
            duration_seconds: 0,
            thumbnail_url: None,
        }
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = uploader.into();
        self
    }

    pub fn with_duration_seconds(mut self, seconds: u64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_seconds.saturating_mul(1000)
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration_seconds > 0
    }
}
