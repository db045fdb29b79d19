use std::sync::{Arc, Mutex};

use recap_pulse::{yt::TranscriptProvider, FetchError};

#[derive(Clone)]
pub struct MockTranscriptProvider {
    pub transcript: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_for: Option<String>,
}

impl MockTranscriptProvider {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_for: None,
        }
    }

    /// Fails transcript fetches for one specific video id.
    pub fn failing_for(transcript: &str, video_id: &str) -> Self {
        Self {
            fail_for: Some(video_id.to_string()),
            ..Self::new(transcript)
        }
    }
}

impl TranscriptProvider for MockTranscriptProvider {
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(video_id.to_string());
        if self.fail_for.as_deref() == Some(video_id) {
            return Err(FetchError::TranscriptsDisabled {
                video_id: video_id.to_string(),
            });
        }
        Ok(self.transcript.clone())
    }
}
