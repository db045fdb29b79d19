use std::sync::{Arc, Mutex};

use futures::{stream, StreamExt};
use recap_pulse::{FragmentStream, TextGenerator};

#[derive(Clone)]
pub struct MockGenerator {
    pub fragments: Vec<String>,
    pub oneshot: String,
    pub stream_calls: Arc<Mutex<Vec<String>>>,
    pub oneshot_calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockGenerator {
    pub fn new(fragments: &[&str], oneshot: &str) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            oneshot: oneshot.to_string(),
            stream_calls: Arc::new(Mutex::new(Vec::new())),
            oneshot_calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(&[], "")
        }
    }
}

impl TextGenerator for MockGenerator {
    const GENERATION_MODEL: &'static str = "mock-gemma";

    type Error = anyhow::Error;

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, Self::Error> {
        self.stream_calls.lock().unwrap().push(prompt.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        let fragments: Vec<anyhow::Result<String>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(stream::iter(fragments).boxed())
    }

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.oneshot_calls.lock().unwrap().push(prompt.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.oneshot.clone())
    }
}
