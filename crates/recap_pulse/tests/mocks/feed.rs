use std::sync::{Arc, Mutex};

use recap_pulse::{
    sources::WatchSource,
    yt::{FeedItem, FeedProvider},
    FetchError,
};

#[derive(Clone)]
pub struct MockFeedProvider {
    pub items: Vec<FeedItem>,
    pub calls: Arc<Mutex<Vec<(String, usize)>>>,
    pub fail_with: Option<String>,
}

impl MockFeedProvider {
    /// Items are served newest first, matching the real feed order.
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(Vec::new())
        }
    }
}

pub fn feed_item(id: &str, title: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: title.to_string(),
        published_at: None,
        url: format!("https://www.youtube.com/watch?v={id}"),
    }
}

impl FeedProvider for MockFeedProvider {
    async fn latest_items(
        &self,
        source: &WatchSource,
        limit: usize,
    ) -> Result<Vec<FeedItem>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((source.id.clone(), limit));
        if let Some(ref msg) = self.fail_with {
            return Err(FetchError::Retrieval(msg.clone()));
        }
        Ok(self.items.iter().take(limit).cloned().collect())
    }
}
