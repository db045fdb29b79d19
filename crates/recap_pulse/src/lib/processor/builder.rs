use std::path::PathBuf;

use crate::{
    llm::generator::TextGenerator,
    yt::{FeedProvider, TranscriptProvider},
    RecapProcessor,
};

pub struct RecapProcessorBuilder<T = (), G = (), F = ()> {
    store_path: PathBuf,
    state_path: PathBuf,
    window: usize,
    fetch_limit: usize,
    language: String,
    transcripts: T,
    generator: G,
    feed: F,
}

impl RecapProcessorBuilder {
    pub fn new(store_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            state_path: state_path.into(),
            window: recap_store::DEFAULT_WINDOW,
            fetch_limit: 5,
            language: "English".to_string(),
            transcripts: (),
            generator: (),
            feed: (),
        }
    }
}

impl<T, G, F> RecapProcessorBuilder<T, G, F> {
    pub fn transcripts<T2: TranscriptProvider>(
        self,
        transcripts: T2,
    ) -> RecapProcessorBuilder<T2, G, F> {
        RecapProcessorBuilder {
            store_path: self.store_path,
            state_path: self.state_path,
            window: self.window,
            fetch_limit: self.fetch_limit,
            language: self.language,
            transcripts,
            generator: self.generator,
            feed: self.feed,
        }
    }

    pub fn generator<G2: TextGenerator>(self, generator: G2) -> RecapProcessorBuilder<T, G2, F> {
        RecapProcessorBuilder {
            store_path: self.store_path,
            state_path: self.state_path,
            window: self.window,
            fetch_limit: self.fetch_limit,
            language: self.language,
            transcripts: self.transcripts,
            generator,
            feed: self.feed,
        }
    }

    pub fn feed<F2: FeedProvider>(self, feed: F2) -> RecapProcessorBuilder<T, G, F2> {
        RecapProcessorBuilder {
            store_path: self.store_path,
            state_path: self.state_path,
            window: self.window,
            fetch_limit: self.fetch_limit,
            language: self.language,
            transcripts: self.transcripts,
            generator: self.generator,
            feed,
        }
    }

    /// Rolling dedup window cap per source.
    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Default number of feed items fetched per poll.
    pub fn fetch_limit(mut self, fetch_limit: usize) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    /// Output language for monitor-driven analyses.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl<T, G, F> RecapProcessorBuilder<T, G, F>
where
    T: TranscriptProvider,
    G: TextGenerator,
    F: FeedProvider,
{
    pub fn build(self) -> RecapProcessor<T, G, F> {
        RecapProcessor {
            store_path: self.store_path,
            state_path: self.state_path,
            window: self.window,
            fetch_limit: self.fetch_limit,
            language: self.language,
            transcripts: self.transcripts,
            generator: self.generator,
            feed: self.feed,
        }
    }
}
