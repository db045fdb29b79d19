pub mod builder;

use std::path::PathBuf;

use anyhow::Context;
use futures::{stream, StreamExt};
use recap_store::{DedupTracker, ResultStore};
use serde_json::Value;

use crate::{
    llm::generator::TextGenerator,
    repair,
    sources::WatchSource,
    tee::{StoreSink, StreamTee},
    yt::{FeedItem, FeedProvider, TranscriptProvider},
};

const TRANSCRIPT_KEY: &str = "transcript";
const SUMMARY_KEY: &str = "summary";
const SENTIMENT_KEY: &str = "stock_sentiment";
const METADATA_KEY: &str = "metadata";

const SUMMARY_PROMPT: &str = include_str!("./llm/prompts/summary.txt");
const SENTIMENT_PROMPT: &str = include_str!("./llm/prompts/sentiment.txt");

/// Fragment stream handed to the consumer: either a live generation teed into
/// the store, or a cached summary replayed word by word.
pub type SummaryStream = futures::stream::BoxStream<'static, anyhow::Result<String>>;

/// The core recap pipeline: answers summary requests from the cache when it
/// can, otherwise drives transcript fetch → generation → write-through, and
/// runs the periodic new-upload check over the watched sources.
pub struct RecapProcessor<T, G, F> {
    store_path: PathBuf,
    state_path: PathBuf,
    window: usize,
    fetch_limit: usize,
    language: String,
    transcripts: T,
    generator: G,
    feed: F,
}

impl<T, G, F> RecapProcessor<T, G, F>
where
    T: TranscriptProvider,
    G: TextGenerator,
    F: FeedProvider,
{
    /// Returns the summary of `video_id` in `language` as a fragment stream.
    ///
    /// A cached summary is replayed without touching the backend. On a miss
    /// the generated fragments are forwarded to the caller as they arrive and,
    /// when `store_result` is set, committed to the store once the backend
    /// signals completion. Dropping the stream early discards the partial
    /// result.
    #[tracing::instrument(skip(self))]
    pub async fn summarize(
        &self,
        video_id: &str,
        language: &str,
        store_result: bool,
    ) -> anyhow::Result<SummaryStream> {
        let mut store = ResultStore::load(&self.store_path)
            .context("Failed to load result store")?;

        if let Some(Value::String(cached)) = store.get(&[video_id, SUMMARY_KEY, language]) {
            tracing::debug!(video_id, language, "Replaying cached summary");
            return Ok(replay_fragments(cached));
        }

        let transcript = self.transcript_for(&mut store, video_id).await?;

        let prompt = SUMMARY_PROMPT
            .replace("{language}", language)
            .replace("{transcript}", &transcript);

        let fragments = self
            .generator
            .generate_stream(&prompt)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start summary generation: {e:?}"))?;

        let sink = StoreSink::new(&self.store_path, [video_id, SUMMARY_KEY, language]);
        Ok(StreamTee::new(fragments, sink, store_result).boxed())
    }

    /// Polls every watched source for new uploads and analyzes each one. A
    /// failure for one video or source is logged and skipped; the loop always
    /// continues.
    #[tracing::instrument(skip_all)]
    pub async fn check(&self, sources: &[WatchSource]) -> anyhow::Result<()> {
        if sources.is_empty() {
            tracing::info!("No sources to check");
            return Ok(());
        }

        let mut tracker = DedupTracker::load(&self.state_path, self.window)
            .context("Failed to load watch state")?;

        for source in sources {
            let limit = source.fetch_limit.unwrap_or(self.fetch_limit);
            let items = match self.feed.latest_items(source, limit).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = ?e, source = %source.label(), "Failed to fetch feed, skipping source");
                    continue;
                }
            };

            let fresh: Vec<&FeedItem> = items
                .iter()
                .filter(|item| tracker.is_new(&source.id, &item.id))
                .collect();
            tracing::info!(
                source = %source.label(),
                fetched = items.len(),
                new = fresh.len(),
                "Checked source"
            );

            // The feed arrives newest first; analyze oldest first so that an
            // interrupted run retries the most recent uploads on the next
            // pass. Failed items stay outside the window and are retried too.
            for item in fresh.into_iter().rev() {
                let analysis = match self.analyze_item(item).await {
                    Ok(analysis) => analysis,
                    Err(e) => {
                        tracing::warn!(error = ?e, video_id = %item.id, "Failed to analyze video, skipping");
                        continue;
                    }
                };

                tracker.update(&source.id, &[item.id.as_str()]);
                tracker.record_analysis(&source.id, &item.id, analysis);
                tracker
                    .persist(&self.state_path)
                    .context("Failed to persist watch state")?;
            }
        }

        Ok(())
    }

    /// Transcript + metadata caching and single-shot sentiment extraction for
    /// one upload. Raw backend output that cannot be repaired into structured
    /// data is never committed to the store.
    #[tracing::instrument(skip(self, item), fields(video_id = %item.id))]
    async fn analyze_item(&self, item: &FeedItem) -> anyhow::Result<Value> {
        let mut store = ResultStore::load(&self.store_path)
            .context("Failed to load result store")?;
        let video_id = item.id.as_str();
        let language = self.language.as_str();

        if !store.exists(&[video_id, METADATA_KEY]) {
            store.set(
                &[video_id, METADATA_KEY],
                serde_json::json!({
                    "title": item.title,
                    "url": item.url,
                    "published_at": item.published_at,
                    "processed_on": chrono::Utc::now(),
                }),
            );
        }

        let transcript = self.transcript_for(&mut store, video_id).await?;

        if let Some(cached) = store.get(&[video_id, SENTIMENT_KEY, language]) {
            tracing::debug!("Sentiment already cached");
            return Ok(cached.clone());
        }

        let prompt = SENTIMENT_PROMPT
            .replace("{language}", language)
            .replace("{transcript}", &transcript);

        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to generate sentiment table: {e:?}"))?;

        let table = repair::parse_structured(&raw)
            .inspect_err(|e| tracing::warn!(raw = %e.raw, "Sentiment output could not be repaired"))?;

        store.set(&[video_id, SENTIMENT_KEY, language], table.clone());
        store
            .persist(&self.store_path)
            .context("Failed to persist sentiment result")?;

        Ok(table)
    }

    /// Returns the cached transcript, or fetches and persists it.
    async fn transcript_for(
        &self,
        store: &mut ResultStore,
        video_id: &str,
    ) -> anyhow::Result<String> {
        if let Some(Value::String(cached)) = store.get(&[video_id, TRANSCRIPT_KEY]) {
            tracing::debug!(video_id, "Transcript already cached");
            return Ok(cached.clone());
        }

        let transcript = self
            .transcripts
            .fetch_transcript(video_id)
            .await
            .inspect_err(|e| tracing::warn!(error = ?e, video_id, "Failed to fetch transcript"))?;

        store.set(&[video_id, TRANSCRIPT_KEY], Value::String(transcript.clone()));
        store
            .persist(&self.store_path)
            .context("Failed to persist transcript")?;
        Ok(transcript)
    }
}

/// Replays a cached summary as a word-fragment stream, so cached and live
/// results reach the consumer through the same surface.
fn replay_fragments(text: &str) -> SummaryStream {
    let words: Vec<anyhow::Result<String>> = text
        .split(' ')
        .map(|word| Ok(format!("{word} ")))
        .collect();
    stream::iter(words).boxed()
}
