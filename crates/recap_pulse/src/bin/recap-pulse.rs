use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;

use recap_pulse::{
    gemini::GeminiClient,
    sources::{SourceKind, SourceRegistry, WatchSource},
    tracing::init_tracing_subscriber,
    yt::{feed::RssFeedClient, parse_video_id, transcript::TimedTextClient},
    RecapProcessorBuilder,
};

#[derive(Parser)]
#[command(
    name = "recap-pulse",
    about = "YouTube transcript summarizer and stock-sentiment monitor"
)]
struct Cli {
    /// Result store document
    #[arg(long, env = "VIDEO_JSON_PATH", default_value = "video_dict.json")]
    store_path: PathBuf,

    /// Watch-state document for the new-upload monitor
    #[arg(long, env = "WATCH_STATE_PATH", default_value = "watch_state.json")]
    state_path: PathBuf,

    /// Watched sources registry
    #[arg(long, env = "SOURCES_PATH", default_value = "sources.json")]
    sources_path: PathBuf,

    /// Rolling dedup window cap per source
    #[arg(long, env = "DEDUP_WINDOW", default_value = "50")]
    window: usize,

    /// Feed items fetched per source per poll
    #[arg(long, env = "FETCH_LIMIT", default_value = "5")]
    fetch_limit: usize,

    /// Output language for monitor-driven analyses
    #[arg(long, env = "OUTPUT_LANGUAGE", default_value = "English")]
    language: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a new channel or playlist
    Add {
        source_id: String,
        /// Display name used in logs and listings
        #[arg(long)]
        name: Option<String>,
        /// Treat the id as a playlist rather than a channel
        #[arg(long)]
        playlist: bool,
        /// Per-source fetch limit override
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List watched sources
    List,
    /// Poll watched sources and analyze new uploads (the default command)
    Check {
        /// Check only this source id
        #[arg(long)]
        source: Option<String>,
        /// Override the fetch limit for this run
        #[arg(long)]
        limit: Option<usize>,
        /// Gemini API key
        #[arg(long, env = "API_KEY")]
        api_key: Option<String>,
    },
    /// Summarize a single video, printing the summary as it streams
    Summarize {
        /// Video URL or bare video id
        video: String,
        #[arg(long, default_value = "English")]
        language: String,
        /// Do not cache the generated summary
        #[arg(long)]
        no_cache: bool,
        /// Gemini API key
        #[arg(long, env = "API_KEY")]
        api_key: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing_subscriber()?;

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Check {
        source: None,
        limit: None,
        api_key: std::env::var("API_KEY").ok(),
    });

    match command {
        Command::Add {
            source_id,
            name,
            playlist,
            limit,
        } => {
            let mut registry = SourceRegistry::load(&cli.sources_path)
                .context("Failed to load sources registry")?;
            let kind = if playlist {
                SourceKind::Playlist
            } else {
                SourceKind::Channel
            };
            registry.upsert(WatchSource {
                id: source_id.clone(),
                kind,
                name,
                fetch_limit: limit,
            });
            registry
                .persist(&cli.sources_path)
                .context("Failed to persist sources registry")?;
            println!("Watching {source_id}");
        }

        Command::List => {
            let registry = SourceRegistry::load(&cli.sources_path)
                .context("Failed to load sources registry")?;
            if registry.is_empty() {
                println!("No sources watched yet. Add one with `recap-pulse add <source-id>`.");
            }
            for source in registry.iter() {
                let kind = match source.kind {
                    SourceKind::Channel => "channel",
                    SourceKind::Playlist => "playlist",
                };
                println!("{}\t{}\t{}", source.id, kind, source.label());
            }
        }

        Command::Check {
            source,
            limit,
            api_key,
        } => {
            let api_key = api_key.context(
                "API_KEY is required: pass --api-key or set the API_KEY environment variable",
            )?;
            let registry = SourceRegistry::load(&cli.sources_path)
                .context("Failed to load sources registry")?;

            let selected: Vec<WatchSource> = match source {
                Some(ref id) => registry
                    .get(id)
                    .cloned()
                    .map(|s| vec![s])
                    .with_context(|| format!("Source {id} is not watched; add it first"))?,
                None => registry.as_slice().to_vec(),
            };

            let processor = RecapProcessorBuilder::new(&cli.store_path, &cli.state_path)
                .transcripts(TimedTextClient::default())
                .generator(GeminiClient::new(api_key))
                .feed(RssFeedClient::default())
                .window(cli.window)
                .fetch_limit(limit.unwrap_or(cli.fetch_limit))
                .language(&cli.language)
                .build();

            processor.check(&selected).await?;
        }

        Command::Summarize {
            video,
            language,
            no_cache,
            api_key,
        } => {
            let api_key = api_key.context(
                "API_KEY is required: pass --api-key or set the API_KEY environment variable",
            )?;
            let video_id = parse_video_id(&video)
                .context("Not a recognizable YouTube video URL or id")?;

            let processor = RecapProcessorBuilder::new(&cli.store_path, &cli.state_path)
                .transcripts(TimedTextClient::default())
                .generator(GeminiClient::new(api_key))
                .feed(RssFeedClient::default())
                .window(cli.window)
                .fetch_limit(cli.fetch_limit)
                .language(&cli.language)
                .build();

            let mut fragments = processor
                .summarize(&video_id, &language, !no_cache)
                .await?;
            while let Some(fragment) = fragments.next().await {
                let text = fragment?;
                print!("{text}");
                io::stdout().flush()?;
            }
            println!();
        }
    }

    Ok(())
}
