use std::env;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use corpus::{BookTable, VerseAddress};
use projection::PixelCoordinate;
use session::{inspect_pixel, ChangelogClient, MarkerSession, SimilarityClient};
use store::{DatasetSource, StoreConfig, StoreError, VerseResolver};

#[derive(Parser)]
#[command(
    name = "explorer",
    about = "Explore the verse similarity map from the terminal"
)]
struct Cli {
    /// Backend base URL (default: $EXPLORER_BASE_URL, then localhost:8000).
    #[arg(long)]
    base_url: Option<String>,

    /// Cache directory (default: $EXPLORER_CACHE_DIR, then .explorer-cache).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Populate the verse store from a local dataset file instead of the network.
    #[arg(long)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up the verse pair under a pixel coordinate.
    Inspect {
        #[arg(long)]
        x: i64,
        #[arg(long)]
        y: i64,
    },

    /// Run a similarity search and print the placed markers.
    Search {
        #[arg(long)]
        book: String,
        #[arg(long)]
        chapter: u32,
        #[arg(long)]
        verse: u32,
        /// How many nearest verses to request.
        #[arg(long, default_value_t = 50)]
        count: usize,
    },

    /// Show releases published since the last run.
    Changelog,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = cli
        .base_url
        .or_else(|| env::var("EXPLORER_BASE_URL").ok())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let cache_dir = cli
        .cache_dir
        .or_else(|| env::var("EXPLORER_CACHE_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(".explorer-cache"));

    if let Err(err) = tokio::fs::create_dir_all(&cache_dir).await {
        warn!("failed to create cache dir: {err}");
    }

    let http = reqwest::Client::new();

    match cli.command {
        Command::Inspect { x, y } => {
            let resolver = ready_resolver(&http, &base_url, &cache_dir, cli.dataset).await?;
            let report = inspect_pixel(&resolver, PixelCoordinate::clamped(x, y)).await?;
            println!("{report}");
        }

        Command::Search {
            book,
            chapter,
            verse,
            count,
        } => {
            let resolver = ready_resolver(&http, &base_url, &cache_dir, cli.dataset).await?;
            let similarity = SimilarityClient::new(http.clone(), base_url.clone());
            let mut session = MarkerSession::new(BookTable::canonical(), resolver, similarity);

            let address = VerseAddress::new(book, chapter, verse);
            let placed = session.search(&address, count).await?;
            println!("{placed} markers for {address}");
            for (index, marker) in session.current_markers().iter().enumerate() {
                println!(
                    "{:>3}. {} <-> {} (distance {:.2}) at pixel {}",
                    index + 1,
                    marker.details.query_verse.citation,
                    marker.details.matched_verse.citation,
                    marker.details.distance,
                    marker.position,
                );
            }
        }

        Command::Changelog => {
            let url = format!("{}/dist/changelog.json", base_url.trim_end_matches('/'));
            let client =
                ChangelogClient::new(http.clone(), url, cache_dir.join("last_seen_version"));
            let unseen = client.check().await?;
            if unseen.is_empty() {
                println!("No new releases.");
            } else {
                for release in unseen {
                    println!("## {}\n\n{}\n", release.version, release.notes);
                }
            }
        }
    }

    Ok(())
}

async fn ready_resolver(
    http: &reqwest::Client,
    base_url: &str,
    cache_dir: &Path,
    dataset: Option<PathBuf>,
) -> Result<VerseResolver, StoreError> {
    let source = match dataset {
        Some(path) => DatasetSource::File { path },
        None => DatasetSource::Remote {
            url: format!("{}/dist/kjv.json", base_url.trim_end_matches('/')),
        },
    };

    let handle = store::spawn(StoreConfig {
        source,
        snapshot_path: cache_dir.join("verses.json"),
        http: http.clone(),
    });
    let records = handle.init().await?;
    info!("verse store ready ({records} records)");
    Ok(VerseResolver::new(handle))
}
