use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use animeworld::player::play_with_mpv;
use animeworld::ui::{prompt_input, select_from_list, spinner};
use animeworld::{
    AnimeWorld, JsonFilePreferences, ListingPage, PreferenceStore, ReqwestClient, SeriesDetail,
    SourceConfig, StreamDescriptor,
};

#[derive(Parser)]
#[command(name = "animeworld", version, about = "AnimeWorld stream extractor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the catalog origin
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override the episode info API origin
    #[arg(long, global = true)]
    api_origin: Option<String>,

    /// Print the stream URL instead of playing it
    #[arg(short, long)]
    print_only: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Most viewed series
    Popular {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Recently added series
    Latest {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Search the catalog
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show a series and its episode tokens
    Detail { url: String },

    /// Resolve one or more episode tokens into streams
    Streams {
        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SourceConfig::load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(api_origin) = cli.api_origin {
        config.api_origin = api_origin.trim_end_matches('/').to_string();
    }

    let client = Arc::new(ReqwestClient::new().context("Falha ao criar cliente HTTP")?);
    let prefs: Arc<dyn PreferenceStore> = Arc::new(JsonFilePreferences::open_default()?);
    let source = AnimeWorld::new(config, client, prefs);
    let json = cli.json;

    match cli.command {
        Some(Commands::Popular { page }) => {
            let pb = spinner("Loading popular...");
            let listing = source.list_popular(page).await;
            pb.finish_and_clear();
            if json {
                print_json(&listing)?;
            } else {
                print_listing(&listing);
            }
        }
        Some(Commands::Latest { page }) => {
            let pb = spinner("Loading latest...");
            let listing = source.list_latest(page).await;
            pb.finish_and_clear();
            if json {
                print_json(&listing)?;
            } else {
                print_listing(&listing);
            }
        }
        Some(Commands::Search { query, page }) => {
            let pb = spinner(&format!("Searching for: {}", query));
            let listing = source.search(&query, page).await;
            pb.finish_and_clear();
            if json {
                print_json(&listing)?;
            } else {
                print_listing(&listing);
            }
        }
        Some(Commands::Detail { url }) => {
            let pb = spinner("Loading detail...");
            let detail = source.get_detail(&url).await;
            pb.finish_and_clear();
            if json {
                print_json(&detail)?;
            } else {
                print_detail(&detail);
            }
        }
        Some(Commands::Streams { tokens }) => {
            let pb = spinner("Resolving streams...");
            let results = source.get_streams_many(&tokens).await;
            pb.finish_and_clear();
            if json {
                let resolved: Vec<ResolvedStreams> = tokens
                    .iter()
                    .zip(&results)
                    .map(|(token, streams)| ResolvedStreams {
                        token: token.as_str(),
                        streams: streams.as_slice(),
                    })
                    .collect();
                print_json(&resolved)?;
            } else {
                for (token, streams) in tokens.iter().zip(results) {
                    println!("# {}", token);
                    print_streams(&streams);
                }
            }
        }
        None => interactive(&source, cli.print_only).await?,
    }

    Ok(())
}

// Fluxo interativo: busca -> série -> episódio -> stream
async fn interactive(source: &AnimeWorld, print_only: bool) -> Result<()> {
    let query = prompt_input("Enter anime search query")?;

    let pb = spinner(&format!("Searching for: {}", query));
    let listing = source.search(&query, 1).await;
    pb.finish_and_clear();

    if listing.entries.is_empty() {
        return Err(anyhow!("No anime found for query: {}", query));
    }

    let titles: Vec<String> = listing.entries.iter().map(|e| e.title.clone()).collect();
    let selected = &listing.entries[select_from_list(&titles, "Select anime:")?];

    let pb = spinner("Loading episodes...");
    let detail = source.get_detail(&selected.entry_url).await;
    pb.finish_and_clear();

    if detail.episodes.is_empty() {
        return Err(anyhow!("No episodes found for: {}", detail.title));
    }

    let names: Vec<String> = detail
        .episodes
        .iter()
        .map(|ep| ep.display_name.clone())
        .collect();
    let episode = &detail.episodes[select_from_list(&names, "Select episode:")?];

    let pb = spinner("Resolving stream...");
    let streams = source.get_streams(&episode.resolver_token).await;
    pb.finish_and_clear();

    let Some(stream) = streams.first() else {
        return Err(anyhow!("No playable stream for {}", episode.display_name));
    };

    if print_only {
        print_streams(&streams);
        return Ok(());
    }
    play_with_mpv(stream)
}

// Saída do subcomando `streams` em modo JSON
#[derive(Serialize)]
struct ResolvedStreams<'a> {
    token: &'a str,
    streams: &'a [StreamDescriptor],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Falha ao serializar a saída")?;
    println!("{}", out);
    Ok(())
}

fn print_listing(listing: &ListingPage) {
    for entry in &listing.entries {
        println!("{}  {}", entry.title, entry.entry_url);
    }
    if listing.has_next_page {
        println!("(more pages available)");
    }
}

fn print_detail(detail: &SeriesDetail) {
    println!("{}", detail.title);
    println!("Status: {:?}", detail.completion_status);
    if !detail.genres.is_empty() {
        let genres: Vec<&str> = detail.genres.iter().map(String::as_str).collect();
        println!("Genres: {}", genres.join(", "));
    }
    if !detail.description.is_empty() {
        println!("\n{}\n", detail.description);
    }
    for ep in &detail.episodes {
        println!("{:>6}  {}", ep.episode_number, ep.resolver_token);
    }
}

fn print_streams(streams: &[StreamDescriptor]) {
    if streams.is_empty() {
        println!("(no streams)");
    }
    for stream in streams {
        println!("[{}] {}", stream.label, stream.playable_url);
        for (name, value) in &stream.request_headers {
            println!("    {}: {}", name, value);
        }
    }
}
