/// Freesound CLI - search, inspect and download sounds from Freesound
mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use commands::BookmarkMode;
use config::CliConfig;
use freesound_client::{FreesoundClient, Preview, PreviewFormat, PreviewQuality, QueryParams};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "freesound")]
#[command(about = "Search, inspect and download sounds from Freesound", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./freesound.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of results to print for listings
    #[arg(short, long, global = true, default_value_t = 15)]
    limit: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the fields of a sound
    Sound {
        id: u64,
        /// Comma separated list of fields to request
        #[arg(short, long)]
        fields: Option<String>,
    },
    /// Text search
    Search {
        query: String,
        /// Filter expression, e.g. "tag:loop duration:[1 TO 5]"
        #[arg(short, long)]
        filter: Option<String>,
        /// Sort order, e.g. rating_desc
        #[arg(short, long)]
        sort: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Content-based search
    ContentSearch {
        /// Descriptor target, e.g. "lowlevel.pitch.mean:220"
        #[arg(short, long)]
        target: Option<String>,
        #[arg(short = 'F', long)]
        descriptors_filter: Option<String>,
    },
    /// Combined text and content-based search
    CombinedSearch {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(short, long)]
        target: Option<String>,
        #[arg(short = 'F', long)]
        descriptors_filter: Option<String>,
    },
    /// Sounds similar to a sound
    Similar { id: u64 },
    /// Analysis descriptors of a sound
    Analysis {
        id: u64,
        /// Descriptor names, e.g. "lowlevel.mfcc,rhythm.bpm"
        #[arg(short, long)]
        descriptors: Option<String>,
        #[arg(short, long)]
        normalized: bool,
    },
    /// Show a user
    User {
        username: String,
        /// Also list the user's sounds
        #[arg(long)]
        sounds: bool,
        /// Also list the user's packs
        #[arg(long)]
        packs: bool,
    },
    /// Show a pack and its sounds
    Pack { id: u64 },
    /// Download a preview of a sound
    Preview {
        id: u64,
        #[command(flatten)]
        preview: PreviewArgs,
        /// File name (extension added when missing)
        #[arg(short, long)]
        name: Option<String>,
        /// Target directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Download the original file of a sound (OAuth2 token required)
    Download {
        id: u64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Download a pack as a zip archive (OAuth2 token required)
    DownloadPack {
        id: u64,
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Download the original files of a user's bookmarked sounds (OAuth2 token required)
    Bookmarks {
        username: String,
        /// Only this category (all categories when omitted)
        category_id: Option<u64>,
        /// Download previews instead of original files
        #[arg(long)]
        previews: bool,
        #[command(flatten)]
        preview: PreviewArgs,
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct PreviewArgs {
    #[arg(long, value_enum, default_value_t = QualityArg::Lq)]
    quality: QualityArg,
    #[arg(long, value_enum, default_value_t = FormatArg::Mp3)]
    format: FormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum QualityArg {
    Lq,
    Hq,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Mp3,
    Ogg,
}

impl From<&PreviewArgs> for Preview {
    fn from(args: &PreviewArgs) -> Self {
        let quality = match args.quality {
            QualityArg::Lq => PreviewQuality::Low,
            QualityArg::Hq => PreviewQuality::High,
        };
        let format = match args.format {
            FormatArg::Mp3 => PreviewFormat::Mp3,
            FormatArg::Ogg => PreviewFormat::Ogg,
        };
        Preview::new(quality, format)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freesound_client=info,freesound_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    let client = FreesoundClient::new(config.client_config()?)?;
    tracing::debug!(base_url = %client.base_url(), "Client ready");

    let dir_or_default = |dir: Option<PathBuf>| dir.unwrap_or_else(|| config.download_dir.clone());
    let limit = cli.limit;

    match cli.command {
        Commands::Sound { id, fields } => {
            commands::sound_info(&client, id, fields).await?;
        }
        Commands::Search {
            query,
            filter,
            sort,
            page_size,
        } => {
            let params = QueryParams::new().param("query", query);
            let params = optional(params, "filter", filter);
            let params = optional(params, "sort", sort);
            let params = optional(params, "page_size", page_size);
            commands::text_search(&client, params, limit).await?;
        }
        Commands::ContentSearch {
            target,
            descriptors_filter,
        } => {
            let params = optional(QueryParams::new(), "target", target);
            let params = optional(params, "descriptors_filter", descriptors_filter);
            commands::content_search(&client, params, limit).await?;
        }
        Commands::CombinedSearch {
            query,
            filter,
            target,
            descriptors_filter,
        } => {
            let params = optional(QueryParams::new(), "query", query);
            let params = optional(params, "filter", filter);
            let params = optional(params, "target", target);
            let params = optional(params, "descriptors_filter", descriptors_filter);
            commands::combined_search(&client, params, limit).await?;
        }
        Commands::Similar { id } => {
            commands::similar(&client, id, limit).await?;
        }
        Commands::Analysis {
            id,
            descriptors,
            normalized,
        } => {
            commands::analysis(&client, id, descriptors, normalized).await?;
        }
        Commands::User {
            username,
            sounds,
            packs,
        } => {
            commands::user(&client, &username, sounds, packs, limit).await?;
        }
        Commands::Pack { id } => {
            commands::pack(&client, id, limit).await?;
        }
        Commands::Preview {
            id,
            preview,
            name,
            dir,
        } => {
            let dir = dir_or_default(dir);
            commands::preview(&client, id, &dir, name.as_deref(), (&preview).into()).await?;
        }
        Commands::Download { id, name, dir } => {
            let dir = dir_or_default(dir);
            commands::download(&client, id, &dir, name.as_deref()).await?;
        }
        Commands::DownloadPack { id, dir } => {
            let dir = dir_or_default(dir);
            commands::download_pack(&client, id, &dir).await?;
        }
        Commands::Bookmarks {
            username,
            category_id,
            previews,
            preview,
            dir,
        } => {
            let dir = dir_or_default(dir);
            let mode = if previews {
                BookmarkMode::Previews((&preview).into())
            } else {
                BookmarkMode::Originals
            };
            commands::bookmarks(&client, &username, category_id, &dir, mode).await?;
        }
    }

    Ok(())
}

fn optional(params: QueryParams, key: &str, value: Option<impl ToString>) -> QueryParams {
    match value {
        Some(value) => params.param(key, value),
        None => params,
    }
}
