use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sketchmatch_client::HttpFaceService;
use sketchmatch_core::{
    spawn_pipeline, CandidateFile, CaptureSurface, CatalogStatus, DisplayMode, FaceService,
    FeatureCategory, PipelineHandle, SearchMode, SessionSnapshot, SessionState, UploadMetadata,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::Config;

#[derive(Parser)]
#[command(name = "sketchmatch", about = "Forensic sketch and face search client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a face photo to the gallery
    Upload {
        image: PathBuf,
        #[arg(short, long)]
        name: Option<String>,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Search the gallery with a photo
    Search {
        image: PathBuf,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Convert a photo to a sketch, optionally searching with it
    Sketch {
        image: PathBuf,
        /// adaptive, pencil or edge
        #[arg(short, long, default_value = "adaptive")]
        method: String,
        /// The photo is blurry; deblur before converting
        #[arg(long)]
        deblur: bool,
        #[arg(long)]
        enhance: bool,
        /// Search as soon as the sketch is ready
        #[arg(long)]
        search: bool,
        #[command(flatten)]
        options: SearchArgs,
    },
    /// Compose a sketch from library features, optionally searching with it
    Compose {
        /// CATEGORY=VARIANT, e.g. eyes=almond_1 (repeatable)
        #[arg(short, long = "feature", value_parser = parse_feature, required = true)]
        features: Vec<(FeatureCategory, String)>,
        #[arg(long)]
        enhance: bool,
        #[arg(long)]
        search: bool,
        #[command(flatten)]
        options: SearchArgs,
    },
    /// List the feature library
    Features,
    /// List stored faces
    List,
    /// Remove a stored face
    Delete { id: String },
    /// Show service health
    Health,
}

#[derive(Args)]
struct SearchArgs {
    /// Minimum similarity percentage, 0-100
    #[arg(long)]
    min_similarity: Option<f32>,
    /// Result cap, 1-50
    #[arg(long)]
    max_results: Option<u32>,
    /// Show only the top match next to the probe
    #[arg(long)]
    best: bool,
}

impl SearchArgs {
    fn display_mode(&self) -> DisplayMode {
        if self.best {
            DisplayMode::BestMatch
        } else {
            DisplayMode::FullGrid
        }
    }
}

fn parse_feature(raw: &str) -> Result<(FeatureCategory, String), String> {
    match raw.split_once('=') {
        Some((category, variant)) if !category.trim().is_empty() && !variant.trim().is_empty() => {
            Ok((FeatureCategory::from(category.trim()), variant.trim().to_string()))
        }
        _ => Err(format!("expected CATEGORY=VARIANT, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(api_url = %config.api_url, "configuration loaded");

    let service: Arc<dyn FaceService> = Arc::new(
        HttpFaceService::new(config.api_url.clone(), config.timeout())
            .context("building HTTP client")?,
    );

    match cli.command {
        Commands::Upload {
            image,
            name,
            tags,
            notes,
        } => {
            let image = CaptureSurface::accept(vec![read_candidate(&image).await?])
                .with_context(|| format!("{} is not a supported image", image.display()))?;
            let metadata = UploadMetadata::from_fields(
                name.as_deref().unwrap_or_default(),
                &tags,
                notes.as_deref().unwrap_or_default(),
            );
            let record = service
                .upload_face(&image, &metadata)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to upload face")))?;
            println!("Uploaded {}", render::record(&record));
        }
        Commands::Search { image, search } => {
            let handle = open_session(&service, &config, &search, SearchMode::Manual);
            capture(&handle, &image).await?;
            handle.search().await?;
            let snapshot = handle.settled().await?;
            report(&snapshot, search.display_mode())?;
        }
        Commands::Sketch {
            image,
            method,
            deblur,
            enhance,
            search,
            options,
        } => {
            // The raw photo is only transform input; auto-search waits for the sketch.
            let handle = open_session(&service, &config, &options, SearchMode::Manual);
            capture(&handle, &image).await?;
            handle.set_mode(mode_for(search)).await?;
            handle.transform(&method, deblur, enhance).await?;
            let snapshot = handle.settled().await?;
            report(&snapshot, options.display_mode())?;
        }
        Commands::Compose {
            features,
            enhance,
            search,
            options,
        } => {
            let handle = open_session(&service, &config, &options, mode_for(search));
            handle.load_catalog().await?;
            let snapshot = handle.settled().await?;
            if let CatalogStatus::Unavailable(message) = &snapshot.catalog {
                bail!("{message}");
            }
            for (category, variant) in features {
                handle.select_feature(category, variant).await?;
            }
            handle.compose(enhance).await?;
            let snapshot = handle.settled().await?;
            report(&snapshot, options.display_mode())?;
        }
        Commands::Features => {
            let catalog = service
                .feature_library()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to load facial features")))?;
            print!("{}", render::catalog(&catalog));
        }
        Commands::List => {
            let faces = service
                .list_faces()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to list faces")))?;
            if faces.is_empty() {
                println!("No faces stored");
            }
            for face in &faces {
                println!("{}", render::record(face));
            }
        }
        Commands::Delete { id } => {
            service
                .delete_face(&id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Failed to delete face")))?;
            println!("Deleted {id}");
        }
        Commands::Health => {
            let status = service
                .health()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Face service unavailable")))?;
            print!("{}", render::health(&status));
        }
    }

    Ok(())
}

fn mode_for(search: bool) -> SearchMode {
    if search {
        SearchMode::Auto
    } else {
        SearchMode::Manual
    }
}

fn open_session(
    service: &Arc<dyn FaceService>,
    config: &Config,
    args: &SearchArgs,
    mode: SearchMode,
) -> PipelineHandle {
    let options = config.search_options(args.min_similarity, args.max_results);
    spawn_pipeline(Arc::clone(service), mode, options)
}

async fn read_candidate(path: &Path) -> Result<CandidateFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(CandidateFile::new(file_name, bytes))
}

async fn capture(handle: &PipelineHandle, path: &Path) -> Result<()> {
    let candidate = read_candidate(path).await?;
    if !handle.capture(vec![candidate]).await? {
        bail!("{} is not a supported image", path.display());
    }
    Ok(())
}

/// Print whatever the settled session holds; a session error becomes the
/// process error.
fn report(snapshot: &SessionSnapshot, mode: DisplayMode) -> Result<()> {
    match &snapshot.state {
        SessionState::Displayed { probe, response } => {
            print!("{}", render::results(response, mode, probe));
        }
        SessionState::Ready { probe } => {
            println!("Probe ready: {}", render::image_label(probe.image()));
        }
        SessionState::Error { message, .. } => bail!("{message}"),
        other => bail!("session ended in unexpected state: {}", other.name()),
    }
    Ok(())
}
