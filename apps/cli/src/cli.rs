use crate::config::CliConfig;
use crate::console::ConsoleEventBus;
use crate::{narration, track};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use roadlore_application::{ExploreOutcome, Explorer, ExplorerSnapshot, Phase, Session};
use roadlore_audio::{AudioChannel, OutputDevice, PlaybackStatus};
use roadlore_events::EventBusRef;
use roadlore_gemini::GeminiClient;
use roadlore_geo::{FeedLocationSource, Position};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on waiting for a lookup or narration to finish at the end of a run.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Parser)]
#[command(name = "roadlore", version, about = "Location-aware historical narration")]
pub struct Cli {
    /// Config file (default: <config dir>/roadlore/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a recorded GPS track through an exploration session
    Replay(ReplayArgs),
    /// Run a single lookup at a coordinate
    Explore(ExploreArgs),
    /// Print the default config file location
    ConfigPath,
}

#[derive(Debug, Args)]
struct ReplayArgs {
    /// JSON array of {lat, lng, heading?, delay_ms?}
    track: PathBuf,
    /// Driving mode: narrate the first highlight automatically
    #[arg(long)]
    driving: bool,
    /// Follow every reading (implied by --driving)
    #[arg(long)]
    tracking: bool,
    /// Request a manual lookup after every N readings
    #[arg(long, value_name = "N")]
    explore_every: Option<usize>,
    /// Delay between readings without their own delay_ms
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Write an itinerary of the visited places to this file
    #[arg(long, value_name = "FILE")]
    itinerary: Option<PathBuf>,
    /// Save each narration as a WAV file in this directory
    #[arg(long, value_name = "DIR")]
    save_narration: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ExploreArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,
    /// Ask for the short driving answer and narrate the highlight
    #[arg(long)]
    driving: bool,
    /// Save the narration as a WAV file in this directory
    #[arg(long, value_name = "DIR")]
    save_narration: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::ConfigPath => {
                match CliConfig::default_path() {
                    Some(path) => println!("{}", path.display()),
                    None => anyhow::bail!("no config directory on this platform"),
                }
                Ok(())
            }
            Command::Replay(args) => {
                let config = CliConfig::load(self.config.as_deref())?;
                replay(args, &config, self.json).await
            }
            Command::Explore(args) => {
                let config = CliConfig::load(self.config.as_deref())?;
                explore_once(args, &config, self.json).await
            }
        }
    }
}

fn output_device() -> Arc<dyn OutputDevice> {
    #[cfg(feature = "speaker")]
    {
        Arc::new(roadlore_audio::CpalDevice::new())
    }
    #[cfg(not(feature = "speaker"))]
    {
        Arc::new(roadlore_audio::SilentDevice)
    }
}

fn build_explorer(config: &CliConfig, events: EventBusRef) -> anyhow::Result<Explorer> {
    let explorer_config = config.explorer_config();
    let gemini = Arc::new(
        GeminiClient::new(config.gemini.clone())
            .context("creating Gemini client")?
            .with_highlight_prefix(explorer_config.highlight_prefix.clone()),
    );

    let explorer = Explorer::builder()
        .config(explorer_config)
        .context_provider(gemini.clone())
        .narration_provider(gemini.clone())
        .summarizer(gemini)
        .audio(AudioChannel::new(output_device()))
        .event_bus(events)
        .build();
    if !config.gemini.has_api_key() {
        explorer.configuration_missing();
    }
    Ok(explorer)
}

async fn replay(args: ReplayArgs, config: &CliConfig, json: bool) -> anyhow::Result<()> {
    let points = track::load_track(&args.track).await?;
    let events: EventBusRef = Arc::new(ConsoleEventBus::new(json));
    let explorer = build_explorer(config, events.clone())?;
    if explorer.phase().is_terminal() {
        anyhow::bail!("configuration missing: set GEMINI_API_KEY");
    }

    let recorder = match &args.save_narration {
        Some(dir) => {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
            Some(narration::spawn_recorder(explorer.audio().clone(), dir.clone()))
        }
        None => None,
    };

    let feed = FeedLocationSource::new();
    let (session, handle) = Session::new(explorer.clone(), Arc::new(feed.clone()));
    let session_task = tokio::spawn(session.with_event_bus(events).run());

    if args.driving {
        handle.set_driving(true).await?;
    }
    if args.tracking {
        handle.set_tracking(true).await?;
    }
    if !args.driving && !args.tracking {
        tracing::warn!("without --tracking or --driving only the first reading is used");
    }
    if !track::wait_for_listener(&feed, Duration::from_secs(2)).await {
        tracing::warn!("location source has no listener; readings may be dropped");
    }

    let default_delay = Duration::from_millis(args.interval_ms);
    for (index, point) in points.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(point.delay(default_delay)).await;
        }
        if explorer.phase().is_terminal() {
            break;
        }
        feed.push(point.position());

        if let Some(every) = args.explore_every.filter(|n| *n > 0) {
            if (index + 1) % every == 0 {
                handle.explore().await?;
            }
        }
    }

    settle(&explorer).await;
    handle.shutdown().await?;
    let explorer = session_task.await.context("session task")?;
    if let Some(recorder) = recorder {
        recorder.abort();
    }

    let snapshot = explorer.snapshot();
    print_summary(&snapshot, json)?;

    if let Some(path) = &args.itinerary {
        write_itinerary(&explorer, path).await?;
    }
    if snapshot.phase == Phase::ConfigurationMissing {
        anyhow::bail!("configuration missing: set GEMINI_API_KEY");
    }
    Ok(())
}

/// Let the last lookup and narration finish before shutting down.
async fn settle(explorer: &Explorer) {
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut snapshots = explorer.subscribe();
    let analyzing = snapshots.wait_for(|s| s.phase != Phase::Analyzing);
    if tokio::time::timeout(SETTLE_TIMEOUT, analyzing).await.is_err() {
        tracing::warn!("lookup still running; shutting down anyway");
    }

    let mut playback = explorer.audio().subscribe();
    let stopped = playback.wait_for(|s| *s == PlaybackStatus::Stopped);
    if tokio::time::timeout(SETTLE_TIMEOUT, stopped).await.is_err() {
        tracing::warn!("narration still playing; stopping it");
    }
}

async fn explore_once(args: ExploreArgs, config: &CliConfig, json: bool) -> anyhow::Result<()> {
    let events: EventBusRef = Arc::new(ConsoleEventBus::new(json));
    let explorer = build_explorer(config, events)?;
    if explorer.phase().is_terminal() {
        anyhow::bail!("configuration missing: set GEMINI_API_KEY");
    }
    let position = Position::new(args.lat, args.lng);

    explorer.set_driving(args.driving);
    explorer.on_location_update(position);

    let outcome = explorer.explore(position, false).await;
    if let ExploreOutcome::Failed(e) = outcome {
        explorer.shutdown();
        return Err(e).context("lookup failed");
    }

    if let Some(dir) = &args.save_narration {
        if let Some(asset) = explorer.audio().current_asset() {
            tokio::fs::create_dir_all(dir).await?;
            let path = narration::narration_path(dir, 1);
            asset
                .save_wav(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "narration saved");
        }
    }

    settle(&explorer).await;
    let snapshot = explorer.snapshot();
    explorer.shutdown();

    if !json && !snapshot.narrative.is_empty() {
        println!("\n{}\n", snapshot.narrative);
    }
    print_summary(&snapshot, json)
}

fn print_summary(snapshot: &ExplorerSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }

    println!("{} local(is) visitado(s)", snapshot.places.len());
    for place in &snapshot.places {
        match &place.external_map_uri {
            Some(uri) => println!("  - {} <{}>", place.title, uri),
            None => println!("  - {}", place.title),
        }
    }
    Ok(())
}

async fn write_itinerary(explorer: &Explorer, path: &Path) -> anyhow::Result<()> {
    let text = explorer.itinerary().await.context("building itinerary")?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "itinerary written");
    Ok(())
}
