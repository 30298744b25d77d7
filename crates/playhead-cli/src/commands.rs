//! CLI command implementations

use crate::output::{self, OutputFormat};
use crate::script::{self, Step, StepOp};
use anyhow::Context;
use playhead_core::{
    AssetLocator, AutoplayPolicy, BufferedRange, MediaSource, PlaybackCallbacks, PlaybackEngine,
    PlaybackState, PlayerConfig, PlayerSession, QualityLevel, QualitySet, SessionHandle,
    SessionInput, SimulatedFullscreen, SimulatedResource, StorageLocator,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

pub struct SimulateOptions {
    pub script: Option<PathBuf>,
    pub source: String,
    pub qualities: String,
    pub autoplay: bool,
    pub policy: String,
    pub config: Option<PathBuf>,
    pub base: String,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlayerConfig> {
    match path {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(PlayerConfig::from_json(&body)?)
        }
        None => Ok(PlayerConfig::default()),
    }
}

fn parse_policy(policy: &str) -> anyhow::Result<AutoplayPolicy> {
    match policy.to_lowercase().as_str() {
        "allow" => Ok(AutoplayPolicy::Allow),
        "muted-only" | "muted" => Ok(AutoplayPolicy::MutedOnly),
        "block" => Ok(AutoplayPolicy::Block),
        other => anyhow::bail!("unknown autoplay policy '{}'", other),
    }
}

/// Run a script against a simulated resource, printing every snapshot
pub async fn simulate(options: SimulateOptions, format: &str) -> anyhow::Result<()> {
    let format = OutputFormat::from(format);
    let config = load_config(options.config.as_deref())?;
    let steps = match options.script.as_deref() {
        Some(path) => script::load(path)?,
        None => script::demo(),
    };
    let qualities = QualitySet::parse_list(&options.qualities)?;
    let policy = parse_policy(&options.policy)?;

    let media = SimulatedResource::new().with_policy(policy);
    let host = SimulatedFullscreen::new();
    let source = MediaSource::new(options.source.as_str())
        .with_qualities(qualities)
        .with_autoplay(options.autoplay);
    let callbacks = PlaybackCallbacks::new()
        .on_time_update(|time, duration| debug!(time, duration, "Time update"))
        .on_ended(|| info!("Playback ended"));

    let mut engine = PlaybackEngine::new(config)?;
    engine.attach(
        Box::new(media.clone()),
        Box::new(host.clone()),
        Box::new(StorageLocator::new(&options.base)?),
        source,
        callbacks,
    )?;
    if let Some(src) = media.src() {
        if format == OutputFormat::Text {
            println!("Source: {}", src);
        }
    }

    let (session, handle) = PlayerSession::new(engine);
    info!(session_id = %handle.id(), steps = steps.len(), "Simulation started");

    let driver = drive(&handle, &media, steps, format);
    let (engine, result) = tokio::join!(session.run(), driver);
    result?;

    if format == OutputFormat::Text {
        println!(
            "\nSession {} finished: attached={} resource loads={} play requests={} fullscreen requests={}",
            handle.id(),
            engine.is_attached(),
            media.load_count(),
            media.play_calls(),
            host.requests()
        );
    }
    Ok(())
}

async fn drive(
    handle: &SessionHandle,
    media: &SimulatedResource,
    steps: Vec<Step>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut rx = handle.subscribe();
    let mut last = rx.borrow_and_update().clone();
    println!("{}", output::snapshot(format, started.elapsed(), "attach", &last));

    for step in steps {
        watch_until(&mut rx, &mut last, started, Instant::now() + step.delay(), format).await;

        let input = apply_step(&step.op, media);
        let detaching = input == SessionInput::Detach;
        handle.send(input).await?;
        if rx.changed().await.is_err() {
            break;
        }
        last = rx.borrow_and_update().clone();
        println!("{}", output::snapshot(format, started.elapsed(), step.op.label(), &last));
        if detaching {
            return Ok(());
        }
    }

    handle.detach().await?;
    Ok(())
}

/// Print timer-driven snapshots until `deadline`
async fn watch_until(
    rx: &mut watch::Receiver<PlaybackState>,
    last: &mut PlaybackState,
    started: Instant,
    deadline: Instant,
    format: OutputFormat,
) {
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return,
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
                let state = rx.borrow_and_update().clone();
                if state != *last {
                    println!("{}", output::snapshot(format, started.elapsed(), "timer", &state));
                    *last = state;
                }
            }
        }
    }
}

/// Drive the simulated resource for resource steps; map the rest to inputs
fn apply_step(op: &StepOp, media: &SimulatedResource) -> SessionInput {
    match op {
        StepOp::Load { duration } => {
            media.finish_loading(*duration);
            SessionInput::Poll
        }
        StepOp::Advance { secs } => {
            media.advance(*secs);
            SessionInput::Poll
        }
        StepOp::Stall => {
            media.stall();
            SessionInput::Poll
        }
        StepOp::Recover => {
            media.recover();
            SessionInput::Poll
        }
        StepOp::Buffered { end } => {
            media.set_buffered(vec![BufferedRange::new(0.0, *end)]);
            SessionInput::Poll
        }
        StepOp::Command { action } => SessionInput::Command(*action),
        StepOp::Key { key, text_focus } => SessionInput::Key {
            key: key.clone(),
            has_text_focus: *text_focus,
        },
        StepOp::PointerMove => SessionInput::PointerActivity,
        StepOp::PointerLeave => SessionInput::PointerLeave,
        StepOp::QualityMenu => SessionInput::ToggleQualityMenu,
        StepOp::Fullscreen { active } => SessionInput::FullscreenChanged(*active),
        StepOp::TrackClick { x, left, width } => SessionInput::SeekToPosition {
            click_x: *x,
            track_left: *left,
            track_width: *width,
        },
        StepOp::Detach => SessionInput::Detach,
    }
}

#[derive(Serialize)]
struct Resolved {
    base: String,
    path: String,
    quality: Option<QualityLevel>,
    url: String,
}

/// Resolve a storage path against a base or API URL
pub fn resolve(
    path: &str,
    base: Option<String>,
    api: Option<String>,
    quality: Option<String>,
    poster: bool,
    format: &str,
) -> anyhow::Result<()> {
    let locator = match (base, api) {
        (Some(base), _) => StorageLocator::new(&base)?,
        (None, Some(api)) => StorageLocator::from_api_url(&api)?,
        (None, None) => StorageLocator::new("http://localhost:4200/storage")?,
    };
    let quality = quality.map(|q| q.parse::<QualityLevel>()).transpose()?;

    let url = if poster {
        locator.poster_url(path)?
    } else {
        locator.video_url(path, quality)?
    };

    let resolved = Resolved {
        base: locator.base().to_string(),
        path: path.to_string(),
        quality,
        url: url.to_string(),
    };
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::format_value(&resolved, OutputFormat::Json)),
        OutputFormat::Text => println!("{}", resolved.url),
    }
    Ok(())
}

#[derive(Serialize)]
struct Binding {
    key: &'static str,
    action: playhead_core::ControlAction,
}

/// Print the keyboard shortcuts for a configuration
pub fn keys(config: Option<PathBuf>, format: &str) -> anyhow::Result<()> {
    let config = load_config(config.as_deref())?;
    let engine = PlaybackEngine::new(config)?;
    let bindings: Vec<Binding> = engine
        .keyboard()
        .bindings()
        .into_iter()
        .map(|(key, action)| Binding { key, action })
        .collect();

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::format_value(&bindings, OutputFormat::Json)),
        OutputFormat::Text => {
            println!("Keyboard shortcuts (ignored while a text field has focus):\n");
            for binding in &bindings {
                println!(
                    "  {:<12} {}",
                    binding.key,
                    output::format_value(&binding.action, OutputFormat::Text)
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playhead_core::{ControlAction, PlaybackStatus};

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("Muted-Only").unwrap(), AutoplayPolicy::MutedOnly);
        assert_eq!(parse_policy("block").unwrap(), AutoplayPolicy::Block);
        assert!(parse_policy("sometimes").is_err());
    }

    #[test]
    fn test_resource_steps_poll_the_session() {
        let media = SimulatedResource::new();
        assert_eq!(
            apply_step(&StepOp::Load { duration: 60.0 }, &media),
            SessionInput::Poll
        );
        assert_eq!(media.pending_events(), 4);
        assert_eq!(
            apply_step(
                &StepOp::Command {
                    action: ControlAction::ToggleMute
                },
                &media
            ),
            SessionInput::Command(ControlAction::ToggleMute)
        );
    }

    #[tokio::test]
    async fn test_scripted_session_reaches_playing() {
        let media = SimulatedResource::new();
        let mut engine = PlaybackEngine::new(PlayerConfig::default()).unwrap();
        engine
            .attach(
                Box::new(media.clone()),
                Box::new(SimulatedFullscreen::new()),
                Box::new(StorageLocator::new("http://localhost:4200/storage").unwrap()),
                MediaSource::new("clip.mp4"),
                PlaybackCallbacks::new(),
            )
            .unwrap();
        let (session, handle) = PlayerSession::new(engine);

        let steps = script::parse(
            r#"[
                { "step": "load", "duration": 60 },
                { "step": "command", "action": { "action": "togglePlay" } },
                { "step": "advance", "secs": 10 }
            ]"#,
        )
        .unwrap();

        let driver = async {
            let mut rx = handle.subscribe();
            rx.borrow_and_update();
            for step in &steps {
                handle.send(apply_step(&step.op, &media)).await.unwrap();
                rx.changed().await.unwrap();
            }
            let state = rx.borrow_and_update().clone();
            handle.detach().await.unwrap();
            state
        };

        let (engine, state) = tokio::join!(session.run(), driver);
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert_eq!(state.duration, 60.0);
        assert_eq!(state.current_time, 10.0);
        assert!(!engine.is_attached());
    }
}
