//! Load a workspace document and drive the mixer against a transport.
//!
//! This is the whole of the CLI's runtime surface: decode the sound
//! files a workspace references, hand them to a [`Mixer`], publish the
//! workspace as the initial snapshot, and either run for a fixed
//! duration or accept soundboard triggers typed on stdin until told to
//! stop. Everything else — the HTTP control plane, the chat-platform
//! command handler, the real voice transport — lives outside this
//! workspace (spec §1).

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ambience_mixer::Mixer;
use ambience_model::{load_workspace, PlayState};
use ambience_registry::SoundFileRegistry;
use ambience_transport::{CpalSinkTransport, Transport, WavSinkTransport};
use clap::Args;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Path to the persisted workspace JSON document.
    workspace: PathBuf,

    /// Directory relative sound-file paths are resolved against.
    /// Defaults to the workspace document's own directory.
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Render the mix to a WAV file instead of the default output device.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Force this environment to PLAYING before the first frame
    /// (repeatable). Every environment is loaded as STOPPED otherwise
    /// (spec §6).
    #[arg(short = 'e', long = "start-env")]
    start_env: Vec<String>,

    /// Trigger this soundboard file id once at start-up (repeatable).
    #[arg(short = 's', long = "soundboard")]
    soundboard: Vec<String>,

    /// Stop automatically after this many seconds instead of reading
    /// interactive soundboard commands from stdin.
    #[arg(long)]
    duration: Option<f64>,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut state = load_workspace(&args.workspace)?;

    for id in &args.start_env {
        match state.environment_mut(id) {
            Some(env) => env.play_state = PlayState::Playing,
            None => warn!(environment = %id, "--start-env referenced an unknown environment id"),
        }
    }

    let audio_dir = args
        .audio_dir
        .clone()
        .or_else(|| args.workspace.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let mut registry = SoundFileRegistry::new();
    for file in &state.files {
        let path = resolve_audio_path(&audio_dir, &file.path);
        if let Err(e) = registry.load(
            file.id.clone(),
            &path,
            file.original_filename.clone(),
            file.name.clone(),
        ) {
            warn!(
                file = %file.id,
                path = %path.display(),
                error = %e,
                "failed to decode sound file; layers referencing it will play silence",
            );
        }
    }
    let registry = Arc::new(registry);

    let transport: Box<dyn Transport> = match &args.output {
        Some(path) => Box::new(WavSinkTransport::create(path)?),
        None => Box::new(CpalSinkTransport::default_device()?),
    };

    let mixer = Mixer::new(Arc::clone(&registry), transport);
    mixer.publish(state);

    for id in &args.soundboard {
        mixer.play_soundboard(id);
    }

    let stop_requested = install_ctrlc_handler();

    match args.duration {
        Some(secs) => wait_for_duration(&mixer, &stop_requested, Duration::from_secs_f64(secs)),
        None => run_interactive(&mixer, &stop_requested),
    }

    mixer.stop()?;
    Ok(())
}

/// Resolve a workspace-relative (or absolute) sound-file path against
/// `audio_dir`.
fn resolve_audio_path(audio_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        audio_dir.join(path)
    }
}

/// Installs a Ctrl-C handler that flips an [`AtomicBool`] rather than
/// terminating the process, so the duration-bounded wait (and, by
/// extension, a WAV sink's finalize-on-drop) gets a chance to run.
fn install_ctrlc_handler() -> Arc<AtomicBool> {
    let stop_requested = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop_requested);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "failed to install Ctrl-C handler; use `quit` or EOF to stop");
    }
    stop_requested
}

fn wait_for_duration(mixer: &Mixer, stop_requested: &AtomicBool, duration: Duration) {
    const POLL: Duration = Duration::from_millis(50);
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if stop_requested.load(Ordering::SeqCst) || !mixer.is_running() {
            break;
        }
        std::thread::sleep(POLL);
    }
}

/// Reads soundboard triggers from stdin until `quit`, EOF, or Ctrl-C.
/// A blocking read on stdin cannot observe the Ctrl-C flag mid-line;
/// this is a deliberate simplification for a thin demonstration CLI
/// rather than a production control surface (the real one is the HTTP
/// API in spec §6).
fn run_interactive(mixer: &Mixer, stop_requested: &AtomicBool) {
    info!("reading interactive commands from stdin: `play <file-id>`, `quit`");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if stop_requested.load(Ordering::SeqCst) || !mixer.is_running() {
            break;
        }
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if let Some(file_id) = line.strip_prefix("play ") {
            mixer.play_soundboard(file_id.trim());
        } else {
            println!("unrecognized command: {line}");
        }
    }
}
