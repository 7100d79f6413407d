//! winseq - run, record and manage UI action sequences
//!
//! Results go to stdout as `{success, data?, error?}` JSON; logs go to stderr.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use winseq::prelude::*;
use winseq::recorder::storage;

#[derive(Parser)]
#[command(name = "winseq")]
#[command(about = "winseq - run and record UI action sequences for named windows")]
#[command(version)]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sequence file against the dry-run desktop
    Run {
        /// JSON file with a list of actions
        file: PathBuf,

        #[command(flatten)]
        opts: RunOpts,
    },

    /// Validate a sequence file without running it
    Check {
        file: PathBuf,
    },

    /// Record raw input events (JSON lines on stdin) into a sequence
    Record {
        /// Window attached to typed text until a hotkey switches it
        #[arg(long)]
        default_window: Option<String>,

        /// Focus hotkey, e.g. `1=bot` binds F1 to window "bot"
        #[arg(long = "hotkey", value_parser = parse_hotkey)]
        hotkeys: Vec<FocusHotkey>,

        /// Idle seconds before a wait is inserted
        #[arg(long)]
        min_wait: Option<f64>,

        /// Max seconds between clicks that merge
        #[arg(long)]
        double_click_window: Option<f64>,

        /// Save under this name
        #[arg(long)]
        save: Option<String>,

        /// Replace an existing file instead of picking a new name
        #[arg(long)]
        overwrite: bool,

        /// Also write the sequence to this file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Append to --out instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Named sequences
    Sequences {
        #[command(subcommand)]
        command: SequenceCommands,
    },

    /// Remembered windows
    Windows {
        #[command(subcommand)]
        command: WindowCommands,
    },
}

#[derive(Subcommand)]
enum SequenceCommands {
    /// List saved sequences, most recent first
    List,

    /// Print a saved sequence
    Show { name: String },

    /// Delete a saved sequence
    Delete {
        name: String,

        /// Only drop the index entry
        #[arg(long)]
        keep_file: bool,
    },

    /// Run a saved sequence
    Run {
        name: String,

        #[command(flatten)]
        opts: RunOpts,
    },
}

#[derive(Subcommand)]
enum WindowCommands {
    /// List remembered windows, most recently used first
    List,

    /// Remember a window under a name
    Remember {
        name: String,

        /// Window position as x,y
        #[arg(long, value_parser = parse_point)]
        at: Point,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        class: Option<String>,
    },

    /// Forget a remembered window
    Forget { name: String },
}

#[derive(Args)]
struct RunOpts {
    /// Initial variable, e.g. `p1=100,200`
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, Point)>,

    /// Keep going after a failed step
    #[arg(long)]
    continue_on_error: bool,

    /// Seconds to wait for a prompted point (read as `x,y` lines on stdin)
    #[arg(long)]
    prompt_timeout: Option<f64>,

    /// Playback speed (1.0 = as recorded, 2.0 = 2x)
    #[arg(short, long)]
    speed: Option<f64>,
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(e: Error) -> Output<()> {
        Output {
            success: false,
            data: None,
            error: Some(e),
        }
    }
}

fn print_json<T: Serialize>(output: &T) {
    match serde_json::to_string_pretty(output) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: failed to serialize output: {}", e),
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got '{}'", s))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("bad x in '{}'", s))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("bad y in '{}'", s))?;
    Ok(Point::new(x, y))
}

fn parse_var(s: &str) -> Result<(String, Point), String> {
    let (name, point) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=x,y, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }
    Ok((name.to_string(), parse_point(point)?))
}

fn parse_hotkey(s: &str) -> Result<FocusHotkey, String> {
    let (key, window) = s
        .split_once('=')
        .ok_or_else(|| format!("expected N=window, got '{}'", s))?;
    let key = key.trim().trim_start_matches(['f', 'F']);
    let key: u8 = key.parse().map_err(|_| format!("bad F-key in '{}'", s))?;
    Ok(FocusHotkey {
        key,
        window: window.trim().to_string(),
    })
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("winseq=debug,winseq_core=debug,winseq_recorder=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("winseq=info,winseq_core=info,winseq_recorder=info")
        })
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Settings::load().and_then(|settings| match cli.command {
        Commands::Run { file, opts } => run_file(&settings, &file, opts),
        Commands::Check { file } => check(&file),
        Commands::Record {
            default_window,
            hotkeys,
            min_wait,
            double_click_window,
            save,
            overwrite,
            out,
            append,
        } => {
            let mut config = settings.recording.clone();
            if let Some(w) = default_window {
                config.default_window = Some(w);
            }
            for h in hotkeys {
                config = config.hotkey(h.key, h.window);
            }
            if let Some(s) = min_wait {
                config.min_wait = s;
            }
            if let Some(s) = double_click_window {
                config.double_click_window = s;
            }
            record(&settings, config, save.as_deref(), overwrite, out.as_deref(), append)
        }
        Commands::Sequences { command } => sequences(&settings, command),
        Commands::Windows { command } => windows(&settings, command),
    });

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let err = e.downcast::<Error>().unwrap_or_else(Error::from);
            print_json(&Output::<()>::err(err));
            std::process::exit(1);
        }
    }
}

// === Running ===

fn run_file(settings: &Settings, file: &Path, opts: RunOpts) -> Result<bool> {
    let seq = storage::read_file(file)?;
    run_sequence(settings, &seq, opts)
}

fn run_sequence(settings: &Settings, seq: &ActionSequence, opts: RunOpts) -> Result<bool> {
    let desktop = DryRunDesktop::open(settings.window_cache())?;

    // Flags override config.json, then go through the same range checks
    let mut run = settings.run.clone();
    if opts.continue_on_error {
        run.on_error = FailurePolicy::Continue;
    }
    if let Some(s) = opts.prompt_timeout {
        run.prompt_timeout = Some(s);
    }
    if let Some(s) = opts.speed {
        run.speed = s;
    }
    let config = Settings {
        run,
        ..settings.clone()
    }
    .runner_config()?;

    let vars: Variables = opts.vars.into_iter().collect();
    let needs_prompt = seq
        .iter()
        .any(|a| matches!(a, Action::PromptPoint { .. }));

    let report = if needs_prompt {
        let (prompter, points) = ChannelPrompter::new();
        spawn_point_reader(points);
        Runner::new(&desktop, &desktop)
            .prompter(&prompter)
            .config(config)
            .run(seq, vars)
    } else {
        Runner::new(&desktop, &desktop).config(config).run(seq, vars)
    };

    desktop.persist()?;

    let success = report.success;
    let error = report.failure().and_then(|s| s.error.clone());
    print_json(&Output {
        success,
        data: Some(&report),
        error,
    });
    Ok(success)
}

/// Feed `x,y` lines from stdin to a waiting `prompt_point`
fn spawn_point_reader(points: PointSender) {
    let spawned = thread::Builder::new()
        .name("winseq-points".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_point(line) {
                    Ok(p) => {
                        if !points.send(p) {
                            break;
                        }
                    }
                    Err(e) => warn!("ignoring point: {}", e),
                }
            }
        });
    if let Err(e) = spawned {
        warn!("no point reader, prompts will fail: {}", e);
    }
}

fn check(file: &Path) -> Result<bool> {
    let seq = storage::read_file(file)?;
    let kinds: Vec<&str> = seq.iter().map(Action::kind).collect();
    print_json(&Output::ok(serde_json::json!({
        "file": file,
        "count": seq.len(),
        "actions": kinds,
    })));
    Ok(true)
}

// === Recording ===

fn record(
    settings: &Settings,
    config: RecordingConfig,
    save: Option<&str>,
    overwrite: bool,
    out: Option<&Path>,
    append: bool,
) -> Result<bool> {
    let hub = Arc::new(EventHub::new());
    let recorder = Recorder::new(hub.clone());
    recorder.start(config)?;
    eprintln!("Recording: reading events from stdin (Ctrl+C or EOF to stop)");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let input_done = Arc::new(AtomicBool::new(false));
    {
        let hub = hub.clone();
        let done = input_done.clone();
        thread::Builder::new()
            .name("winseq-events".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<RawEvent>(&line) {
                        Ok(event) => {
                            hub.emit(event);
                        }
                        Err(e) => warn!("skipping event line: {}", e),
                    }
                }
                done.store(true, Ordering::SeqCst);
            })?;
    }

    while running.load(Ordering::SeqCst) && !input_done.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    let seq = recorder.stop()?;
    info!("{} actions recorded", seq.len());

    let mut data = serde_json::json!({
        "count": seq.len(),
        "actions": seq,
    });

    if let Some(path) = out {
        let total = storage::write_file(path, &seq, append)?;
        data["file"] = serde_json::json!(path);
        data["file_count"] = serde_json::json!(total);
    }
    if let Some(name) = save {
        let saved = settings.store().save_last(name, &recorder, overwrite)?;
        debug!("saved as {}", saved.file.display());
        data["saved"] = serde_json::to_value(&saved)?;
    }

    print_json(&Output::ok(data));
    Ok(true)
}

// === Storage ===

fn sequences(settings: &Settings, command: SequenceCommands) -> Result<bool> {
    let store = settings.store();
    match command {
        SequenceCommands::List => {
            let list = store.list();
            print_json(&Output::ok(serde_json::json!({
                "count": list.len(),
                "sequences": list,
            })));
            Ok(true)
        }
        SequenceCommands::Show { name } => {
            let seq = store.load(&name)?;
            print_json(&Output::ok(serde_json::json!({
                "name": name,
                "count": seq.len(),
                "actions": seq,
            })));
            Ok(true)
        }
        SequenceCommands::Delete { name, keep_file } => {
            let removed = store.delete(&name, !keep_file)?;
            print_json(&Output::ok(serde_json::json!({
                "name": name,
                "removed_file": removed,
            })));
            Ok(true)
        }
        SequenceCommands::Run { name, opts } => {
            let seq = store.load(&name)?;
            run_sequence(settings, &seq, opts)
        }
    }
}

fn windows(settings: &Settings, command: WindowCommands) -> Result<bool> {
    let path = settings.window_cache();
    let mut registry = WindowRegistry::load(&path)?;
    match command {
        WindowCommands::List => {
            let list = registry.list();
            print_json(&Output::ok(serde_json::json!({
                "count": list.len(),
                "last_used": registry.last_used(),
                "windows": list,
            })));
        }
        WindowCommands::Remember {
            name,
            at,
            title,
            class,
        } => {
            let mut info = WindowInfo::at(at);
            if let Some(t) = title {
                info = info.with_title(t);
            }
            if let Some(c) = class {
                info = info.with_class(c);
            }
            let replaced = registry.remember(&name, info)?;
            registry.save(&path)?;
            print_json(&Output::ok(serde_json::json!({
                "name": name,
                "replaced": replaced,
            })));
        }
        WindowCommands::Forget { name } => {
            registry.remove(&name)?;
            registry.save(&path)?;
            print_json(&Output::ok(serde_json::json!({ "forgot": name })));
        }
    }
    Ok(true)
}
