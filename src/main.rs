use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use embassy_executor::Executor;

use media_gesture::{
    actions::{build_handler, ActionHandler},
    gesture::MediaAction,
    replay::{compare_expectation, format_gesture, parse_expectation_file, parse_trace_file, replay},
    runtime::{gesture_task, status_task, GestureRuntime, HostRuntime, StatusLog},
    settings::{load_app_config_or_default, render_app_config, AppConfig},
    source::{FileSignalSource, MonotonicClock, SignalSource},
};

#[derive(Debug, Parser)]
#[command(name = "media-gesture")]
#[command(about = "Turns button clicks and holds into media actions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll the configured source and dispatch detected gestures.
    Run(ConfigArgs),
    /// Feed a recorded `<ms> <0|1|x>` trace through the detector.
    Replay(ReplayArgs),
    /// Validate a config file and print the compiled result.
    CheckConfig(CheckConfigArgs),
    /// Dispatch one action through the configured handler.
    Send(SendArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ReplayArgs {
    trace: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    expect: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CheckConfigArgs {
    path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SendArgs {
    action: MediaAction,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_detector(load_config(args.config.as_deref())?),
        Commands::Replay(args) => run_replay(args),
        Commands::CheckConfig(args) => {
            let config = load_config(args.path.as_deref())?;
            print!("{}", render_app_config(&config));
            Ok(())
        }
        Commands::Send(args) => {
            let config = load_config(args.config.as_deref())?;
            let mut handler = build_handler(&config.actions);
            handler
                .dispatch(args.action)
                .with_context(|| format!("{} handler failed", handler.name()))?;
            println!("sent {} via {}", args.action, handler.name());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    load_app_config_or_default(path).with_context(|| match path {
        Some(path) => format!("loading {}", path.display()),
        None => "loading built-in defaults".to_owned(),
    })
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let samples = parse_trace_file(&args.trace)?;
    let gestures = replay(&config.detector, &samples, config.runtime.poll_interval_ms);

    for gesture in &gestures {
        println!("{}", format_gesture(gesture));
    }

    if let Some(expect) = args.expect {
        let expected = parse_expectation_file(&expect)?;
        compare_expectation(&expected, &gestures)?;
    }
    Ok(())
}

fn run_detector(config: AppConfig) -> Result<()> {
    let Some(path) = config.source.path.clone() else {
        bail!("source.path is not set; nothing to poll");
    };

    let source: Box<dyn SignalSource> = Box::new(FileSignalSource::new(path, config.source.offset));
    let handler = build_handler(&config.actions);
    log::info!(
        "polling {} every {}ms, handler={}",
        source.describe(),
        config.runtime.poll_interval_ms,
        handler.name()
    );

    let status_log = StatusLog::new(
        config.runtime.status_log_json.as_deref(),
        config.detector.hold_threshold_ms,
    )
    .context("opening status log")?;
    let runtime: HostRuntime =
        GestureRuntime::new(config.detector, config.runtime, source, handler);

    let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
    executor.run(move |spawner| {
        spawner.must_spawn(status_task(status_log, exit_on_stop));
        spawner.must_spawn(gesture_task(runtime, MonotonicClock::new()));
    })
}

fn exit_on_stop() {
    log::error!(
        "source unavailable (connect failed or signal lost) and runtime.auto_reconnect is disabled"
    );
    std::process::exit(1);
}
