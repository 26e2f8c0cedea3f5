use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use flipreel::{Engine, EngineOpts, FsWatcher, LoadedDocument, NullWatcher, Tick};

#[derive(Parser, Debug)]
#[command(name = "flipreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a document and report its segments and diagnostics.
    Check(CheckArgs),
    /// Render a single tick as a PNG.
    Frame(FrameArgs),
    /// Reload and rebuild whenever the document or one of its images changes.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Print the resolved timeline (segments, frame table, diagnostics) as JSON.
    #[arg(long)]
    json: bool,

    /// Exit with an error if any diagnostic was recorded.
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Tick index (0-based, clamped to the timeline).
    #[arg(long, conflicts_with = "at_ms", required_unless_present = "at_ms")]
    tick: Option<u64>,

    /// Playback position in milliseconds.
    #[arg(long)]
    at_ms: Option<u64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Quiet period (ms) after a change before rebuilding.
    #[arg(long, default_value_t = 200)]
    debounce_ms: u64,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Check(args) => cmd_check(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Watch(args) => cmd_watch(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let mut engine = Engine::new(&args.in_path, EngineOpts::default(), NullWatcher);
    let loaded = engine.on_document_changed()?;
    let timeline = &loaded.timeline;

    if args.json {
        let out = serde_json::json!({
            "segments": timeline.segments,
            "index": timeline.index,
            "frames": timeline.frames,
            "diagnostics": timeline.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&loaded);
    }

    if args.strict && timeline.has_errors() {
        anyhow::bail!(
            "{} diagnostic(s) recorded for '{}'",
            timeline.diagnostics.len(),
            args.in_path.display()
        );
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut engine = Engine::new(&args.in_path, EngineOpts::default(), NullWatcher);
    let loaded = engine.on_document_changed()?;

    let tick = match (args.tick, args.at_ms) {
        (Some(t), _) => loaded.timeline.frames.clamp_tick(Tick(t)),
        (None, Some(ms)) => loaded.mapper().tick_for_time(ms),
        (None, None) => anyhow::bail!("one of --tick or --at-ms is required"),
    };
    eprintln!("{}", loaded.mapper().describe(tick));

    let img = engine.render_tick(tick)?;
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_watch(args: WatchArgs) -> anyhow::Result<()> {
    let (watcher, feed) = FsWatcher::new()?;
    let mut engine = Engine::new(&args.in_path, EngineOpts::default(), watcher);
    match engine.on_document_changed() {
        Ok(loaded) => print_summary(&loaded),
        Err(e) => eprintln!("{e}"),
    }

    let settle = Duration::from_millis(args.debounce_ms);
    loop {
        for path in feed.next_batch(Duration::from_secs(1), settle)? {
            match engine.on_path_changed(&path) {
                Ok(loaded) => print_summary(&loaded),
                Err(e) => eprintln!("{e}"),
            }
        }
    }
}

fn print_summary(loaded: &LoadedDocument) {
    let timeline = &loaded.timeline;
    for label in timeline.index.labels() {
        println!("{label}");
    }
    for diag in &timeline.diagnostics {
        println!("{diag}");
    }
    println!(
        "{} segment(s), {} tick(s), {} diagnostic(s)",
        timeline.segments.len(),
        timeline.frames.len(),
        timeline.diagnostics.len()
    );
}
