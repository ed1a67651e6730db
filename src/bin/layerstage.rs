use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "layerstage", version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a scene headlessly and print its stage objects at one instant as JSON.
    Inspect(InspectArgs),
    /// Normalize a scene and report configuration warnings.
    Validate(ValidateArgs),
    /// List the built-in behavior presets.
    Presets,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Scene time in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Wall-clock time (Unix seconds) at scene start, for clock layers.
    #[arg(long, default_value_t = 0.0)]
    wall: f64,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = Backend::Canvas2d)]
    backend: Backend,

    /// Surface width.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Surface height.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,

    /// Image registry JSON (`{"id": "url"}`) for `imageId` layers.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Override prefetch worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Exit with an error when any warning is reported.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Canvas2d,
    Scene3d,
    Gl,
}

impl Backend {
    fn key(self) -> &'static str {
        match self {
            Self::Canvas2d => layerstage::Canvas2dAdapter::KEY,
            Self::Scene3d => layerstage::Scene3dAdapter::KEY,
            Self::Gl => layerstage::GlAdapter::KEY,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Presets => cmd_presets(),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_registry(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read registry '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| "parse registry JSON")
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let scene = layerstage::SceneConfig::from_path(&args.in_path)?;
    let surface = layerstage::Surface::with_pixel_ratio(args.width, args.height, args.pixel_ratio)?;

    let mut resolver = layerstage::AssetResolver::new();
    if let Some(path) = &args.registry {
        resolver = resolver.with_registry(read_registry(path)?);
    }

    let assets_root = args
        .in_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let loader = Arc::new(layerstage::FileLoader::new(assets_root));
    let clock = Arc::new(layerstage::ManualClock::new(args.wall));

    let opts = layerstage::EngineOpts {
        backend: layerstage::BackendChoice::Explicit(args.backend.key().to_owned()),
        prefetch_threads: args.threads,
        skip_idle_ticks: false,
        ..layerstage::EngineOpts::default()
    };
    let mut engine = layerstage::StageEngine::with_loader(opts, clock.clone(), resolver, loader)?;
    let mut host = layerstage::HeadlessHost::new(surface);

    let report = engine.build(&scene)?;
    engine.mount(&mut host)?;
    clock.set(args.at);
    engine.tick()?;

    let out = serde_json::json!({
        "at": args.at,
        "backend": args.backend.key(),
        "objects": engine.objects().collect::<Vec<_>>(),
        "skipped": report.skipped,
        "warnings": report.warnings,
        "prefetch": report.prefetch,
        "engine": engine.stats(),
        "adapter": engine.adapter_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    engine.teardown(&mut host);
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let scene = layerstage::SceneConfig::from_path(&args.in_path)?;
    let normalized = layerstage::normalize_scene(&scene);

    for w in &normalized.warnings {
        eprintln!("warning: {w}");
    }
    println!(
        "{}: {} layers, {} warnings",
        args.in_path.display(),
        normalized.layers.len(),
        normalized.warnings.len()
    );

    if args.strict && !normalized.warnings.is_empty() {
        anyhow::bail!("{} configuration warnings", normalized.warnings.len());
    }
    Ok(())
}

fn cmd_presets() -> anyhow::Result<()> {
    let library = layerstage::PresetLibrary::builtin();
    for preset in library.iter() {
        let mut behaviors = Vec::new();
        if preset.spin.is_some() {
            behaviors.push("spin");
        }
        if preset.orbit.is_some() {
            behaviors.push("orbit");
        }
        if preset.clock.is_some() {
            behaviors.push("clock");
        }
        if preset.effects.is_some() {
            behaviors.push("effects");
        }
        println!(
            "{:<16} {:<14} {}",
            preset.name,
            behaviors.join("+"),
            preset.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
