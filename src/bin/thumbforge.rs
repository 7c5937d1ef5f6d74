use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "thumbforge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a thumbnail state JSON to a JPEG or PNG image.
    Render(RenderArgs),
    /// Print the built-in style presets as JSON.
    Presets,
    /// Write a starter thumbnail state JSON.
    Init(InitArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input thumbnail state JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image path (`.jpg`/`.jpeg` exports JPEG, anything else PNG).
    #[arg(long)]
    out: PathBuf,

    /// Directory of .ttf/.otf/.ttc files to register before rendering.
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Family substituted when a state font is not registered.
    #[arg(long)]
    fallback: Option<String>,

    /// Device pixel ratio; device output is 1280x720 times this.
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,

    /// Style preset id applied on top of the state (see `presets`).
    #[arg(long)]
    preset: Option<String>,

    /// Render tuning JSON overriding the default text/shadow/logo styling.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InitArgs {
    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Presets => cmd_presets(),
        Command::Init(args) => cmd_init(args),
    }
}

fn read_state_json(path: &Path) -> anyhow::Result<thumbforge::ThumbnailState> {
    let f = File::open(path).with_context(|| format!("open state '{}'", path.display()))?;
    let r = BufReader::new(f);
    let state: thumbforge::ThumbnailState =
        serde_json::from_reader(r).with_context(|| "parse state JSON")?;
    Ok(state)
}

fn read_config_json(path: &Path) -> anyhow::Result<thumbforge::RenderConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let config: thumbforge::RenderConfig =
        serde_json::from_reader(r).with_context(|| "parse config JSON")?;
    Ok(config)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut state = read_state_json(&args.in_path)?;
    if let Some(id) = &args.preset {
        let template = thumbforge::template_by_id(id)
            .with_context(|| format!("unknown preset '{id}' (try the `presets` command)"))?;
        thumbforge::apply_preset(&mut state, &template.style);
    }
    state.validate()?;

    let config = match &args.config {
        Some(path) => read_config_json(path)?,
        None => thumbforge::RenderConfig::default(),
    };

    let mut fonts = thumbforge::FontLibrary::new();
    if let Some(dir) = &args.fonts {
        let loaded = fonts.load_fonts_dir(dir)?;
        eprintln!("registered {} font families from {}", loaded.len(), dir.display());
    }
    if let Some(family) = &args.fallback {
        fonts.set_fallback_family(family)?;
    }

    let mut renderer = thumbforge::ThumbnailRenderer::with_config(fonts, config)?;
    let mut surface = thumbforge::RenderSurface::new(args.dpr)?;

    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let mut images = thumbforge::FsImageLoader::new(assets_root);

    renderer.render(&mut surface, &state, &mut images)?;

    let bytes = if is_jpeg_path(&args.out) {
        thumbforge::encode_jpeg(&surface)?
    } else {
        thumbforge::encode_png(&surface)?
    };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write image '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_presets() -> anyhow::Result<()> {
    let templates = thumbforge::builtin_templates();
    let json = serde_json::to_string_pretty(&templates).context("serialize presets")?;
    println!("{json}");
    Ok(())
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    let state = thumbforge::ThumbnailState::default();
    let mut json = serde_json::to_string_pretty(&state).context("serialize default state")?;
    json.push('\n');

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, json)
        .with_context(|| format!("write state '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn is_jpeg_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg")
    )
}
