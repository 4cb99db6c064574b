use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use slidecast::{
    FfmpegSinkFactory, FfmpegSinkOpts, FrameClock, FrameIndex, FsImageDecoder, ImmediateClock,
    Manifest, OutputFormat, RealtimeClock, Studio, Timeline, TransitionKind,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the slideshow to a video file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the segment plan as JSON.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct SettingsArgs {
    /// Slideshow manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Override the transition (dissolve, slide).
    #[arg(long)]
    transition: Option<TransitionKind>,

    /// Override seconds per photo (2-6).
    #[arg(long)]
    photo_duration: Option<f64>,

    /// Override seconds per transition (0.5-2).
    #[arg(long)]
    transition_duration: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Webm,
    Mp4,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Output path. Defaults to `photo-sequence-<millis>.<ext>` in the current directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Container and codec.
    #[arg(long, value_enum, default_value_t = FormatArg::Webm)]
    format: FormatArg,

    /// Pace frames at the output frame rate instead of rendering flat out.
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    settings: SettingsArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Plan(args) => cmd_plan(args),
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
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_manifest(args: &SettingsArgs) -> anyhow::Result<Manifest> {
    let mut manifest = Manifest::from_path(&args.manifest)?;
    if let Some(t) = args.transition {
        manifest.settings.transition = t;
    }
    if let Some(secs) = args.photo_duration {
        manifest.settings.photo_duration_secs = secs;
    }
    if let Some(secs) = args.transition_duration {
        manifest.settings.transition_duration_secs = secs;
    }
    Ok(manifest)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let manifest = load_manifest(&args.settings)?;

    let format = match args.format {
        FormatArg::Webm => OutputFormat::WebmVp9,
        FormatArg::Mp4 => OutputFormat::Mp4H264,
    };
    let sinks = FfmpegSinkFactory {
        opts: FfmpegSinkOpts {
            format,
            ..FfmpegSinkOpts::default()
        },
    };
    let mut studio = Studio::new(
        std::sync::Arc::new(FsImageDecoder),
        std::sync::Arc::new(sinks),
    );
    studio.configure(
        manifest
            .photo_sources()
            .into_iter()
            .map(|src| (src.label, src.data)),
        manifest.settings.clone(),
    )?;

    let mut job = studio.start()?;
    let mut clock: Box<dyn FrameClock> = if args.realtime {
        Box::new(RealtimeClock::new())
    } else {
        Box::new(ImmediateClock)
    };
    let mut last = None;
    let video = job.run(clock.as_mut(), |pct| {
        if last != Some(pct) {
            last = Some(pct);
            eprint!("\rrendering {pct:>3}%");
        }
    })?;
    eprintln!();

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(video.suggested_filename()));
    if !studio.accept_output(video) {
        anyhow::bail!("inputs changed during render");
    }
    let video = studio
        .output()
        .context("rendered video missing after completion")?;

    create_parent_dir(&out)?;
    std::fs::write(&out, &video.video.bytes)
        .with_context(|| format!("write video '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {} bytes, {})",
        out.display(),
        video.frames,
        video.video.bytes.len(),
        video.video.mime_type
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let manifest = load_manifest(&args.settings)?;
    let request = manifest.to_request()?;
    let frame = slidecast::render_frame_at(&request, &FsImageDecoder, FrameIndex(args.frame))?
        .into_straight_alpha();

    create_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let manifest = load_manifest(&args.settings)?;
    let request = manifest.to_request()?;
    let settings = request.settings();
    let timeline = Timeline::from_timing(request.photos().len(), &settings.to_timing())?;

    let photos: Vec<&str> = request.photos().iter().map(|p| p.label.as_str()).collect();
    let plan = serde_json::json!({
        "photos": photos,
        "settings": settings,
        "photo_frames": timeline.photo_frames(),
        "transition_frames": timeline.transition_frames(),
        "total_frames": timeline.total_frames(),
        "duration_secs": settings.fps.frames_to_secs(timeline.total_frames()),
        "segments": timeline.segments(),
    });
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
