use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use shatter::{EffectConfig, ShatterEffect};

#[derive(Parser, Debug)]
#[command(name = "shatter", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the effect offline and export the frames as a PNG sequence.
    Frames(FramesArgs),
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Effect configuration JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source image path. Overrides `image_source` from the config.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Output directory for the PNG sequence.
    #[arg(long)]
    out_dir: PathBuf,

    /// Number of frames to export at 60 fps.
    #[arg(long, default_value_t = 240)]
    frames: u32,

    /// Frame indices at which to toggle Assembled/Scattered. Repeatable.
    #[arg(long)]
    toggle_at: Vec<u32>,

    /// Seed for deterministic layouts and scatter targets.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frames(args) => cmd_frames(args),
    }
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let mut config: EffectConfig = match &args.config {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse config '{}'", path.display()))?
        }
        None => EffectConfig::default(),
    };
    if let Some(image) = &args.image {
        config.image_source = Some(image.display().to_string());
    }

    let image_bytes = match &config.image_source {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("read image '{path}'"))?,
        ),
        None => None,
    };

    let mut effect = match args.seed {
        Some(seed) => ShatterEffect::with_seed(config, image_bytes.as_deref(), seed)?,
        None => ShatterEffect::new(config, image_bytes.as_deref())?,
    };

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let dt = 1.0 / 60.0;
    for i in 0..args.frames {
        if args.toggle_at.contains(&i) {
            effect.toggle();
        }
        effect.tick(dt);
        let frame = effect.render()?;

        let out = args.out_dir.join(format!("frame_{i:04}.png"));
        image::save_buffer_with_format(
            &out,
            &frame.to_straight_alpha(),
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out.display()))?;
    }

    eprintln!("wrote {} frames to {}", args.frames, args.out_dir.display());
    Ok(())
}
