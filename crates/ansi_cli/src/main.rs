use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use ansi_render::{AnsiArtRenderer, FontOptions, RenderConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frame};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert images to truecolor ANSI glyph art")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render ANSI art to stdout for a quick preview
    Preview(PreviewArgs),
    /// Render an image and write an encoding of the result to disk
    Convert(ConvertArgs),
    /// Render an animation (GIF or directory of frames) to ANSI frame files
    Animate(AnimateArgs),
    /// Print the characters a font contributes to the glyph table
    Glyphs(GlyphsArgs),
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input image path
    input: PathBuf,
    /// Target column width
    #[arg(long, default_value_t = 100)]
    width: u16,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input image path
    input: PathBuf,
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
    /// Target column width
    #[arg(long, default_value_t = 120)]
    width: u16,
    /// Output encoding
    #[arg(long, value_enum, default_value = "raw")]
    format: OutputFormat,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug)]
struct AnimateArgs {
    /// Input animation path (GIF file or directory of images)
    input: PathBuf,
    /// Output directory for frame files
    #[arg(short, long)]
    out_dir: PathBuf,
    /// Target column width
    #[arg(long, default_value_t = 120)]
    width: u16,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug)]
struct GlyphsArgs {
    #[command(flatten)]
    font: FontSettings,
}

#[derive(Parser, Debug, Clone)]
struct FontSettings {
    /// Font file used to build the glyph table
    #[arg(long)]
    font: PathBuf,
    /// Rasterization size in pixels
    #[arg(long, default_value_t = 15.0)]
    size: f32,
    /// Characters excluded from the glyph table and from matching
    #[arg(long, default_value = "")]
    forbid: String,
}

#[derive(Parser, Debug, Clone)]
struct RenderSettings {
    #[command(flatten)]
    font: FontSettings,
    /// Worker threads used for the cell pool
    #[arg(long, default_value_t = 8)]
    jobs: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    /// Terminal-ready text
    Raw,
    /// C character-array literal
    C,
    /// `echo -ne` shell command
    Shell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Preview(args) => preview(args),
        Commands::Convert(args) => convert(args),
        Commands::Animate(args) => animate(args),
        Commands::Glyphs(args) => glyphs(args),
    }
}

fn preview(args: PreviewArgs) -> Result<()> {
    let mut renderer = build_renderer(&args.settings.font)?;
    let image = open_image(&args.input)?;
    renderer.load_dynamic_image(&image);

    let artifact = renderer
        .render(&args.settings.to_config(args.width))
        .with_context(|| format!("failed to render {:?}", args.input))?;
    print!("{}", artifact.raw);
    Ok(())
}

fn convert(args: ConvertArgs) -> Result<()> {
    let mut renderer = build_renderer(&args.settings.font)?;
    let image = open_image(&args.input)?;
    renderer.load_dynamic_image(&image);

    renderer.start_render(args.settings.to_config(args.width));

    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}%",
        )
        .unwrap()
        .progress_chars("=> "),
    );
    while renderer.is_rendering() {
        progress.set_position((renderer.progress() * 100.0) as u64);
        thread::sleep(Duration::from_millis(50));
    }
    progress.finish_and_clear();

    let artifact = renderer.artifact();
    if artifact.is_empty() {
        anyhow::bail!("render of {:?} produced no output", args.input);
    }

    let text = match args.format {
        OutputFormat::Raw => &artifact.raw,
        OutputFormat::C => &artifact.c_literal,
        OutputFormat::Shell => &artifact.shell_command,
    };
    let mut file = File::create(&args.output)
        .with_context(|| format!("failed to create {:?}", args.output))?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

fn animate(args: AnimateArgs) -> Result<()> {
    let mut renderer = build_renderer(&args.settings.font)?;
    let config = args.settings.to_config(args.width);
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create output directory {:?}", args.out_dir))?;

    let frames = load_frames(&args.input)?;
    let progress = ProgressBar::new(frames.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    for (index, frame) in frames.into_iter().enumerate() {
        let dynamic = DynamicImage::ImageRgba8(frame.into_buffer());
        renderer.load_dynamic_image(&dynamic);
        let artifact = renderer
            .render(&config)
            .with_context(|| format!("failed to render frame {}", index))?;

        let frame_path = args.out_dir.join(format!("frame_{:04}.txt", index));
        let mut file = File::create(&frame_path)
            .with_context(|| format!("failed to create {:?}", frame_path))?;
        file.write_all(artifact.raw.as_bytes())?;
        progress.inc(1);
    }

    progress.finish_with_message(format!("Frames written to {:?}", args.out_dir));
    Ok(())
}

fn glyphs(args: GlyphsArgs) -> Result<()> {
    let renderer = build_renderer(&args.font)?;
    if let Some(charset) = renderer.glyphs() {
        println!("{}", charset);
    }
    Ok(())
}

fn build_renderer(settings: &FontSettings) -> Result<AnsiArtRenderer> {
    let data = fs::read(&settings.font)
        .with_context(|| format!("failed to read font {:?}", settings.font))?;
    let mut renderer = AnsiArtRenderer::new();
    renderer
        .load_font(&data, &settings.to_options())
        .with_context(|| format!("failed to load font {:?}", settings.font))?;
    Ok(renderer)
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("failed to open image {:?}", path))
}

fn load_frames(path: &Path) -> Result<Vec<Frame>> {
    if path.is_dir() {
        load_frames_from_directory(path)
    } else {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if extension == "gif" {
            load_frames_from_gif(path)
        } else {
            let image = open_image(path)?;
            Ok(vec![Frame::new(image.into_rgba8())])
        }
    }
}

fn load_frames_from_gif(path: &Path) -> Result<Vec<Frame>> {
    let file = File::open(path).with_context(|| format!("failed to open GIF {:?}", path))?;
    let decoder =
        GifDecoder::new(file).with_context(|| format!("failed to decode GIF {:?}", path))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .with_context(|| format!("failed to collect frames from {:?}", path))?;
    Ok(frames)
}

fn load_frames_from_directory(path: &Path) -> Result<Vec<Frame>> {
    let mut entries: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect();
    entries.sort();
    if entries.is_empty() {
        anyhow::bail!("no image files found in {:?}", path);
    }

    let mut frames = Vec::with_capacity(entries.len());
    for entry in entries {
        let image = open_image(&entry)?;
        frames.push(Frame::new(image.into_rgba8()));
    }
    Ok(frames)
}

impl FontSettings {
    fn to_options(&self) -> FontOptions {
        FontOptions {
            size_px: self.size.max(1.0),
            forbidden: self.forbid.chars().collect(),
        }
    }
}

impl RenderSettings {
    fn to_config(&self, width: u16) -> RenderConfig {
        RenderConfig {
            columns: width.max(1),
            worker_count: self.jobs.max(1),
            forbidden: self.font.forbid.chars().collect(),
        }
    }
}
