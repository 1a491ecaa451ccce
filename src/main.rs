use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input, MultiSelect, Select};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vid2gif::batch::{batch_jobs, directory_jobs, run_jobs, BatchSummary, JobEvent};
use vid2gif::collect::{collect_videos, read_batch_file};
use vid2gif::{AppConfig, EncodeSettings, Looping, Transcoder, MAX_PALETTE_SIZE};

#[derive(Parser, Debug)]
#[command(version, about = "Convert video files to looping GIFs.")]
struct Args {
    /// Input video file or directory containing videos
    input: Option<PathBuf>,

    /// Output GIF file or directory (defaults to the input name with a .gif extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Width of the output GIF (aspect ratio is maintained)
    #[arg(short, long)]
    width: Option<u32>,

    /// Frames per second [default: 10]
    #[arg(short, long)]
    fps: Option<u32>,

    /// Quality, the maximum palette size (1-100) [default: 90]
    #[arg(short, long)]
    quality: Option<u32>,

    /// Process directories recursively
    #[arg(short, long, default_value_t = false)]
    recursive: bool,

    /// Disable infinite looping
    #[arg(long, default_value_t = false)]
    no_loop: bool,

    /// Run in interactive mode
    #[arg(short, long, default_value_t = false)]
    interactive: bool,

    /// Batch file listing videos to convert, one per line
    #[arg(short, long, value_name = "FILE")]
    batch: Option<PathBuf>,

    /// Speed multiplier (>1 speeds up, <1 slows down) [default: 1.0]
    #[arg(short, long)]
    speed: Option<f64>,

    /// ffmpeg executable to use instead of the one on PATH
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,

    /// Log encoder invocations to standard error
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let no_arguments = std::env::args_os().len() <= 1;
    let args = Args::parse();
    init_logging(args.verbose);

    let cfg = AppConfig::load().context("loading vid2gif.json")?;
    let mut ffmpeg = cfg.ffmpeg();
    if let Some(path) = &args.ffmpeg {
        ffmpeg = ffmpeg.with_ffmpeg_path(path);
    }
    let transcoder = Transcoder::with_ffmpeg(ffmpeg);
    let defaults = cfg.settings();

    if no_arguments || args.interactive {
        return run_interactive(&transcoder, &defaults);
    }

    let settings = settings_from_args(&args, defaults);
    settings.validate().context("invalid conversion settings")?;

    if let Some(batch) = &args.batch {
        return run_batch(&transcoder, &settings, batch, args.output.as_deref());
    }

    let input_path = match &args.input {
        Some(p) => p.clone(),
        None => return Err(anyhow!("An input file or directory must be provided (or use --batch / --interactive)")),
    };
    if !input_path.exists() {
        bail!("Input path does not exist: {}", input_path.display());
    }

    if input_path.is_file() {
        let spec = settings.spec_for(&input_path, args.output.clone());
        let output = transcoder
            .transcode(&spec)
            .with_context(|| format!("Error processing {}", input_path.display()))?;
        println!("Successfully created: {}", output.display());
    } else if input_path.is_dir() {
        run_directory(&transcoder, &settings, &input_path, args.output.as_deref(), args.recursive)?;
    } else {
        bail!("Input path is neither a file nor a directory: {}", input_path.display());
    }

    Ok(())
}

fn settings_from_args(args: &Args, defaults: EncodeSettings) -> EncodeSettings {
    EncodeSettings {
        width: args.width.or(defaults.width),
        fps: args.fps.unwrap_or(defaults.fps),
        quality: args.quality.unwrap_or(defaults.quality),
        looping: if args.no_loop {
            Looping::Disabled
        } else {
            defaults.looping
        },
        speed: args.speed.unwrap_or(defaults.speed),
    }
}

fn print_event(event: JobEvent<'_>, verb: &str) {
    match event {
        JobEvent::Started { index, total, source } => {
            println!("\n[{}/{}] {}: {}", index, total, verb, file_label(source));
        }
        JobEvent::Finished { output } => println!("Successfully created: {}", output.display()),
        JobEvent::Failed { source, error } => {
            eprintln!("Error processing {}: {}", source.display(), error);
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_batch(transcoder: &Transcoder, settings: &EncodeSettings, batch: &Path, output: Option<&Path>) -> Result<()> {
    if !batch.is_file() {
        bail!("Batch file not found: {}", batch.display());
    }
    let sources = read_batch_file(batch).with_context(|| format!("reading batch file {}", batch.display()))?;
    let jobs = batch_jobs(sources, output);

    let summary = run_jobs(transcoder, settings, &jobs, |event| print_event(event, "Processing"));
    println!("\nBatch processing complete: {}.", summary);
    Ok(())
}

fn run_directory(
    transcoder: &Transcoder,
    settings: &EncodeSettings,
    dir: &Path,
    output: Option<&Path>,
    recursive: bool,
) -> Result<()> {
    if let Some(out) = output {
        if !out.is_dir() {
            fs::create_dir_all(out).with_context(|| format!("creating output directory {}", out.display()))?;
        }
    }

    let videos = collect_videos(dir, recursive).with_context(|| format!("scanning {}", dir.display()))?;
    let jobs = directory_jobs(videos, output);

    let summary = run_jobs(transcoder, settings, &jobs, |event| print_event(event, "Converting"));
    println!("\nDirectory processing complete: {}.", summary);
    Ok(())
}

enum OutputChoice {
    NextToSource,
    Directory(PathBuf),
    Cancelled,
}

fn run_interactive(transcoder: &Transcoder, defaults: &EncodeSettings) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("\n=== Video to GIF Converter ===\n");

    let modes = [
        "A single video file",
        "All videos in a directory",
        "Select videos from a directory",
    ];
    let mode = Select::with_theme(&theme)
        .with_prompt("What would you like to convert?")
        .default(0)
        .items(&modes)
        .interact()?;

    let sources = if mode == 0 {
        vec![prompt_video_file(&theme)?]
    } else {
        let dir: String = Input::with_theme(&theme)
            .with_prompt("Directory containing videos")
            .interact_text()?;
        let dir = PathBuf::from(dir.trim());
        if !dir.is_dir() {
            bail!("Directory not found: {}", dir.display());
        }

        let recursive = Confirm::with_theme(&theme)
            .with_prompt("Include videos in subdirectories?")
            .default(false)
            .interact()?;

        let videos = collect_videos(&dir, recursive)?;
        if videos.is_empty() {
            bail!("No video files found in {}", dir.display());
        }

        if mode == 1 {
            println!("Found {} videos to convert.", videos.len());
            videos
        } else {
            let labels: Vec<String> = videos
                .iter()
                .map(|v| v.strip_prefix(&dir).unwrap_or(v).display().to_string())
                .collect();
            let picked = MultiSelect::with_theme(&theme)
                .with_prompt("Select videos to convert (space toggles, enter confirms)")
                .items(&labels)
                .interact()?;
            if picked.is_empty() {
                bail!("No videos selected.");
            }
            picked.into_iter().map(|idx| videos[idx].clone()).collect()
        }
    };

    let output_dir = match prompt_output_dir(&theme)? {
        OutputChoice::NextToSource => None,
        OutputChoice::Directory(dir) => Some(dir),
        OutputChoice::Cancelled => {
            println!("Operation cancelled.");
            return Ok(());
        }
    };

    let settings = prompt_settings(&theme, defaults)?;

    println!("\nReady to convert {} video(s) with:", sources.len());
    println!(
        "- Width: {}",
        settings.width.map(|w| w.to_string()).unwrap_or_else(|| "Original".to_string())
    );
    println!("- FPS: {}", settings.fps);
    println!("- Quality: {}", settings.quality);
    println!("- Speed: {}x", settings.speed);
    println!("- Looping: {}", settings.looping);

    if !Confirm::with_theme(&theme)
        .with_prompt("Proceed with conversion?")
        .default(true)
        .interact()?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    println!("\nStarting conversion...");
    let jobs = directory_jobs(sources, output_dir.as_deref());

    let summary: BatchSummary = run_jobs(transcoder, &settings, &jobs, |event| print_event(event, "Converting"));
    println!("\nConversion complete: {}.", summary);
    Ok(())
}

fn prompt_video_file(theme: &ColorfulTheme) -> Result<PathBuf> {
    // Offer videos from the current directory before falling back to a typed path
    let nearby = collect_videos(Path::new("."), false).unwrap_or_default();
    if !nearby.is_empty() {
        let mut items: Vec<String> = nearby.iter().map(|p| file_label(p)).collect();
        items.push("Enter a path...".to_string());
        let selection = FuzzySelect::with_theme(theme)
            .with_prompt("Choose a video")
            .default(0)
            .items(&items)
            .interact()?;
        if let Some(path) = nearby.get(selection) {
            return Ok(path.clone());
        }
    }

    let path: String = Input::with_theme(theme)
        .with_prompt("Path to the video file")
        .interact_text()?;
    let path = PathBuf::from(path.trim());
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    Ok(path)
}

fn prompt_output_dir(theme: &ColorfulTheme) -> Result<OutputChoice> {
    let same_dir = Confirm::with_theme(theme)
        .with_prompt("Write GIFs next to the original files?")
        .default(true)
        .interact()?;
    if same_dir {
        return Ok(OutputChoice::NextToSource);
    }

    let dir: String = Input::with_theme(theme)
        .with_prompt("Output directory")
        .interact_text()?;
    let dir = PathBuf::from(dir.trim());
    if !dir.exists() {
        let create = Confirm::with_theme(theme)
            .with_prompt(format!("Directory {} doesn't exist. Create it?", dir.display()))
            .default(true)
            .interact()?;
        if !create {
            return Ok(OutputChoice::Cancelled);
        }
        fs::create_dir_all(&dir).with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    Ok(OutputChoice::Directory(dir))
}

fn prompt_settings(theme: &ColorfulTheme, defaults: &EncodeSettings) -> Result<EncodeSettings> {
    let width: String = Input::with_theme(theme)
        .with_prompt("Width in pixels (empty keeps the original size)")
        .with_initial_text(defaults.width.map(|w| w.to_string()).unwrap_or_default())
        .allow_empty(true)
        .validate_with(|s: &String| -> Result<(), String> {
            let s = s.trim();
            if s.is_empty() || s.parse::<u32>().is_ok_and(|w| w > 0) {
                Ok(())
            } else {
                Err("enter a positive whole number or leave empty".to_string())
            }
        })
        .interact_text()?;
    let width = match width.trim() {
        "" => None,
        w => Some(w.parse::<u32>().context("parsing width")?),
    };

    let fps: u32 = Input::with_theme(theme)
        .with_prompt("Frames per second")
        .default(defaults.fps)
        .validate_with(|v: &u32| if *v > 0 { Ok(()) } else { Err("must be at least 1") })
        .interact_text()?;

    let quality: u32 = Input::with_theme(theme)
        .with_prompt(format!("Quality (1-{})", MAX_PALETTE_SIZE))
        .default(defaults.quality)
        .validate_with(|v: &u32| {
            if (1..=MAX_PALETTE_SIZE).contains(v) {
                Ok(())
            } else {
                Err(format!("must be between 1 and {}", MAX_PALETTE_SIZE))
            }
        })
        .interact_text()?;

    let speed: f64 = Input::with_theme(theme)
        .with_prompt("Speed multiplier (2.0 = twice as fast, 0.5 = half speed)")
        .default(defaults.speed)
        .validate_with(|v: &f64| {
            if v.is_finite() && *v > 0.0 {
                Ok(())
            } else {
                Err("must be a positive number")
            }
        })
        .interact_text()?;

    let loop_forever = Confirm::with_theme(theme)
        .with_prompt("Enable infinite looping?")
        .default(defaults.looping == Looping::Forever)
        .interact()?;

    let settings = EncodeSettings {
        width,
        fps,
        quality,
        looping: Looping::from_flag(!loop_forever),
        speed,
    };
    settings.validate()?;
    Ok(settings)
}
