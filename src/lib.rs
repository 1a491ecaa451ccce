//! # vid2gif - Video to GIF Converter Library
//!
//! `vid2gif` turns video files into looping GIFs by driving `ffmpeg` through a
//! two-pass pipeline: a palette is generated from the (optionally sped up and
//! resized) source first, then the source is re-encoded against that palette.
//!
//! ## Features
//!
//! - Palette-constrained GIF encoding for much better color fidelity
//! - Resize, frame-rate, palette size, playback speed and loop control
//! - Directory and batch-file collection of source videos
//! - Pluggable process runner so the pipeline can be tested without ffmpeg
//!
//! ## Example
//!
//! ```no_run
//! use vid2gif::{EncodeSpec, Transcoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transcoder = Transcoder::new();
//! let spec = EncodeSpec::new("clip.mp4").with_width(480).with_fps(15);
//! let gif = transcoder.transcode(&spec)?;
//! println!("wrote {}", gif.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Batches
//!
//! ```no_run
//! use vid2gif::batch::{directory_jobs, run_jobs, JobEvent};
//! use vid2gif::collect::collect_videos;
//! use vid2gif::{EncodeSettings, Transcoder};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let jobs = directory_jobs(collect_videos(Path::new("videos"), true)?, None);
//! let summary = run_jobs(&Transcoder::new(), &EncodeSettings::default(), &jobs, |event| {
//!     if let JobEvent::Failed { source, error } = event {
//!         eprintln!("{}: {}", source.display(), error);
//!     }
//! });
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod collect;
pub mod config;
pub mod error;
pub mod filters;
pub mod runner;

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use config::AppConfig;
pub use error::{Error, Pass, Result};
pub use filters::{FilterChain, FilterStage, PaletteArtifact};
pub use runner::{ProcessOutput, ProcessRunner, SystemRunner};

/// Extension given to derived output paths.
pub const GIF_EXTENSION: &str = "gif";
pub const DEFAULT_FPS: u32 = 10;
pub const DEFAULT_PALETTE_SIZE: u32 = 90;
pub const MAX_PALETTE_SIZE: u32 = 100;

/// Loop behaviour of the produced GIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Looping {
    /// Repeat forever (`-loop 0`)
    #[default]
    Forever,
    /// Maps to `-loop 1`. ffmpeg reads that as "repeat once more", so the
    /// animation plays twice before stopping rather than once.
    Disabled,
}

impl Looping {
    pub fn from_flag(no_loop: bool) -> Self {
        if no_loop {
            Looping::Disabled
        } else {
            Looping::Forever
        }
    }

    /// Value passed to ffmpeg's `-loop` option.
    pub fn loop_count(self) -> u32 {
        match self {
            Looping::Forever => 0,
            Looping::Disabled => 1,
        }
    }
}

impl fmt::Display for Looping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Looping::Forever => f.write_str("Enabled"),
            Looping::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Everything needed to encode one source video into one GIF.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSpec {
    /// Input video
    pub source_path: PathBuf,
    /// Output GIF; `<source stem>.gif` next to the source when `None`
    pub output_path: Option<PathBuf>,
    /// Output width in pixels, height follows the aspect ratio
    pub width: Option<u32>,
    /// Output frames per second
    pub frame_rate: u32,
    /// Maximum palette colors (1-100)
    pub palette_size: u32,
    /// ffmpeg `-loop` value, 0 repeats forever
    pub loop_count: u32,
    /// Playback speed multiplier
    pub speed_factor: f64,
}

impl EncodeSpec {
    /// Create a spec for a source with default settings
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: None,
            width: None,
            frame_rate: DEFAULT_FPS,
            palette_size: DEFAULT_PALETTE_SIZE,
            loop_count: Looping::Forever.loop_count(),
            speed_factor: 1.0,
        }
    }

    /// Create a spec with an explicit output path
    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Create a spec with a specific width
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Create a spec with a specific frame rate
    pub fn with_fps(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Create a spec with a specific maximum palette size
    pub fn with_palette_size(mut self, palette_size: u32) -> Self {
        self.palette_size = palette_size;
        self
    }

    /// Create a spec with a specific loop behaviour
    pub fn with_looping(mut self, looping: Looping) -> Self {
        self.loop_count = looping.loop_count();
        self
    }

    /// Create a spec with a specific playback speed multiplier
    pub fn with_speed(mut self, speed_factor: f64) -> Self {
        self.speed_factor = speed_factor;
        self
    }

    /// The output path, derived from the source when none was given.
    pub fn resolved_output(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => path.clone(),
            None => self.source_path.with_extension(GIF_EXTENSION),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_params(self.width, self.frame_rate, self.palette_size, self.speed_factor)
    }
}

fn check_params(width: Option<u32>, frame_rate: u32, palette_size: u32, speed: f64) -> Result<()> {
    if width == Some(0) {
        return Err(Error::InvalidSpec("width must be a positive number of pixels".into()));
    }
    if frame_rate == 0 {
        return Err(Error::InvalidSpec("frames per second must be positive".into()));
    }
    if !(1..=MAX_PALETTE_SIZE).contains(&palette_size) {
        return Err(Error::InvalidSpec(format!(
            "quality must be between 1 and {}, got {}",
            MAX_PALETTE_SIZE, palette_size
        )));
    }
    if !speed.is_finite() || speed <= 0.0 {
        return Err(Error::InvalidSpec(format!("speed must be a positive number, got {}", speed)));
    }
    Ok(())
}

/// Driver-level encode parameters shared by every job of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub width: Option<u32>,
    pub fps: u32,
    /// Palette size, presented to users as "quality"
    pub quality: u32,
    pub looping: Looping,
    pub speed: f64,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            width: None,
            fps: DEFAULT_FPS,
            quality: DEFAULT_PALETTE_SIZE,
            looping: Looping::Forever,
            speed: 1.0,
        }
    }
}

impl EncodeSettings {
    pub fn validate(&self) -> Result<()> {
        check_params(self.width, self.fps, self.quality, self.speed)
    }

    pub fn spec_for(&self, source: impl Into<PathBuf>, output: Option<PathBuf>) -> EncodeSpec {
        EncodeSpec {
            source_path: source.into(),
            output_path: output,
            width: self.width,
            frame_rate: self.fps,
            palette_size: self.quality,
            loop_count: self.looping.loop_count(),
            speed_factor: self.speed,
        }
    }
}

/// Locates the ffmpeg executable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FfmpegConfig {
    /// Explicit ffmpeg binary; `ffmpeg` from `PATH` when unset
    pub ffmpeg_path: Option<PathBuf>,
}

impl FfmpegConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffmpeg executable
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn ffmpeg_cmd(&self) -> &OsStr {
        self.ffmpeg_path
            .as_deref()
            .map(Path::as_os_str)
            .unwrap_or_else(|| OsStr::new("ffmpeg"))
    }
}

/// Runs the two-pass palette pipeline.
pub struct Transcoder<R = SystemRunner> {
    ffmpeg: FfmpegConfig,
    runner: R,
}

impl Transcoder<SystemRunner> {
    /// Create a transcoder that runs `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_ffmpeg(FfmpegConfig::default())
    }

    /// Create a transcoder that runs the configured ffmpeg
    pub fn with_ffmpeg(ffmpeg: FfmpegConfig) -> Self {
        Self {
            ffmpeg,
            runner: SystemRunner,
        }
    }
}

impl Default for Transcoder<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ProcessRunner> Transcoder<R> {
    /// Create a transcoder that spawns ffmpeg through `runner`
    pub fn with_runner(ffmpeg: FfmpegConfig, runner: R) -> Self {
        Self { ffmpeg, runner }
    }

    /// Encode `spec.source_path` into a GIF and return the output path.
    ///
    /// Runs ffmpeg twice, palette generation then palette-constrained
    /// encoding. The intermediate `<stem>_palette.png` next to the output is
    /// removed before returning, whether or not encoding succeeded; a failure
    /// to remove it is logged and does not change the result.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidSpec`] for out-of-range parameters or a source that
    ///   is not a regular file
    /// * [`Error::SourceNotFound`] when the source does not exist; nothing is
    ///   spawned in that case
    /// * [`Error::EncoderUnavailable`] when ffmpeg cannot be started
    /// * [`Error::EncodingFailed`] when either pass exits non-zero
    pub fn transcode(&self, spec: &EncodeSpec) -> Result<PathBuf> {
        spec.validate()?;
        if !spec.source_path.exists() {
            return Err(Error::SourceNotFound(spec.source_path.clone()));
        }
        if !spec.source_path.is_file() {
            return Err(Error::InvalidSpec(format!(
                "{} is not a regular file",
                spec.source_path.display()
            )));
        }

        let output = spec.resolved_output();
        let chain = FilterChain::for_spec(spec);
        let palette = PaletteArtifact::for_output(&output);

        let result = self.run_passes(spec, &chain, palette.path(), &output);

        if let Err(err) = palette.remove() {
            warn!(error = %err, "palette cleanup failed");
        }

        result.map(|()| output)
    }

    fn run_passes(&self, spec: &EncodeSpec, chain: &FilterChain, palette: &Path, output: &Path) -> Result<()> {
        info!(source = %spec.source_path.display(), palette = %palette.display(), "generating palette");
        let args = palette_pass_args(&spec.source_path, chain, spec.palette_size, palette);
        self.run_pass(Pass::Palette, &args)?;

        info!(source = %spec.source_path.display(), output = %output.display(), "encoding gif");
        let args = encode_pass_args(&spec.source_path, palette, chain, spec.loop_count, output);
        self.run_pass(Pass::Encode, &args)
    }

    fn run_pass(&self, pass: Pass, args: &[OsString]) -> Result<()> {
        let program = self.ffmpeg.ffmpeg_cmd();
        debug!(%pass, command = %command_line(program, args), "running ffmpeg");

        let output = self
            .runner
            .run(program, args)
            .map_err(|source| Error::EncoderUnavailable {
                program: program.to_string_lossy().into_owned(),
                source,
            })?;

        if !output.success() {
            return Err(Error::EncodingFailed {
                pass,
                code: output.code,
                stderr: output.stderr_lossy(),
            });
        }
        Ok(())
    }
}

/// Arguments for the palette pass:
/// `-i <source> -vf <filters>,palettegen=max_colors=<n> -y <palette>`.
pub fn palette_pass_args(source: &Path, chain: &FilterChain, palette_size: u32, palette: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        source.into(),
        "-vf".into(),
        chain.palette_graph(palette_size).into(),
        "-y".into(),
        palette.into(),
    ]
}

/// Arguments for the encode pass:
/// `-i <source> -i <palette> -lavfi <graph> -loop <n> -y <output>`.
pub fn encode_pass_args(source: &Path, palette: &Path, chain: &FilterChain, loop_count: u32, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        source.into(),
        "-i".into(),
        palette.into(),
        "-lavfi".into(),
        chain.encode_graph().into(),
        "-loop".into(),
        loop_count.to_string().into(),
        "-y".into(),
        output.into(),
    ]
}

fn command_line(program: &OsStr, args: &[OsString]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(OsString::as_os_str))
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
