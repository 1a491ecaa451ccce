use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::EncodeSpec;

/// Suffix appended to the output stem to name the intermediate palette image.
pub const PALETTE_SUFFIX: &str = "_palette.png";

/// One stage of the video filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    /// `setpts` timestamp rescale for a playback speed multiplier
    Timestamp { speed: f64 },
    /// Lanczos resize to a fixed width, height follows the aspect ratio
    Scale { width: u32 },
    /// Output frame-rate sampling
    Fps(u32),
}

impl FilterStage {
    pub fn is_rate_sampling(&self) -> bool {
        matches!(self, FilterStage::Fps(_))
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::Timestamp { speed } if *speed > 1.0 => {
                write!(f, "setpts=PTS/{}", float_arg(*speed))
            }
            FilterStage::Timestamp { speed } => write!(f, "setpts=PTS*{}", float_arg(1.0 / speed)),
            FilterStage::Scale { width } => write!(f, "scale={}:-1:flags=lanczos", width),
            FilterStage::Fps(rate) => write!(f, "fps={}", rate),
        }
    }
}

/// Shortest round-trip float form, always with a fractional part (`2.0`, `0.75`).
/// Magnitudes of 1e16 and up print as `1e16`; ffmpeg's expression parser reads that
/// the same as `1e+16`.
fn float_arg(value: f64) -> String {
    format!("{:?}", value)
}

/// Ordered filter stages derived from an [`EncodeSpec`].
///
/// The order is fixed: timestamp rescale, resize, frame-rate sampling.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChain {
    stages: Vec<FilterStage>,
}

impl FilterChain {
    pub fn for_spec(spec: &EncodeSpec) -> Self {
        let mut stages = Vec::with_capacity(3);
        if spec.speed_factor != 1.0 {
            stages.push(FilterStage::Timestamp {
                speed: spec.speed_factor,
            });
        }
        if let Some(width) = spec.width {
            stages.push(FilterStage::Scale { width });
        }
        stages.push(FilterStage::Fps(spec.frame_rate));
        Self { stages }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The chain used for palette generation: everything except frame-rate
    /// sampling, so the palette sees every source frame.
    pub fn palette_filters(&self) -> FilterChain {
        FilterChain {
            stages: self
                .stages
                .iter()
                .filter(|stage| !stage.is_rate_sampling())
                .cloned()
                .collect(),
        }
    }

    /// `-vf` argument for the palette pass.
    pub fn palette_graph(&self, max_colors: u32) -> String {
        let palettegen = format!("palettegen=max_colors={}", max_colors);
        let filters = self.palette_filters();
        if filters.is_empty() {
            palettegen
        } else {
            format!("{},{}", filters, palettegen)
        }
    }

    /// `-lavfi` argument for the encode pass; input 1 is the palette image.
    pub fn encode_graph(&self) -> String {
        if self.is_empty() {
            "[0:v][1:v]paletteuse".to_string()
        } else {
            format!("{}[x];[x][1:v]paletteuse", self)
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, stage) in self.stages.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

/// Palette image path for an output file: same directory, `<stem>_palette.png`.
pub fn palette_path_for(output: &Path) -> PathBuf {
    let mut name: OsString = output
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("vid2gif"));
    name.push(PALETTE_SUFFIX);
    output.with_file_name(name)
}

/// Owns the intermediate palette file for one pipeline run.
///
/// Call [`PaletteArtifact::remove`] to delete it and observe failures; if the
/// guard is dropped without that (early return, unwind) the file is removed
/// silently.
pub struct PaletteArtifact {
    path: PathBuf,
    armed: bool,
}

impl PaletteArtifact {
    pub fn for_output(output: &Path) -> Self {
        Self {
            path: palette_path_for(output),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the palette file. A file that was never created is not an error.
    pub fn remove(mut self) -> Result<()> {
        self.armed = false;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::ArtifactCleanupFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for PaletteArtifact {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
