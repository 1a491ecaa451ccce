use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two encoder invocations a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Palette generation (`palettegen`)
    Palette,
    /// Palette-constrained encode (`paletteuse`)
    Encode,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Palette => f.write_str("palette"),
            Pass::Encode => f.write_str("encode"),
        }
    }
}

#[derive(thiserror::Error)]
pub enum Error {
    #[error("input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("invalid encode settings: {0}")]
    InvalidSpec(String),

    #[error("could not run encoder '{program}' (is ffmpeg installed and in PATH?): {source}")]
    EncoderUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg {pass} pass failed{}: {}", exit_suffix(.code), .stderr.trim_end())]
    EncodingFailed {
        pass: Pass,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to remove palette file {}: {source}", .path.display())]
    ArtifactCleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " (terminated by signal)".to_string(),
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_failed_message_carries_pass_and_stderr() {
        let err = Error::EncodingFailed {
            pass: Pass::Palette,
            code: Some(1),
            stderr: "clip.mp4: Invalid data found when processing input\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg palette pass failed (exit code 1): clip.mp4: Invalid data found when processing input"
        );
    }

    #[test]
    fn signal_termination_is_reported() {
        let err = Error::EncodingFailed {
            pass: Pass::Encode,
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }
}
