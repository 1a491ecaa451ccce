//! Sequential execution of many encode jobs with a success tally.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::collect::gif_path_in;
use crate::error::Error;
use crate::runner::ProcessRunner;
use crate::{EncodeSettings, Transcoder};

/// One source video and, optionally, where its GIF should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
}

impl Job {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Jobs for a batch list.
///
/// When `output` is an existing directory every GIF is written there as
/// `<stem>.gif`. Any other `output` names the first job's GIF only; later
/// jobs fall back to the path derived from their source.
pub fn batch_jobs(sources: Vec<PathBuf>, output: Option<&Path>) -> Vec<Job> {
    let output_dir = output.filter(|out| out.is_dir());
    sources
        .into_iter()
        .enumerate()
        .map(|(idx, source)| {
            let output = match (output_dir, output) {
                (Some(dir), _) => Some(gif_path_in(dir, &source)),
                (None, Some(file)) if idx == 0 => Some(file.to_path_buf()),
                _ => None,
            };
            Job { source, output }
        })
        .collect()
}

/// Jobs for videos found in a directory, writing into `output_dir` when set
/// and next to each source otherwise.
pub fn directory_jobs(videos: Vec<PathBuf>, output_dir: Option<&Path>) -> Vec<Job> {
    videos
        .into_iter()
        .map(|source| match output_dir {
            Some(dir) => {
                let output = gif_path_in(dir, &source);
                Job::new(source).with_output(output)
            }
            None => Job::new(source),
        })
        .collect()
}

/// Per-job notifications emitted by [`run_jobs`].
#[derive(Debug)]
pub enum JobEvent<'a> {
    Started {
        /// 1-based position in the run
        index: usize,
        total: usize,
        source: &'a Path,
    },
    Finished {
        output: &'a Path,
    },
    Failed {
        source: &'a Path,
        error: &'a Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, ok: bool) {
        self.total += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} videos converted successfully",
            self.succeeded, self.total
        )
    }
}

/// Run every job in order. A failing job is reported through `on_event`
/// and counted; it never stops the remaining jobs.
pub fn run_jobs<R, F>(
    transcoder: &Transcoder<R>,
    settings: &EncodeSettings,
    jobs: &[Job],
    mut on_event: F,
) -> BatchSummary
where
    R: ProcessRunner,
    F: FnMut(JobEvent<'_>),
{
    let mut summary = BatchSummary::default();
    let total = jobs.len();

    for (idx, job) in jobs.iter().enumerate() {
        on_event(JobEvent::Started {
            index: idx + 1,
            total,
            source: &job.source,
        });

        let spec = settings.spec_for(job.source.clone(), job.output.clone());
        match transcoder.transcode(&spec) {
            Ok(output) => {
                summary.record(true);
                on_event(JobEvent::Finished { output: &output });
            }
            Err(error) => {
                info!(source = %job.source.display(), error = %error, "job failed");
                summary.record(false);
                on_event(JobEvent::Failed {
                    source: &job.source,
                    error: &error,
                });
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_and_renders() {
        let mut summary = BatchSummary::default();
        summary.record(true);
        summary.record(false);
        summary.record(true);
        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert!(!summary.all_succeeded());
        assert_eq!(summary.to_string(), "2 of 3 videos converted successfully");
    }

    #[test]
    fn batch_output_file_applies_to_first_job_only() {
        let jobs = batch_jobs(
            vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")],
            Some(Path::new("/nonexistent-vid2gif/custom.gif")),
        );
        assert_eq!(jobs[0].output, Some(PathBuf::from("/nonexistent-vid2gif/custom.gif")));
        assert_eq!(jobs[1].output, None);
    }

    #[test]
    fn batch_output_directory_applies_to_every_job() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = batch_jobs(
            vec![PathBuf::from("x/a.mp4"), PathBuf::from("y/b.mov")],
            Some(dir.path()),
        );
        assert_eq!(jobs[0].output, Some(dir.path().join("a.gif")));
        assert_eq!(jobs[1].output, Some(dir.path().join("b.gif")));
    }

    #[test]
    fn directory_jobs_default_next_to_source() {
        let jobs = directory_jobs(vec![PathBuf::from("v/a.mp4")], None);
        assert_eq!(jobs, vec![Job::new("v/a.mp4")]);

        let jobs = directory_jobs(vec![PathBuf::from("v/a.mp4")], Some(Path::new("out")));
        assert_eq!(jobs[0].output, Some(PathBuf::from("out/a.gif")));
    }

    #[test]
    fn empty_summary_is_successful() {
        let summary = BatchSummary::default();
        assert!(summary.all_succeeded());
        assert_eq!(summary.to_string(), "0 of 0 videos converted successfully");
    }
}
