//! Pipeline tests driven by a scripted process runner instead of ffmpeg.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use vid2gif::batch::{run_jobs, Job, JobEvent};
use vid2gif::{
    EncodeSettings, EncodeSpec, Error, FfmpegConfig, Pass, ProcessOutput, ProcessRunner,
    Transcoder,
};

#[derive(Clone, Copy)]
enum Step {
    /// Exit 0 and write the output file, like ffmpeg would
    Succeed,
    /// Write a partial output file, then exit with the code and stderr
    Fail(i32, &'static str),
    /// The program cannot be started
    Missing,
    /// Exit 0 after leaving a non-empty directory where the file should be
    Obstruct,
}

#[derive(Default)]
struct ScriptedRunner {
    steps: RefCell<VecDeque<Step>>,
    calls: RefCell<Vec<(OsString, Vec<OsString>)>>,
}

impl ScriptedRunner {
    fn new(steps: &[Step]) -> Self {
        Self {
            steps: RefCell::new(steps.iter().copied().collect()),
            calls: RefCell::default(),
        }
    }

    fn calls(&self) -> Vec<(OsString, Vec<OsString>)> {
        self.calls.borrow().clone()
    }

    fn args(&self, call: usize) -> Vec<String> {
        self.calls.borrow()[call]
            .1
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<ProcessOutput> {
        self.calls
            .borrow_mut()
            .push((program.to_os_string(), args.to_vec()));
        let step = self.steps.borrow_mut().pop_front().unwrap_or(Step::Succeed);
        let target = PathBuf::from(args.last().expect("output argument"));

        match step {
            Step::Succeed => {
                fs::write(&target, b"data")?;
                Ok(ProcessOutput {
                    code: Some(0),
                    ..ProcessOutput::default()
                })
            }
            Step::Fail(code, stderr) => {
                fs::write(&target, b"partial")?;
                Ok(ProcessOutput {
                    code: Some(code),
                    stdout: Vec::new(),
                    stderr: stderr.as_bytes().to_vec(),
                })
            }
            Step::Missing => Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory")),
            Step::Obstruct => {
                fs::create_dir_all(&target)?;
                fs::write(target.join("keep"), b"x")?;
                Ok(ProcessOutput {
                    code: Some(0),
                    ..ProcessOutput::default()
                })
            }
        }
    }
}

fn touch(path: &Path) {
    fs::write(path, b"video").unwrap();
}

fn leftover_palettes(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with("_palette.png"))
        .collect()
}

#[test]
fn reference_clip_runs_both_passes_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    touch(&source);

    let runner = ScriptedRunner::new(&[Step::Succeed, Step::Succeed]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);
    let spec = EncodeSpec::new(&source)
        .with_width(480)
        .with_fps(15)
        .with_palette_size(90);

    let output = transcoder.transcode(&spec).unwrap();
    assert_eq!(output, dir.path().join("clip.gif"));
    assert!(output.exists());
    assert!(leftover_palettes(dir.path()).is_empty());

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(program, _)| program == "ffmpeg"));

    let palette = dir.path().join("clip_palette.png");
    let palette_args = runner.args(0);
    assert_eq!(palette_args[0], "-i");
    assert_eq!(palette_args[1], source.to_string_lossy());
    assert_eq!(palette_args[2], "-vf");
    assert_eq!(palette_args[3], "scale=480:-1:flags=lanczos,palettegen=max_colors=90");
    assert_eq!(palette_args[4], "-y");
    assert_eq!(palette_args[5], palette.to_string_lossy());

    let encode_args = runner.args(1);
    assert_eq!(encode_args[3], palette.to_string_lossy());
    assert_eq!(encode_args[4], "-lavfi");
    assert_eq!(encode_args[5], "scale=480:-1:flags=lanczos,fps=15[x];[x][1:v]paletteuse");
    assert_eq!(&encode_args[6..8], ["-loop", "0"]);
    assert_eq!(encode_args[8], "-y");
    assert_eq!(encode_args[9], output.to_string_lossy());
}

#[test]
fn missing_source_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(&[]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);

    let err = transcoder
        .transcode(&EncodeSpec::new(dir.path().join("nope.mp4")))
        .unwrap_err();
    assert!(matches!(err, Error::SourceNotFound(ref p) if p.ends_with("nope.mp4")), "{}", err);
    assert!(runner.calls().is_empty());
    assert!(leftover_palettes(dir.path()).is_empty());
}

#[test]
fn directory_source_is_rejected_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(&[]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);

    let err = transcoder.transcode(&EncodeSpec::new(dir.path())).unwrap_err();
    assert!(matches!(err, Error::InvalidSpec(_)), "{}", err);
    assert!(runner.calls().is_empty());
}

#[test]
fn palette_failure_stops_before_encode_and_removes_palette() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    touch(&source);

    let runner = ScriptedRunner::new(&[Step::Fail(1, "Invalid data found when processing input")]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);

    let err = transcoder.transcode(&EncodeSpec::new(&source)).unwrap_err();
    match err {
        Error::EncodingFailed { pass, code, stderr } => {
            assert_eq!(pass, Pass::Palette);
            assert_eq!(code, Some(1));
            assert!(stderr.contains("Invalid data"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(runner.calls().len(), 1);
    assert!(leftover_palettes(dir.path()).is_empty());
}

#[test]
fn encode_failure_still_removes_palette() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    touch(&source);

    let runner = ScriptedRunner::new(&[Step::Succeed, Step::Fail(234, "Conversion failed!")]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);

    let err = transcoder.transcode(&EncodeSpec::new(&source)).unwrap_err();
    assert!(
        matches!(err, Error::EncodingFailed { pass: Pass::Encode, code: Some(234), .. }),
        "{}",
        err
    );
    assert_eq!(runner.calls().len(), 2);
    assert!(leftover_palettes(dir.path()).is_empty());
}

#[test]
fn palette_cleanup_failure_does_not_fail_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    touch(&source);

    let runner = ScriptedRunner::new(&[Step::Obstruct, Step::Succeed]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);

    let output = transcoder.transcode(&EncodeSpec::new(&source)).unwrap();
    assert_eq!(output, dir.path().join("clip.gif"));
    assert!(output.is_file());
    assert!(dir.path().join("clip_palette.png").is_dir());
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn unavailable_encoder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    touch(&source);

    let runner = ScriptedRunner::new(&[Step::Missing]);
    let ffmpeg = FfmpegConfig::new().with_ffmpeg_path("/opt/missing/ffmpeg");
    let transcoder = Transcoder::with_runner(ffmpeg, &runner);

    let err = transcoder.transcode(&EncodeSpec::new(&source)).unwrap_err();
    assert!(
        matches!(err, Error::EncoderUnavailable { ref program, .. } if program == "/opt/missing/ffmpeg"),
        "{}",
        err
    );
    assert_eq!(runner.calls()[0].0, "/opt/missing/ffmpeg");
    assert!(leftover_palettes(dir.path()).is_empty());
}

#[test]
fn speed_stage_leads_both_graphs() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mov");
    touch(&source);

    let runner = ScriptedRunner::new(&[]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);
    let spec = EncodeSpec::new(&source).with_speed(2.0).with_width(320);
    transcoder.transcode(&spec).unwrap();

    assert_eq!(
        runner.args(0)[3],
        "setpts=PTS/2.0,scale=320:-1:flags=lanczos,palettegen=max_colors=90"
    );
    assert_eq!(
        runner.args(1)[5],
        "setpts=PTS/2.0,scale=320:-1:flags=lanczos,fps=10[x];[x][1:v]paletteuse"
    );
}

#[test]
fn explicit_output_path_and_loop_value_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    touch(&source);
    fs::create_dir(dir.path().join("out")).unwrap();
    let target = dir.path().join("out").join("short.gif");

    let runner = ScriptedRunner::new(&[]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);
    let spec = EncodeSpec::new(&source)
        .with_output(&target)
        .with_looping(vid2gif::Looping::Disabled);

    assert_eq!(transcoder.transcode(&spec).unwrap(), target);
    assert_eq!(
        runner.args(0)[5],
        dir.path().join("out").join("short_palette.png").to_string_lossy()
    );
    assert_eq!(&runner.args(1)[6..8], ["-loop", "1"]);
    assert!(leftover_palettes(&dir.path().join("out")).is_empty());
}

#[test]
fn batch_continues_past_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("one.mp4");
    let missing = dir.path().join("two.mp4");
    let third = dir.path().join("three.mkv");
    touch(&first);
    touch(&third);

    let runner = ScriptedRunner::new(&[]);
    let transcoder = Transcoder::with_runner(FfmpegConfig::new(), &runner);
    let jobs = vec![Job::new(&first), Job::new(&missing), Job::new(&third)];

    let mut started = Vec::new();
    let mut failed = Vec::new();
    let mut finished = Vec::new();
    let summary = run_jobs(&transcoder, &EncodeSettings::default(), &jobs, |event| match event {
        JobEvent::Started { index, total, .. } => started.push((index, total)),
        JobEvent::Finished { output } => finished.push(output.to_path_buf()),
        JobEvent::Failed { source, error } => {
            assert!(matches!(error, Error::SourceNotFound(_)));
            failed.push(source.to_path_buf());
        }
    });

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.to_string(), "2 of 3 videos converted successfully");
    assert_eq!(started, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(failed, vec![missing]);
    assert_eq!(finished, vec![dir.path().join("one.gif"), dir.path().join("three.gif")]);
    assert_eq!(runner.calls().len(), 4);
}
