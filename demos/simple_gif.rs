//! Example: Convert a video to a GIF using vid2gif as a library
//!
//! Run with: cargo run --example simple_gif

use std::path::Path;
use vid2gif::{EncodeSpec, Looping, Transcoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transcoder = Transcoder::new();

    let input = Path::new("tests/video/input/test.mkv");
    let spec = EncodeSpec::new(input)
        .with_output("example_output.gif")
        .with_width(320)
        .with_fps(12)
        .with_speed(1.5)
        .with_looping(Looping::Forever);

    if input.exists() {
        println!("Converting video to GIF...");
        println!("Input: {}", input.display());
        println!("Settings: {}px wide, {}fps, {}x speed", 320, spec.frame_rate, spec.speed_factor);

        let output = transcoder.transcode(&spec)?;

        println!("✓ GIF written to {}", output.display());
    } else {
        println!("Note: {} not found.", input.display());
        println!("To use this example, provide a video file at that path.");
    }

    Ok(())
}
