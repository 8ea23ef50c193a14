pub mod transcoder;

pub use transcoder::{FfmpegTranscoder, TranscodeOutcome, Transcoder};
