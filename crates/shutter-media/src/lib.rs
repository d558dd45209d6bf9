//! Transcoder capability for preview artifacts.
//!
//! This crate provides:
//! - The [`Transcoder`] trait: source path + media class + bounding box in, JPEG bytes out
//! - A still-image adapter backed by `vipsthumbnail`
//! - A motion adapter backed by FFmpeg (single representative frame)
//! - A router dispatching requests by media class
//! - A closed error enum so callers never depend on tool-specific text

pub mod command;
pub mod error;
pub mod motion;
pub mod source;
pub mod still;
pub mod transcoder;

pub use command::{FfmpegCommand, ToolOutput, ToolRunner, VipsCommand};
pub use error::{TranscodeError, TranscodeResult};
pub use motion::FfmpegTranscoder;
pub use source::open_source;
pub use still::VipsTranscoder;
pub use transcoder::{MediaTranscoder, TranscodeRequest, Transcoder};
