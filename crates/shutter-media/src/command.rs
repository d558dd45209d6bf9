//! Command builders and runner for the external image/video tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::fs::File;
use tokio::process::Command;
use tracing::debug;

use crate::error::{TranscodeError, TranscodeResult};

/// Tool diagnostics (lowercased) that mean the input format was rejected.
const UNSUPPORTED_FORMAT_MARKERS: &[&str] = &[
    "invalid data found when processing input",
    "not a known file format",
    "is not in a known format",
    "unknown format",
    "unsupported file format",
    "unsupported codec",
    "no decoder",
    "decoder (codec",
];

/// Builder for FFmpeg single-frame extraction commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output target (`pipe:1` writes to stdout)
    output: String,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to stdout.
    pub fn new(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: "pipe:1".to_string(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Seek to an offset before decoding, without accurate seeking.
    pub fn seek(self, offset: impl Into<String>) -> Self {
        self.input_arg("-ss")
            .input_arg(offset)
            .input_arg("-noaccurate_seek")
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Encode the frame as JPEG into an image pipe.
    pub fn jpeg_pipe(self) -> Self {
        self.output_arg("-f")
            .output_arg("image2pipe")
            .output_arg("-c:v")
            .output_arg("mjpeg")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-v".to_string(), self.log_level.clone()];

        args.extend(self.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.clone());

        args
    }
}

/// Builder for `vipsthumbnail` commands reading the source from stdin.
#[derive(Debug, Clone)]
pub struct VipsCommand {
    /// Bounding box in pixels
    size: u32,
}

impl VipsCommand {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    /// Build the command arguments. Output goes to stdout as JPEG.
    pub fn build_args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "-s".to_string(),
            self.size.to_string(),
            "-o".to_string(),
            ".jpg".to_string(),
        ]
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Runs an external tool to completion, capturing stdout.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    tool: String,
}

impl ToolRunner {
    /// Create a runner for a tool looked up on `PATH`.
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Check the tool is installed.
    pub fn locate(&self) -> TranscodeResult<PathBuf> {
        which::which(&self.tool).map_err(|_| TranscodeError::tool_not_found(&self.tool))
    }

    /// Run the tool for `source`, optionally feeding `stdin` from a file.
    ///
    /// Non-zero exits are classified into [`TranscodeError::UnsupportedFormat`]
    /// or [`TranscodeError::ToolFailure`]; an empty stdout is a tool failure.
    pub async fn run(
        &self,
        source: &Path,
        args: &[String],
        stdin: Option<File>,
    ) -> TranscodeResult<ToolOutput> {
        let program = self.locate()?;
        debug!("Running {}: {} {}", self.tool, program.display(), args.join(" "));

        let mut command = Command::new(&program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match stdin {
            Some(file) => command.stdin(Stdio::from(file.into_std().await)),
            None => command.stdin(Stdio::null()),
        };

        let output = command.output().await.map_err(|e| {
            TranscodeError::tool_failure(&self.tool, format!("failed to spawn: {}", e), None)
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(classify_failure(
                &self.tool,
                source,
                &stderr,
                output.status.code(),
            ));
        }

        if output.stdout.is_empty() {
            return Err(TranscodeError::tool_failure(
                &self.tool,
                "produced no output",
                output.status.code(),
            ));
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}

/// Fold a failed tool run into the closed error set.
fn classify_failure(
    tool: &str,
    source: &Path,
    stderr: &str,
    exit_code: Option<i32>,
) -> TranscodeError {
    let lowered = stderr.to_lowercase();
    let first_line = stderr.lines().next().unwrap_or("").to_string();

    if UNSUPPORTED_FORMAT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return TranscodeError::unsupported_format(source, first_line);
    }

    let message = if first_line.is_empty() {
        format!("exited with status {:?}", exit_code)
    } else {
        first_line
    };
    TranscodeError::tool_failure(tool, message, exit_code)
}
