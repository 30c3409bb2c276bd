//! FFmpeg-backed adapters
//!
//! One external `ffmpeg`/`ffprobe` installation provides the recording
//! capability, the encoder, the frame decoder for the compositor and the
//! metadata probe.

mod capability;
mod frames;
mod probe;
mod recorder;

pub use capability::FfmpegCapability;
pub use frames::FfmpegFramePlayer;
pub use probe::FfprobeProbe;
pub use recorder::{FfmpegRecorder, FfmpegRecorderFactory};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

pub const FFMPEG_BINARY: &str = "ffmpeg";
pub const FFPROBE_BINARY: &str = "ffprobe";

/// Command for a child the session controls. On unix the child gets its own
/// process group, so a terminal Ctrl+C reaches only this process and the
/// child stops when the session says so.
fn session_command(binary: &str) -> Command {
    let mut command = Command::new(binary);
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// Ask a child to finish gracefully. FFmpeg flushes and closes its output on SIGINT.
#[cfg(unix)]
fn interrupt(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(id) => signal::kill(Pid::from_raw(id as i32), Signal::SIGINT)
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Last non-empty line of a child's stderr, for error messages
async fn stderr_tail(stderr: Option<impl AsyncRead + Unpin>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = stderr.read_to_end(&mut buf).await;
    last_line(&String::from_utf8_lossy(&buf))
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}
