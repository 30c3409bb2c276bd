//! Container metadata probe using ffprobe
//!
//! The blob is spooled to a throwaway file so the probe never touches the
//! recording path. Containers written as fragmented streams often carry no
//! duration header; in that case the packet timestamps are scanned instead.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::application::ports::{MetadataProbe, ProbeError};
use crate::domain::artifact::{Blob, MediaMetadata};

use super::{last_line, session_command, FFPROBE_BINARY};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// ffprobe-backed metadata loader
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::with_binary(FFPROBE_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str], path: &Path) -> Result<String, ProbeError> {
        let output = session_command(&self.binary)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::Io(format!("{} not found", self.binary))
                } else {
                    ProbeError::Io(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Decode(last_line(&stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    async fn load_metadata(&self, blob: &Blob) -> Result<MediaMetadata, ProbeError> {
        let file = spool_to_temp(blob.clone()).await?;

        let header = self
            .run(
                &["-v", "error", "-show_entries", "format=duration", "-of", "json"],
                file.path(),
            )
            .await?;
        if let Some(duration) = parse_format_duration(&header)? {
            return Ok(MediaMetadata { duration });
        }

        tracing::debug!("container has no duration header, scanning packets");
        let packets = self
            .run(
                &["-v", "error", "-show_entries", "packet=pts_time,duration_time", "-of", "csv=p=0"],
                file.path(),
            )
            .await?;
        Ok(MediaMetadata {
            duration: duration_from_packets(&packets),
        })
    }
}

/// Copy the blob into a throwaway file on the blocking pool.
async fn spool_to_temp(blob: Blob) -> Result<NamedTempFile, ProbeError> {
    tokio::task::spawn_blocking(move || {
        let mut file = tempfile::Builder::new()
            .prefix("camcorder-probe-")
            .suffix(&format!(".{}", blob.format().extension()))
            .tempfile()?;
        file.write_all(blob.bytes())?;
        file.flush()?;
        Ok::<_, std::io::Error>(file)
    })
    .await
    .map_err(|e| ProbeError::Io(e.to_string()))?
    .map_err(|e| ProbeError::Io(e.to_string()))
}

/// Duration from the container header. `None` when the header does not carry one.
fn parse_format_duration(json: &str) -> Result<Option<f64>, ProbeError> {
    let output: ProbeOutput =
        serde_json::from_str(json).map_err(|e| ProbeError::Decode(e.to_string()))?;
    let duration = output
        .format
        .and_then(|format| format.duration)
        .filter(|value| value != "N/A")
        .and_then(|value| value.trim().parse::<f64>().ok());
    Ok(duration)
}

/// End of the last packet, or zero for a stream without packets
fn duration_from_packets(csv: &str) -> f64 {
    csv.lines()
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let pts = fields.next()?.parse::<f64>().ok()?;
            let length = fields
                .next()
                .and_then(|value| value.parse::<f64>().ok())
                .unwrap_or(0.0);
            Some(pts + length)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_duration() {
        let json = r#"{"format": {"duration": "3.520000"}}"#;
        assert_eq!(parse_format_duration(json).unwrap(), Some(3.52));
    }

    #[test]
    fn missing_header_duration_is_none() {
        assert_eq!(parse_format_duration(r#"{"format": {"duration": "N/A"}}"#).unwrap(), None);
        assert_eq!(parse_format_duration(r#"{"format": {}}"#).unwrap(), None);
        assert_eq!(parse_format_duration("{}").unwrap(), None);
    }

    #[test]
    fn malformed_output_is_decode_error() {
        assert!(matches!(parse_format_duration("not json"), Err(ProbeError::Decode(_))));
    }

    #[test]
    fn packet_scan_uses_last_packet_end() {
        let csv = "0.000000,0.033000\n0.033000,0.033000\n1.967000,0.033000\nN/A,N/A\n";
        let duration = duration_from_packets(csv);
        assert!((duration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn no_packets_means_zero_length() {
        assert_eq!(duration_from_packets(""), 0.0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn scratch_copy_is_written_off_the_runtime_and_removed_on_drop() {
        use crate::domain::artifact::ContainerFormat;

        let blob = Blob::new(vec![0x1a, 0x45, 0xdf, 0xa3], ContainerFormat::Webm);
        let file = spool_to_temp(blob).await.unwrap();
        let path = file.path().to_path_buf();

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("webm"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x1a, 0x45, 0xdf, 0xa3]);
        drop(file);
        assert!(!path.exists());
    }
}
