//! URL validation and construction of the yt-dlp download invocation.

use std::path::PathBuf;

use crate::deps::BinPaths;
use crate::process::{LineSink, StreamedCommand};

/// Everything needed for one download; built per invocation and discarded
/// once the child process ends.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub link: String,
    pub audio_only: bool,
    pub save_dir: PathBuf,
}

/// Loose check that the input looks like an http(s) link.
///
/// This is deliberately not a URL parser: it accepts plenty of malformed
/// strings and rejects valid non-http schemes, and callers rely on that
/// permissiveness. The `www.` branch is redundant with the scheme check
/// above it and is kept verbatim from the established behavior.
pub fn verify_link(link: &str) -> bool {
    if link.starts_with("https://") || link.starts_with("http://") {
        return true;
    }
    if (link.starts_with("https://www.") || link.starts_with("http://www.")) && link.len() > 15 {
        return true;
    }
    false
}

/// Builds the full argument vector, program first. Pure function of the
/// request and the resolved binary paths; arguments stay a literal list and
/// are never joined into a shell string.
pub fn build_download_command(paths: &BinPaths, request: &DownloadRequest) -> Vec<String> {
    // yt-dlp expands %(title)s / %(ext)s itself; we only join the directory.
    let output_template = request.save_dir.join("%(title)s.%(ext)s");

    let mut cmd = vec![
        paths.yt_dlp.to_string_lossy().into_owned(),
        "--ffmpeg-location".to_string(),
        paths.ffmpeg.to_string_lossy().into_owned(),
        "--progress".to_string(),
        "--newline".to_string(),
    ];

    if request.audio_only {
        cmd.extend(["-x", "--audio-format", "mp3"].map(String::from));
    } else {
        cmd.extend(["-f", "bestvideo+bestaudio", "--merge-output-format", "mp4"].map(String::from));
    }

    cmd.push("-o".to_string());
    cmd.push(output_template.to_string_lossy().into_owned());
    cmd.push(request.link.clone());
    cmd
}

/// Runs a download to completion, relaying output to `sink`. Lines
/// containing "Unknown" are suppressed; this is specific to downloads and
/// intentionally not applied to updates.
pub async fn run_download(
    paths: &BinPaths,
    request: &DownloadRequest,
    sink: &mut dyn LineSink,
) -> Option<i32> {
    StreamedCommand {
        argv: build_download_command(paths, request),
        suppress: Some("Unknown"),
        success_line: "Download successful!",
    }
    .run(sink)
    .await
}
