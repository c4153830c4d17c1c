//! Self-update of the yt-dlp binary via its own `-U` flag.

use crate::deps::BinPaths;
use crate::process::{LineSink, StreamedCommand};

pub fn build_update_command(paths: &BinPaths) -> Vec<String> {
    vec![paths.yt_dlp.to_string_lossy().into_owned(), "-U".to_string()]
}

/// Runs `yt-dlp -U`, relaying output to `sink`. No line filtering here:
/// the "Unknown" suppression is download-specific and updates forward
/// everything the tool prints.
pub async fn run_update(paths: &BinPaths, sink: &mut dyn LineSink) -> Option<i32> {
    StreamedCommand {
        argv: build_update_command(paths),
        suppress: None,
        success_line: "Update finished.",
    }
    .run(sink)
    .await
}
