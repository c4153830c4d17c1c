//! Resolution and health checks for the two required external binaries.
//!
//! Paths are resolved once at startup and passed by reference into the
//! components that spawn processes; there is no module-level singleton.

use std::path::PathBuf;

/// Platform-specific locations of the yt-dlp and ffmpeg executables.
///
/// The path table, keyed by platform family:
///
/// | platform | yt-dlp               | ffmpeg               |
/// |----------|----------------------|----------------------|
/// | Linux    | ./bins/yt-dlp_linux  | ./bins/ffmpeg-linux  |
/// | Windows  | .\bins\yt-dlp.exe    | .\bins\ffmpeg.exe    |
/// | other    | ./bins/yt-dlp        | ./bins/ffmpeg        |
///
/// The "other" row (macOS and friends) is unsupported but attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinPaths {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
}

impl BinPaths {
    pub fn resolve() -> Self {
        if cfg!(target_os = "linux") {
            Self {
                yt_dlp: PathBuf::from("./bins/yt-dlp_linux"),
                ffmpeg: PathBuf::from("./bins/ffmpeg-linux"),
            }
        } else if cfg!(target_os = "windows") {
            Self {
                yt_dlp: PathBuf::from(r".\bins\yt-dlp.exe"),
                ffmpeg: PathBuf::from(r".\bins\ffmpeg.exe"),
            }
        } else {
            Self {
                yt_dlp: PathBuf::from("./bins/yt-dlp"),
                ffmpeg: PathBuf::from("./bins/ffmpeg"),
            }
        }
    }

    /// Checks both binaries for existence and, on Linux, for the executable
    /// bit, attempting one permission repair before giving up. Returns a
    /// list of problem descriptions; empty means healthy. Never panics and
    /// never propagates an error past this boundary.
    pub fn check(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for path in [&self.yt_dlp, &self.ffmpeg] {
            if !path.exists() {
                problems.push(format!("Missing executable: {}", path.display()));
                continue;
            }

            #[cfg(target_os = "linux")]
            {
                if let Err(problem) = ensure_executable(path) {
                    problems.push(problem);
                }
            }
        }

        problems
    }
}

#[cfg(target_os = "linux")]
fn ensure_executable(path: &std::path::Path) -> Result<(), String> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn is_executable(metadata: &fs::Metadata) -> bool {
        metadata.permissions().mode() & 0o111 != 0
    }

    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return Err(format!("Permission error on {}: {e}", path.display())),
    };
    if is_executable(&metadata) {
        return Ok(());
    }

    tracing::info!(path = %path.display(), "binary not executable, attempting repair");
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    if let Err(e) = fs::set_permissions(path, permissions) {
        return Err(format!("Permission error on {}: {e}", path.display()));
    }

    // Re-check: the chmod may silently fail to take effect (e.g. noexec mounts).
    match fs::metadata(path) {
        Ok(m) if is_executable(&m) => Ok(()),
        Ok(_) => Err(format!(
            "Permission error: Could not make {} executable.",
            path.display()
        )),
        Err(e) => Err(format!("Permission error on {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_nonempty_pair() {
        let paths = BinPaths::resolve();
        assert!(!paths.yt_dlp.as_os_str().is_empty());
        assert!(!paths.ffmpeg.as_os_str().is_empty());
    }

    #[test]
    fn missing_binaries_are_both_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BinPaths {
            yt_dlp: dir.path().join("yt-dlp"),
            ffmpeg: dir.path().join("ffmpeg"),
        };

        let problems = paths.check();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("Missing executable:"));
        assert!(problems[1].starts_with("Missing executable:"));
    }

    #[cfg(target_os = "linux")]
    mod linux {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn write_with_mode(path: &std::path::Path, mode: u32) {
            fs::write(path, b"#!/bin/sh\n").unwrap();
            let mut permissions = fs::metadata(path).unwrap().permissions();
            permissions.set_mode(mode);
            fs::set_permissions(path, permissions).unwrap();
        }

        #[test]
        fn executable_binaries_pass_the_check() {
            let dir = tempfile::tempdir().unwrap();
            let paths = BinPaths {
                yt_dlp: dir.path().join("yt-dlp"),
                ffmpeg: dir.path().join("ffmpeg"),
            };
            write_with_mode(&paths.yt_dlp, 0o755);
            write_with_mode(&paths.ffmpeg, 0o755);

            assert!(paths.check().is_empty());
        }

        #[test]
        fn non_executable_binary_is_repaired() {
            let dir = tempfile::tempdir().unwrap();
            let paths = BinPaths {
                yt_dlp: dir.path().join("yt-dlp"),
                ffmpeg: dir.path().join("ffmpeg"),
            };
            write_with_mode(&paths.yt_dlp, 0o644);
            write_with_mode(&paths.ffmpeg, 0o755);

            assert!(paths.check().is_empty());

            let mode = fs::metadata(&paths.yt_dlp).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0);
        }
    }
}
