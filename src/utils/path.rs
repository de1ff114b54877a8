//! Path utilities: output naming and executable discovery

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{TimemarkError, TimemarkResult};
use crate::utils::time::FILE_TIMESTAMP_FORMAT;

/// Derive `{dir}/{stem}_{suffix}_{timestamp}{ext}`
///
/// An empty suffix drops its segment entirely, giving `{stem}_{timestamp}{ext}`.
pub fn derive_output_path(
    input: &Path,
    output_dir: &Path,
    suffix: &str,
    timestamp: NaiveDateTime,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = input
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| ".mp4".to_string());
    let stamp = timestamp.format(FILE_TIMESTAMP_FORMAT);

    let file_name = if suffix.is_empty() {
        format!("{}_{}{}", stem, stamp, extension)
    } else {
        format!("{}_{}_{}{}", stem, suffix, stamp, extension)
    };

    output_dir.join(file_name)
}

/// Append `_N` before the extension until `is_taken` reports a free path
pub fn disambiguate<F>(candidate: &Path, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    if !is_taken(candidate) {
        return candidate.to_path_buf();
    }

    let stem = candidate
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = candidate
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let parent = candidate.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1u32;
    loop {
        let next = parent.join(format!("{}_{}{}", stem, counter, extension));
        if !is_taken(&next) {
            return next;
        }
        counter += 1;
    }
}

/// Resolve a tool name or path to an existing executable
///
/// Explicit paths must exist. Bare names are looked up in `ffmpeg/bin` and
/// `ffmpeg` next to the running binary, then on `PATH`.
pub fn locate_executable(name_or_path: &Path) -> TimemarkResult<PathBuf> {
    let display = name_or_path.to_string_lossy().into_owned();

    if name_or_path.components().count() > 1 || name_or_path.is_absolute() {
        if name_or_path.is_file() {
            return Ok(name_or_path.to_path_buf());
        }
        return Err(TimemarkError::Resource {
            name: display,
            message: "no file at the configured path".to_string(),
        });
    }

    let file_names = executable_names(name_or_path.as_os_str());

    let bundled_dirs = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| vec![dir.join("ffmpeg").join("bin"), dir.join("ffmpeg")])
        .unwrap_or_default();

    let path_dirs = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    bundled_dirs
        .iter()
        .chain(path_dirs.iter())
        .flat_map(|dir| file_names.iter().map(move |file| dir.join(file)))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| TimemarkError::Resource {
            name: display,
            message: "not found next to the executable or on PATH".to_string(),
        })
}

fn executable_names(name: &std::ffi::OsStr) -> Vec<OsString> {
    let mut names = vec![name.to_os_string()];
    if cfg!(windows) && Path::new(name).extension().is_none() {
        let mut with_ext = name.to_os_string();
        with_ext.push(".exe");
        names.push(with_ext);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_watermark_name_has_no_suffix_segment() {
        let path = derive_output_path(Path::new("/v/clip.mp4"), Path::new("/v"), "", stamp());
        assert_eq!(path, PathBuf::from("/v/clip_20240101_000000.mp4"));
    }

    #[test]
    fn test_suffixed_names() {
        let crop = derive_output_path(Path::new("/v/clip.mkv"), Path::new("/out"), "crop", stamp());
        assert_eq!(crop, PathBuf::from("/out/clip_crop_20240101_000000.mkv"));

        let combined = derive_output_path(
            Path::new("/v/clip.mkv"),
            Path::new("/out"),
            "crop_watermark",
            stamp(),
        );
        assert_eq!(combined, PathBuf::from("/out/clip_crop_watermark_20240101_000000.mkv"));
    }

    #[test]
    fn test_missing_extension_defaults_to_mp4() {
        let path = derive_output_path(Path::new("/v/clip"), Path::new("/v"), "crop", stamp());
        assert_eq!(path, PathBuf::from("/v/clip_crop_20240101_000000.mp4"));
    }

    #[test]
    fn test_disambiguate_appends_counter() {
        let taken: HashSet<PathBuf> = [
            PathBuf::from("/v/clip_20240101_000000.mp4"),
            PathBuf::from("/v/clip_20240101_000000_1.mp4"),
        ]
        .into_iter()
        .collect();

        let free = disambiguate(Path::new("/v/clip_20240101_000000.mp4"), |p| taken.contains(p));
        assert_eq!(free, PathBuf::from("/v/clip_20240101_000000_2.mp4"));

        let untouched = disambiguate(Path::new("/v/other.mp4"), |p| taken.contains(p));
        assert_eq!(untouched, PathBuf::from("/v/other.mp4"));
    }

    #[test]
    fn test_locate_missing_explicit_path_is_resource_error() {
        let err = locate_executable(Path::new("/definitely/not/here/ffmpeg")).unwrap_err();
        assert!(matches!(err, TimemarkError::Resource { .. }));
    }

    #[test]
    fn test_locate_unknown_bare_name_is_resource_error() {
        let err = locate_executable(Path::new("timemark-no-such-tool-7f3a")).unwrap_err();
        assert!(matches!(err, TimemarkError::Resource { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_finds_sh_on_path() {
        let found = locate_executable(Path::new("sh")).unwrap();
        assert!(found.is_file());
    }
}
