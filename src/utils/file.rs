//! File utilities for reading images and writing extracted text.

use std::fs;
use std::path::{Path, PathBuf};

/// Check whether `path` has the given extension, ignoring ASCII case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// Map an image under `input_root` to its text file under `output_root`.
///
/// The directory layout relative to `input_root` is preserved and only the
/// final extension is replaced, so `a.b.png` becomes `a.b.txt`.
pub fn output_path_for(
    input_root: &Path,
    output_root: &Path,
    image: &Path,
    output_extension: &str,
) -> PathBuf {
    let relative = image
        .strip_prefix(input_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| image.file_name().map(PathBuf::from).unwrap_or_default());

    output_root
        .join(relative)
        .with_extension(output_extension.trim_start_matches('.'))
}

/// Read image bytes with a size limit.
pub fn read_image(path: &Path, max_size: u64) -> std::io::Result<Vec<u8>> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read(path)
}

/// Guess the MIME type from the extension, defaulting to PNG.
pub fn detect_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or("image/png")
        .to_string()
}

/// Write UTF-8 text, creating parent directories as needed.
pub fn write_text(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)
}

/// Get the relative path from a base directory.
pub fn get_relative_path(base: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(base)
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension(Path::new("q01.png"), "png"));
        assert!(has_extension(Path::new("q01.PNG"), "png"));
        assert!(has_extension(Path::new("q01.Png"), ".png"));
        assert!(!has_extension(Path::new("q01.jpg"), "png"));
        assert!(!has_extension(Path::new("png"), "png"));
    }

    #[test]
    fn test_output_path_replaces_only_final_extension() {
        let out = output_path_for(
            Path::new("in"),
            Path::new("out"),
            Path::new("in/page.png.backup.PNG"),
            "txt",
        );
        assert_eq!(out, PathBuf::from("out/page.png.backup.txt"));
    }

    #[test]
    fn test_output_path_keeps_subdirectories() {
        let out = output_path_for(
            Path::new("in"),
            Path::new("out"),
            Path::new("in/day1/q03.png"),
            ".md",
        );
        assert_eq!(out, PathBuf::from("out/day1/q03.md"));
    }

    #[test]
    fn test_read_image_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        fs::write(&path, vec![0u8; 64]).unwrap();

        assert_eq!(read_image(&path, 64).unwrap().len(), 64);
        let err = read_image(&path, 63).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(Path::new("a.png")), "image/png");
        assert_eq!(detect_mime_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(detect_mime_type(Path::new("a.unknownext")), "image/png");
    }

    #[test]
    fn test_write_text_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("q.txt");
        write_text(&path, "olá").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "olá");
    }

    #[test]
    fn test_get_relative_path() {
        assert_eq!(
            get_relative_path(Path::new("/data"), Path::new("/data/x/q.png")),
            Some("x/q.png".to_string())
        );
        assert_eq!(get_relative_path(Path::new("/other"), Path::new("/data/q.png")), None);
    }
}
