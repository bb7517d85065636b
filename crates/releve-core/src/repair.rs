use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempDir;

use crate::error::ScrapeError;

/// A cleaned copy of a source PDF, truncated after its first `%%EOF`
/// marker. The backing temp directory is removed when this value drops, so
/// the copy lives exactly as long as the statement being processed from it.
pub struct RepairedPdf {
    _dir: TempDir,
    path: PathBuf,
}

impl RepairedPdf {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Some issuers append garbage bytes after the PDF end-of-file marker,
/// which the table extraction backend refuses to read. Copy the input up to
/// and including the first `%%EOF` into a scoped temp file.
pub fn truncate_after_eof(src: &Path) -> Result<RepairedPdf, ScrapeError> {
    const EOF_MARKER: &[u8] = b"%%EOF";

    let bytes = fs::read(src)?;
    let cut = find_subsequence(&bytes, EOF_MARKER)
        .map(|idx| idx + EOF_MARKER.len())
        .unwrap_or(bytes.len());

    let dir = TempDir::new()?;
    let path = dir.path().join("statement.pdf");
    fs::write(&path, &bytes[..cut])?;
    debug!(
        "repaired {}: kept {} of {} bytes",
        src.display(),
        cut,
        bytes.len()
    );

    Ok(RepairedPdf { _dir: dir, path })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_trailing_garbage_dropped() {
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"%PDF-1.4 content %%EOF\x00\x00garbage").unwrap();

        let repaired = truncate_after_eof(src.path()).unwrap();
        let bytes = fs::read(repaired.path()).unwrap();
        assert_eq!(bytes, b"%PDF-1.4 content %%EOF");
    }

    #[test]
    fn test_clean_file_copied_verbatim() {
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"%PDF-1.4 content %%EOF").unwrap();

        let repaired = truncate_after_eof(src.path()).unwrap();
        let bytes = fs::read(repaired.path()).unwrap();
        assert_eq!(bytes, b"%PDF-1.4 content %%EOF");
    }

    #[test]
    fn test_no_marker_keeps_everything() {
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"not a pdf at all").unwrap();

        let repaired = truncate_after_eof(src.path()).unwrap();
        let bytes = fs::read(repaired.path()).unwrap();
        assert_eq!(bytes, b"not a pdf at all");
    }

    #[test]
    fn test_copy_removed_on_drop() {
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"%PDF %%EOF").unwrap();

        let kept_path;
        {
            let repaired = truncate_after_eof(src.path()).unwrap();
            kept_path = repaired.path().to_path_buf();
            assert!(kept_path.exists());
        }
        assert!(!kept_path.exists());
    }
}
