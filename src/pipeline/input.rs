//! Input resolution: normalise a user-supplied path, directory, or URL into
//! a concrete list of documents.
//!
//! ## Why download to a temp file?
//!
//! The text-extraction stage wants file-system paths. Downloading a URL to a
//! `TempDir` gives it one while ensuring cleanup happens automatically when
//! `ResolvedInput` is dropped, even if the process panics. PDF magic bytes
//! (`%PDF`) are validated up front so callers get a meaningful error rather
//! than a parser failure deep in the run.

use crate::error::FundsheetError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Input file types the pipeline accepts.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "md", "txt"];

/// The resolved input: one or more local document paths.
pub enum ResolvedInput {
    /// Input was a single local file.
    File(PathBuf),
    /// Input was a directory; documents listed in sorted order.
    Directory(Vec<PathBuf>),
    /// Input was a URL, downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until the run completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Every document in the run, in processing order.
    pub fn documents(&self) -> Vec<&Path> {
        match self {
            ResolvedInput::File(p) => vec![p],
            ResolvedInput::Directory(paths) => paths.iter().map(PathBuf::as_path).collect(),
            ResolvedInput::Downloaded { path, .. } => vec![path],
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to local document paths.
///
/// A URL is downloaded to a temp directory; a directory is scanned
/// (non-recursively) for documents; a file is validated directly.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, FundsheetError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, FundsheetError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(FundsheetError::InputNotFound { path });
    }

    if path.is_dir() {
        let documents = scan_directory(&path)?;
        if documents.is_empty() {
            return Err(FundsheetError::NoDocumentsFound { path });
        }
        info!(count = documents.len(), dir = %path.display(), "resolved input directory");
        return Ok(ResolvedInput::Directory(documents));
    }

    validate_document(&path)?;
    debug!("resolved local document: {}", path.display());
    Ok(ResolvedInput::File(path))
}

/// List the supported documents directly inside `dir`, sorted by name so two
/// runs over the same directory process in the same order.
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, FundsheetError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => FundsheetError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => FundsheetError::InputNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut documents: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_document_extension(p))
        .collect();
    documents.sort();
    Ok(documents)
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Open the file to check permissions; for PDFs also check the magic bytes.
fn validate_document(path: &Path) -> Result<(), FundsheetError> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    match std::fs::File::open(path) {
        Ok(mut f) => {
            if is_pdf {
                use std::io::Read;
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                    return Err(FundsheetError::NotAPdf {
                        path: path.to_path_buf(),
                        magic,
                    });
                }
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(FundsheetError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(FundsheetError::InputNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, FundsheetError> {
    info!("downloading report from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FundsheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FundsheetError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FundsheetError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(FundsheetError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| FundsheetError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FundsheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| FundsheetError::Internal(format!("Failed to write temp file: {}", e)))?;

    if filename.to_ascii_lowercase().ends_with(".pdf") && bytes.len() >= 4 && &bytes[..4] != b"%PDF"
    {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(FundsheetError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    info!("downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/report.pdf"));
        assert!(is_url("http://example.com/report.pdf"));
        assert!(!is_url("/tmp/report.pdf"));
        assert!(!is_url("report.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_document_extensions() {
        assert!(has_document_extension(Path::new("q2.pdf")));
        assert!(has_document_extension(Path::new("q2.PDF")));
        assert!(has_document_extension(Path::new("q2.md")));
        assert!(has_document_extension(Path::new("notes.txt")));
        assert!(!has_document_extension(Path::new("data.xlsx")));
        assert!(!has_document_extension(Path::new("noext")));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(
            extract_filename("https://example.com/reports/q2-2025.pdf"),
            "q2-2025.pdf"
        );
        assert_eq!(extract_filename("https://example.com/"), "downloaded.pdf");
    }

    #[test]
    fn test_directory_scan_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.pdf", "c.txt", "skip.xlsx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let docs = scan_directory(dir.path()).unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.pdf", "b.md", "c.txt"]);
    }

    #[tokio::test]
    async fn test_missing_input_errors() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await;
        assert!(matches!(err, Err(FundsheetError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_empty_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path().to_str().unwrap(), 5).await;
        assert!(matches!(err, Err(FundsheetError::NoDocumentsFound { .. })));
    }
}
