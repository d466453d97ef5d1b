//! The extraction pipeline: decode one EML file, write its attachments into
//! the output tree, and drive whole batches with per-file error recovery.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::extract::sanitize::{extension_label, sanitize_component, unique_path};
use crate::parser::{eml, header};

/// One unit of extraction work: a single EML file plus output options.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Path of the EML file to read.
    pub source: PathBuf,
    /// Root directory the output tree is built under.
    pub output_root: PathBuf,
    /// Create a per-message subfolder named after the decoded subject.
    pub subject_subfolder: bool,
    /// Group written files into per-extension subfolders.
    pub classify_by_extension: bool,
}

/// Outcome of extracting one EML file.
///
/// On error `written` is empty; files already written before a mid-message
/// failure stay on disk but are not reported.
#[derive(Debug)]
pub struct ExtractionResult {
    /// Paths written, in attachment traversal order.
    pub written: Vec<PathBuf>,
    /// Total payload bytes written.
    pub bytes_written: u64,
    /// The failure that stopped this file, if any.
    pub error: Option<ExtractError>,
}

impl ExtractionResult {
    /// True when the file was processed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(error: ExtractError) -> Self {
        Self {
            written: Vec::new(),
            bytes_written: 0,
            error: Some(error),
        }
    }
}

/// Aggregate counters over one batch run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchSummary {
    /// Inputs attempted (every input counts exactly once).
    pub processed: usize,
    /// Inputs that completed without error.
    pub succeeded: usize,
    /// Inputs that ended in an error result.
    pub failed: usize,
    /// Attachments written across all succeeded inputs.
    pub attachments: usize,
    /// Payload bytes written across all succeeded inputs.
    pub bytes_written: u64,
}

/// Everything a batch run produced: per-file results plus totals.
#[derive(Debug)]
pub struct BatchReport {
    /// One entry per input, in input order.
    pub results: Vec<ExtractionResult>,
    /// Aggregate counters.
    pub summary: BatchSummary,
}

/// Metadata describing one attachment, for listing without extraction.
#[derive(Debug, Serialize)]
pub struct AttachmentInfo {
    /// Decoded display filename (may be empty when the part has none).
    pub filename: String,
    /// Declared MIME type, `application/octet-stream` when absent.
    pub content_type: String,
    /// Decoded payload size in bytes.
    pub size: u64,
}

/// Extract the attachments of a single EML file.
///
/// Never panics and never returns early control flow to the caller; all
/// failures are folded into the returned [`ExtractionResult`].
pub fn extract_one(request: &ExtractionRequest) -> ExtractionResult {
    match run_extraction(request) {
        Ok((written, bytes_written)) => ExtractionResult {
            written,
            bytes_written,
            error: None,
        },
        Err(e) => ExtractionResult::failed(e),
    }
}

fn run_extraction(request: &ExtractionRequest) -> Result<(Vec<PathBuf>, u64)> {
    let message = eml::load_eml(&request.source)?;

    let base_dir = if request.subject_subfolder {
        let subject = header::decode_header_text(message.raw_subject.as_deref());
        let folder = if subject.trim().is_empty() {
            source_stem(&request.source)
        } else {
            subject
        };
        request.output_root.join(sanitize_component(&folder))
    } else {
        request.output_root.clone()
    };

    // Idempotent: re-running into an existing tree is fine.
    std::fs::create_dir_all(&base_dir).map_err(|e| ExtractError::io(&base_dir, e))?;

    let mut written = Vec::new();
    let mut bytes_written = 0u64;

    for part in message.attachment_parts() {
        let Some(payload) = part.payload.as_deref().filter(|p| !p.is_empty()) else {
            continue;
        };

        let name = header::decode_header_text(part.filename.as_deref());
        if name.trim().is_empty() {
            warn!(
                source = %request.source.display(),
                "Skipping attachment without a usable filename"
            );
            continue;
        }

        let filename = sanitize_component(&name);
        let target_dir = if request.classify_by_extension {
            base_dir.join(extension_label(&filename))
        } else {
            base_dir.clone()
        };
        std::fs::create_dir_all(&target_dir).map_err(|e| ExtractError::io(&target_dir, e))?;

        let path = unique_path(&target_dir, &filename);
        std::fs::write(&path, payload).map_err(|e| ExtractError::io(&path, e))?;

        info!(path = %path.display(), bytes = payload.len(), "Wrote attachment");
        bytes_written += payload.len() as u64;
        written.push(path);
    }

    Ok((written, bytes_written))
}

/// Run a batch of extraction requests in strict input order.
///
/// No per-file error is fatal to the batch; each failure is recorded in that
/// file's result and counted in the summary. The optional callback receives
/// `(current, total)` before each file is processed.
pub fn extract_batch(
    requests: &[ExtractionRequest],
    progress: Option<&dyn Fn(usize, usize)>,
) -> BatchReport {
    let total = requests.len();
    let mut results = Vec::with_capacity(total);
    let mut summary = BatchSummary::default();

    for (idx, request) in requests.iter().enumerate() {
        if let Some(cb) = progress {
            cb(idx + 1, total);
        }

        let result = extract_one(request);
        summary.processed += 1;
        match &result.error {
            None => {
                summary.succeeded += 1;
                summary.attachments += result.written.len();
                summary.bytes_written += result.bytes_written;
            }
            Some(e) => {
                summary.failed += 1;
                warn!(source = %request.source.display(), error = %e, "Extraction failed");
            }
        }
        results.push(result);
    }

    BatchReport { results, summary }
}

/// List attachment metadata for one EML file without writing anything.
pub fn list_attachments(source: &Path) -> Result<Vec<AttachmentInfo>> {
    let message = eml::load_eml(source)?;

    Ok(message
        .attachment_parts()
        .into_iter()
        .map(|part| AttachmentInfo {
            filename: header::decode_header_text(part.filename.as_deref()),
            content_type: part
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: part.payload.as_deref().map_or(0, |p| p.len() as u64),
        })
        .collect())
}

/// Expand input paths into a flat list of EML files.
///
/// Files pass through as-is; directories are walked recursively collecting
/// `*.eml` entries (case-insensitive), sorted per directory for a stable
/// batch order.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            scan_dir(path, &mut found)?;
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn scan_dir(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| ExtractError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ExtractError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, found)?;
        } else if is_eml(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("eml"))
}

/// Default output root: a fixed-name folder next to the first input path.
pub fn default_output_root(first_input: &Path, folder_name: &str) -> PathBuf {
    first_input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.join(folder_name))
        .unwrap_or_else(|| PathBuf::from(folder_name))
}

fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_eml(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn simple_message_with_attachment(subject: &str, filename: &str) -> String {
        format!(
            concat!(
                "From: a@example.com\r\n",
                "Subject: {subject}\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
                "\r\n",
                "--XYZ\r\n",
                "Content-Type: text/plain\r\n",
                "\r\n",
                "See attached.\r\n",
                "--XYZ\r\n",
                "Content-Type: application/octet-stream\r\n",
                "Content-Disposition: attachment; filename=\"{filename}\"\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "aGVsbG8=\r\n",
                "--XYZ--\r\n",
            ),
            subject = subject,
            filename = filename,
        )
    }

    #[test]
    fn test_extract_zero_attachments_creates_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_eml(
            dir.path(),
            "plain.eml",
            "From: a@b.com\r\nSubject: Just text\r\n\r\nNo attachments here.\r\n",
        );

        let request = ExtractionRequest {
            source,
            output_root: dir.path().join("out"),
            subject_subfolder: true,
            classify_by_extension: false,
        };
        let result = extract_one(&request);

        assert!(result.is_ok());
        assert!(result.written.is_empty());
        assert_eq!(result.bytes_written, 0);
        assert!(dir.path().join("out").join("Just text").is_dir());
    }

    #[test]
    fn test_extract_writes_payload_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_eml(
            dir.path(),
            "one.eml",
            &simple_message_with_attachment("Q4 Report", "report.pdf"),
        );

        let request = ExtractionRequest {
            source,
            output_root: dir.path().join("out"),
            subject_subfolder: true,
            classify_by_extension: false,
        };
        let result = extract_one(&request);

        assert!(result.is_ok());
        let expected = dir.path().join("out").join("Q4 Report").join("report.pdf");
        assert_eq!(result.written, vec![expected.clone()]);
        assert_eq!(std::fs::read(expected).unwrap(), b"hello");
        assert_eq!(result.bytes_written, 5);
    }

    #[test]
    fn test_extract_classifies_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_eml(
            dir.path(),
            "one.eml",
            &simple_message_with_attachment("Mixed", "photo.JPG"),
        );

        let request = ExtractionRequest {
            source,
            output_root: dir.path().join("out"),
            subject_subfolder: false,
            classify_by_extension: true,
        };
        let result = extract_one(&request);

        assert!(result.is_ok());
        assert_eq!(
            result.written,
            vec![dir.path().join("out").join("jpg").join("photo.JPG")]
        );
    }

    #[test]
    fn test_extract_missing_file_is_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let request = ExtractionRequest {
            source: dir.path().join("absent.eml"),
            output_root: dir.path().join("out"),
            subject_subfolder: false,
            classify_by_extension: false,
        };
        let result = extract_one(&request);

        assert!(!result.is_ok());
        assert!(matches!(result.error, Some(ExtractError::FileNotFound(_))));
        assert!(result.written.is_empty());
    }

    #[test]
    fn test_extract_empty_subject_falls_back_to_stem() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_eml(
            dir.path(),
            "msg001.eml",
            "From: a@b.com\r\nSubject: \r\n\r\nBody\r\n",
        );

        let request = ExtractionRequest {
            source,
            output_root: dir.path().join("out"),
            subject_subfolder: true,
            classify_by_extension: false,
        };
        let result = extract_one(&request);

        assert!(result.is_ok());
        assert!(dir.path().join("out").join("msg001").is_dir());
    }

    #[test]
    fn test_batch_counts_every_input_once() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_eml(
            dir.path(),
            "good.eml",
            &simple_message_with_attachment("Ok", "a.txt"),
        );
        let bad = write_eml(dir.path(), "bad.eml", "complete junk with no headers\n");

        let out = dir.path().join("out");
        let requests: Vec<ExtractionRequest> = [good, bad]
            .into_iter()
            .map(|source| ExtractionRequest {
                source,
                output_root: out.clone(),
                subject_subfolder: false,
                classify_by_extension: false,
            })
            .collect();

        let report = extract_batch(&requests, None);

        assert_eq!(report.summary.processed, 2);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.attachments, 1);
        assert!(report.results[0].is_ok());
        assert!(matches!(
            report.results[1].error,
            Some(ExtractError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_batch_progress_callback_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let requests: Vec<ExtractionRequest> = (0..3)
            .map(|i| {
                let source = write_eml(
                    dir.path(),
                    &format!("m{i}.eml"),
                    "From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n",
                );
                ExtractionRequest {
                    source,
                    output_root: out.clone(),
                    subject_subfolder: false,
                    classify_by_extension: false,
                }
            })
            .collect();

        let seen = std::cell::RefCell::new(Vec::new());
        let progress = |current: usize, total: usize| {
            seen.borrow_mut().push((current, total));
        };
        let report = extract_batch(&requests, Some(&progress));

        assert_eq!(report.summary.processed, 3);
        assert_eq!(*seen.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_collision_suffix_within_one_message() {
        let dir = tempfile::tempdir().unwrap();
        let raw = concat!(
            "From: a@example.com\r\n",
            "Subject: Dup\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
            "\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Disposition: attachment; filename=\"notes.txt\"\r\n",
            "\r\n",
            "first\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Disposition: attachment; filename=\"notes.txt\"\r\n",
            "\r\n",
            "second\r\n",
            "--XYZ--\r\n",
        );
        let source = write_eml(dir.path(), "dup.eml", raw);

        let out = dir.path().join("out");
        let request = ExtractionRequest {
            source,
            output_root: out.clone(),
            subject_subfolder: false,
            classify_by_extension: false,
        };
        let result = extract_one(&request);

        assert!(result.is_ok());
        assert_eq!(
            result.written,
            vec![out.join("notes.txt"), out.join("notes_1.txt")]
        );
    }

    #[test]
    fn test_collect_inputs_recursive_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        write_eml(dir.path(), "a.eml", "x");
        write_eml(&dir.path().join("nested"), "b.EML", "x");
        write_eml(&dir.path().join("nested/deeper"), "c.eml", "x");
        write_eml(dir.path(), "ignore.txt", "x");

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| is_eml(f)));
    }

    #[test]
    fn test_default_output_root_is_sibling() {
        let root = default_output_root(
            Path::new("/data/mail/msg.eml"),
            "extracted_attachments",
        );
        assert_eq!(root, Path::new("/data/mail/extracted_attachments"));
    }
}
