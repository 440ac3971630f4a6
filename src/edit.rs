use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental patch primitive: byte-span replacement with verification.
///
/// Every patcher in this crate (manifest, gradle, source hook) compiles its work
/// down to spans over a single in-memory document. Intelligence lives in span
/// acquisition, not application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied to a document"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => {
                let actual_hash = xxh3_64(text.as_bytes());
                actual_hash == *expected_hash
            }
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }

    /// Get hash value regardless of variant.
    pub fn hash(&self) -> u64 {
        match self {
            EditVerification::Hash(h) => *h,
            EditVerification::ExactMatch(text) => xxh3_64(text.as_bytes()),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in document of length {doc_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        doc_len: usize,
    },

    #[error("Byte offset {offset} is not a character boundary")]
    NotCharBoundary { offset: usize },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of applying one edit to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for applied/already-applied"]
pub enum EditResult {
    /// Edit changed the document
    Applied { bytes_changed: usize },
    /// Edit was already applied (current text matches new_text)
    AlreadyApplied,
}

impl EditResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditResult::Applied { .. })
    }
}

/// What a patcher decided to do with a document.
///
/// Planners never touch the file system; they inspect text and either produce
/// spans or explain why there is nothing to do. `AlreadyApplied` means the
/// desired state is already present; `NoOp` means the anchor or fragment the
/// operation needs is absent, which is never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchPlan {
    Edits(Vec<Edit>),
    AlreadyApplied(String),
    NoOp(String),
}

impl PatchPlan {
    pub fn is_noop(&self) -> bool {
        !matches!(self, PatchPlan::Edits(_))
    }
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        let expected = expected_before.into();
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(&expected),
        }
    }

    /// Create an edit with explicit verification strategy.
    pub fn with_verification(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        verification: EditVerification,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: verification,
        }
    }

    /// Zero-width edit: insert text at an offset without replacing anything.
    pub fn insert_at(offset: usize, new_text: impl Into<String>) -> Self {
        Edit::new(offset, offset, new_text, "")
    }

    /// Validate the edit against the current document text.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        // Validate byte range
        if self.byte_start > self.byte_end {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                doc_len: content.len(),
            });
        }

        if self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                doc_len: content.len(),
            });
        }

        for offset in [self.byte_start, self.byte_end] {
            if !content.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }

        let current_text = &content[self.byte_start..self.byte_end];

        // Check if already applied (idempotency)
        if current_text == self.new_text {
            return Ok(current_text);
        }

        // Verify expected before-text
        if !self.expected_before.matches(current_text) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current_text.to_string(),
            });
        }

        Ok(current_text)
    }
}

/// Apply a batch of edits to one document, purely.
///
/// Edits are sorted by byte_start descending and applied bottom-to-top to
/// avoid offset invalidation. Overlapping spans are refused. Returns the
/// rewritten document plus one result per edit (in application order).
pub fn apply_all(document: &str, mut edits: Vec<Edit>) -> Result<(String, Vec<EditResult>), EditError> {
    if edits.is_empty() {
        return Ok((document.to_string(), Vec::new()));
    }

    // Validate all edits against the original text first: either the whole
    // batch is applicable or nothing is touched.
    for edit in &edits {
        edit.validate(document)?;
    }

    edits.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

    // Check for overlapping spans (sorted descending by byte_start).
    // For non-overlapping regions: earlier edit's end <= later edit's start.
    for window in edits.windows(2) {
        let (later, earlier) = (&window[0], &window[1]);
        if earlier.byte_end > later.byte_start {
            return Err(EditError::InvalidByteRange {
                byte_start: later.byte_start,
                byte_end: earlier.byte_end,
                doc_len: document.len(),
            });
        }
    }

    // Apply edits bottom-to-top (already sorted descending)
    let mut new_content = document.to_string();
    let mut results = Vec::with_capacity(edits.len());

    for edit in &edits {
        let current_text = &new_content[edit.byte_start..edit.byte_end];

        // Check idempotency
        if current_text == edit.new_text {
            results.push(EditResult::AlreadyApplied);
            continue;
        }

        new_content.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);

        results.push(EditResult::Applied {
            bytes_changed: edit.new_text.len(),
        });
    }

    Ok((new_content, results))
}

/// Atomic whole-file replace: tempfile + fsync + rename, then an mtime bump
/// so file watchers and incremental build systems notice the change.
pub fn write_document(path: &Path, content: &str) -> Result<(), EditError> {
    atomic_write(path, content.as_bytes())?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;

    Ok(())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// This ensures crash safety - either the full write succeeds or nothing changes.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;

    // Write content
    temp.write_all(content)?;

    // Flush to disk (fsync)
    temp.as_file().sync_all()?;

    // Atomic rename
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
