//! Change-feed records and the artifacts derived from them
//!
//! A [`ChangeRecord`] comes straight from the provider's change feed and may
//! carry stale metadata. Filtering decisions beyond removal are taken on a
//! [`FileSnapshot`] fetched fresh by ID at processing time.

use serde::{Deserialize, Serialize};

use super::newtypes::FileId;

/// MIME prefix shared by all Drive-native document types
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps";

/// Drive-native folder type
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Drive-native shortcut type
pub const SHORTCUT_MIME: &str = "application/vnd.google-apps.shortcut";

/// File metadata embedded in a change record (possibly stale)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

/// One entry from the provider's change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// ID of the changed file, if the entry refers to one
    pub file_id: Option<FileId>,
    /// Whether the file was removed (or access to it was lost)
    pub removed: bool,
    /// Metadata as reported by the feed
    pub file: Option<EmbeddedFile>,
}

impl ChangeRecord {
    /// Creates a record for a changed (not removed) file
    pub fn changed(file_id: FileId) -> Self {
        Self {
            file_id: Some(file_id),
            removed: false,
            file: None,
        }
    }

    /// Creates a record for a removed file
    pub fn removed(file_id: FileId) -> Self {
        Self {
            file_id: Some(file_id),
            removed: true,
            file: None,
        }
    }
}

/// Point-in-time read of a file's metadata, fetched during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub id: FileId,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub trashed: bool,
    /// IDs of the folders containing the file
    pub parents: Vec<String>,
}

impl FileSnapshot {
    /// Returns true if `folder_id` is one of the file's parents
    pub fn is_in_folder(&self, folder_id: &str) -> bool {
        self.parents.iter().any(|p| p == folder_id)
    }

    /// Returns true for Drive item types that have no content to export
    pub fn is_container(&self) -> bool {
        matches!(
            self.mime_type.as_deref(),
            Some(FOLDER_MIME) | Some(SHORTCUT_MIME)
        )
    }
}

/// Filename and bytes ready for upload; never persisted locally
#[derive(Clone, PartialEq, Eq)]
pub struct UploadArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadArtifact")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ============================================================================
// Export format mapping
// ============================================================================

/// Portable format a Drive-native document is exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Office Open XML word-processing document
    Docx,
    /// Office Open XML spreadsheet
    Xlsx,
    /// Portable Document Format
    Pdf,
}

impl ExportFormat {
    /// Chooses the export format for a content type
    ///
    /// Returns `None` for non-native types, which are downloaded verbatim.
    pub fn for_mime_type(mime_type: &str) -> Option<Self> {
        if !mime_type.starts_with(NATIVE_MIME_PREFIX) {
            return None;
        }
        if mime_type.ends_with("document") {
            Some(Self::Docx)
        } else if mime_type.ends_with("spreadsheets") || mime_type.ends_with("spreadsheet") {
            Some(Self::Xlsx)
        } else {
            Some(Self::Pdf)
        }
    }

    /// MIME type requested from the export endpoint
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    /// Builds the upload filename from a name hint, falling back to the file ID
    pub fn filename(self, name_hint: Option<&str>, file_id: &FileId) -> String {
        let stem = name_hint
            .filter(|n| !n.is_empty())
            .unwrap_or(file_id.as_str());
        format!("{}.{}", stem, self.extension())
    }
}
