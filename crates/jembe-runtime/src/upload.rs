//! File upload contract.
//!
//! Uploads arrive as a multipart POST whose distinguishing header
//! carries the value [`UPLOAD_MARKER`] instead of a JSON body. The core
//! never persists anything; a [`FileStorage`] collaborator does, and
//! the response hands the client one reference per stored file plus an
//! id to correlate the follow-up partial request.

use jembe_types::JembeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Distinguishing-header value marking an upload request.
pub const UPLOAD_MARKER: &str = "upload";

/// One file as received from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadPart {
    /// Form field the file was posted under.
    pub field: String,
    /// Client-side file name.
    pub filename: String,
    /// Raw content.
    pub bytes: Vec<u8>,
}

/// Reference to a stored file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Path within the storage.
    pub path: String,
    /// Storage identifier.
    pub storage: String,
}

/// Host-provided persistence for uploaded files.
pub trait FileStorage: Send + Sync {
    /// Stores one file and returns its reference.
    ///
    /// # Errors
    ///
    /// Implementations map persistence failures onto [`JembeError`].
    fn store(&self, part: &UploadPart) -> Result<StoredFile, JembeError>;
}

/// Wire shape of the upload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Correlates the follow-up partial request with this upload.
    pub file_upload_response_id: String,
    /// Stored references grouped by form field.
    pub files: BTreeMap<String, Vec<StoredFile>>,
}

/// Stores every part and assembles the response.
///
/// # Errors
///
/// Propagates the first storage failure.
pub fn handle_upload(
    storage: &dyn FileStorage,
    parts: &[UploadPart],
) -> Result<UploadResponse, JembeError> {
    let mut files: BTreeMap<String, Vec<StoredFile>> = BTreeMap::new();
    for part in parts {
        let stored = storage.store(part)?;
        files.entry(part.field.clone()).or_default().push(stored);
    }
    Ok(UploadResponse {
        file_upload_response_id: Uuid::new_v4().to_string(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct MemoryStorage;

    impl FileStorage for MemoryStorage {
        fn store(&self, part: &UploadPart) -> Result<StoredFile, JembeError> {
            Ok(StoredFile {
                path: format!("tmp/{}", part.filename),
                storage: "memory".to_string(),
            })
        }
    }

    #[test]
    fn groups_files_by_field() {
        let parts = vec![
            UploadPart {
                field: "photos".into(),
                filename: "a.png".into(),
                bytes: vec![1],
            },
            UploadPart {
                field: "photos".into(),
                filename: "b.png".into(),
                bytes: vec![2],
            },
            UploadPart {
                field: "doc".into(),
                filename: "c.pdf".into(),
                bytes: vec![3],
            },
        ];
        let response = handle_upload(&MemoryStorage, &parts).expect("upload");
        assert_eq!(response.files["photos"].len(), 2);
        assert_eq!(response.files["doc"][0].path, "tmp/c.pdf");
        assert!(!response.file_upload_response_id.is_empty());
    }

    #[test]
    fn response_serialises_camel_case() {
        let response = handle_upload(&MemoryStorage, &[]).expect("upload");
        let json = serde_json::to_value(&response).expect("json");
        assert!(json.get("fileUploadResponseId").is_some());
        assert!(json.get("files").is_some());
    }
}
