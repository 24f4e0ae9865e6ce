use std::path::{Path, PathBuf};

use crate::UploadError;
use crate::signature::UploadSignature;

/// One physical request to the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUnit {
    /// 0-based part index.
    pub index: u64,
    /// Object key for this unit (chunked units carry a `.{index}` suffix).
    pub object_key: String,
    /// Byte offset of the unit's payload within the file.
    pub offset: u64,
    /// Payload length in bytes.
    pub length: u64,
}

/// Ordered sequence of upload units for one file.
///
/// Units must be sent in ascending index order; the storage side has no way
/// to reorder them.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub file_path: PathBuf,
    /// Base name of the source file, used as the multipart filename on every
    /// unit regardless of chunk index.
    pub file_name: String,
    /// Reported in progress events: 1 for single mode, the signature's
    /// `parts` value for chunked mode.
    pub total_parts: u64,
    pub units: Vec<UploadUnit>,
}

/// Turns a (file, signature) pair into an [`UploadPlan`].
///
/// Fails with [`UploadError::Configuration`] before any network call if the
/// file does not exist or the signature's chunking fields are inconsistent.
///
/// Chunked mode yields `ceil(file_size / part_size)` units; the signature's
/// `parts` field is informational and only surfaces in progress events.
pub fn plan(path: &Path, signature: &UploadSignature) -> Result<UploadPlan, UploadError> {
    let chunking = signature.chunking()?;

    let metadata = std::fs::metadata(path)
        .map_err(|_| UploadError::Configuration(format!("file not found: {}", path.display())))?;
    let file_size = metadata.len();

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            UploadError::Configuration(format!("invalid file name: {}", path.display()))
        })?
        .to_string();

    let base_key = signature.object_key(&file_name);

    let mut units = Vec::new();
    let total_parts = match chunking {
        None => {
            units.push(UploadUnit {
                index: 0,
                object_key: base_key,
                offset: 0,
                length: file_size,
            });
            1
        }
        Some((parts, part_size)) => {
            let mut offset = 0;
            let mut index = 0;
            while offset < file_size {
                let length = part_size.min(file_size - offset);
                units.push(UploadUnit {
                    index,
                    object_key: format!("{base_key}.{index}"),
                    offset,
                    length,
                });
                offset += length;
                index += 1;
            }
            parts
        }
    };

    Ok(UploadPlan {
        file_path: path.to_path_buf(),
        file_name,
        total_parts,
        units,
    })
}
