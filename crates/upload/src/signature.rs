use serde::Deserialize;

use crate::UploadError;

/// Token in the key template replaced with the uploaded file's base name.
const FILENAME_TOKEN: &str = "${filename}";

/// Server-issued, time-limited authorization for a direct upload to the
/// storage endpoint.
///
/// Consumed verbatim from the control plane's signature document; the fixed
/// fields are echoed unchanged on every storage request, chunked or not.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSignature {
    /// Endpoint that receives the multipart POST.
    #[serde(rename = "upload_hostname")]
    pub upload_host: String,
    pub access_key_id: String,
    pub signature: String,
    pub acl: String,
    pub bucket: String,
    pub policy: String,
    pub success_action_status: String,
    /// Object key template, may contain a single `${filename}` token.
    pub key: String,
    /// Present iff the upload is chunked.
    #[serde(default)]
    pub parts: Option<u64>,
    /// Required when `parts` is present.
    #[serde(default)]
    pub part_size_in_bytes: Option<u64>,
}

impl UploadSignature {
    /// Returns `true` if the signature mandates a chunked upload.
    pub fn is_chunked(&self) -> bool {
        self.parts.is_some()
    }

    /// Returns `(parts, part_size_in_bytes)` for a chunked signature, `None`
    /// for a single-request one.
    ///
    /// Enforces the coupling invariant: a signature that carries `parts`
    /// without a positive `part_size_in_bytes` is a configuration error,
    /// raised here before any network call.
    pub fn chunking(&self) -> Result<Option<(u64, u64)>, UploadError> {
        match (self.parts, self.part_size_in_bytes) {
            (None, _) => Ok(None),
            (Some(parts), Some(size)) if size > 0 => Ok(Some((parts, size))),
            (Some(_), _) => Err(UploadError::Configuration(
                "signature has 'parts' but no positive 'part_size_in_bytes'".into(),
            )),
        }
    }

    /// Checks the signature's chunking fields for consistency.
    pub fn validate(&self) -> Result<(), UploadError> {
        self.chunking().map(|_| ())
    }

    /// Resolves the object key by substituting the filename token.
    ///
    /// A literal single replace: if the token appears more than once, only
    /// the first occurrence is substituted.
    pub fn object_key(&self, file_name: &str) -> String {
        self.key.replacen(FILENAME_TOKEN, file_name, 1)
    }
}
