use std::io::SeekFrom;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use crate::plan::{self, UploadPlan};
use crate::progress::{ProgressCallback, ProgressEvent, ProgressReporter};
use crate::signature::UploadSignature;
use crate::validation::check_storage_response;
use crate::{SDK_VERSION, UPLOADER, UploadError};

/// Executes an [`UploadPlan`] against the storage endpoint, one unit at a
/// time.
///
/// Units are sent strictly sequentially: unit `i + 1` is not started until
/// unit `i`'s response has been validated. This bounds memory to one
/// in-flight chunk buffer and guarantees gap-free, ascending progress
/// events. The first storage or transport failure aborts the remaining plan;
/// already-accepted units are not rolled back.
pub struct ChunkUploader {
    client: reqwest::Client,
    reporter: ProgressReporter,
}

impl ChunkUploader {
    /// Creates an uploader over an existing HTTP client.
    ///
    /// Connection pooling, TLS, and the per-request timeout are properties
    /// of `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            reporter: ProgressReporter::new(),
        }
    }

    /// Registers a callback for unit completion events.
    pub fn on_progress(&self, callback: ProgressCallback) {
        self.reporter.subscribe(callback);
    }

    /// Plans and executes an upload of `path` under `signature`.
    pub async fn upload(
        &self,
        path: &Path,
        signature: &UploadSignature,
    ) -> Result<(), UploadError> {
        let plan = plan::plan(path, signature)?;
        self.execute(&plan, signature).await
    }

    /// Executes `plan`, POSTing each unit to `signature.upload_host`.
    pub async fn execute(
        &self,
        plan: &UploadPlan,
        signature: &UploadSignature,
    ) -> Result<(), UploadError> {
        let mut file = tokio::fs::File::open(&plan.file_path).await?;

        for unit in &plan.units {
            file.seek(SeekFrom::Start(unit.offset)).await?;
            let mut payload = vec![0u8; unit.length as usize];
            file.read_exact(&mut payload).await?;

            debug!(
                key = %unit.object_key,
                index = unit.index,
                bytes = unit.length,
                "sending upload unit"
            );

            let form = build_form(signature, &unit.object_key, &plan.file_name, payload)?;
            let response = self
                .client
                .post(&signature.upload_host)
                .multipart(form)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            check_storage_response(status, body)?;

            self.reporter.emit(ProgressEvent {
                total_parts: plan.total_parts,
                completed_index: unit.index,
            });
        }

        info!(
            file = %plan.file_path.display(),
            units = plan.units.len(),
            "upload complete"
        );
        Ok(())
    }
}

/// Builds the multipart body for one unit: the fixed signature fields with
/// `key` overridden to the unit's object key, then the binary `file` part.
///
/// The field set is rebuilt from scratch for every unit; no map is shared or
/// mutated across units.
fn build_form(
    signature: &UploadSignature,
    object_key: &str,
    file_name: &str,
    payload: Vec<u8>,
) -> Result<Form, UploadError> {
    let mut form = Form::new();
    for (name, value) in base_fields(signature) {
        form = form.text(name, value);
    }

    // The filename is the source file's base name regardless of chunk index.
    let file_part = Part::bytes(payload)
        .file_name(file_name.to_string())
        .mime_str("application/octet-stream")?;

    Ok(form
        .text("key", object_key.to_string())
        .part("file", file_part))
}

/// Fixed form fields echoed on every request, without `key`.
fn base_fields(signature: &UploadSignature) -> Vec<(&'static str, String)> {
    vec![
        ("x-amz-meta-uploader", format!("{UPLOADER} {SDK_VERSION}")),
        ("AWSAccessKeyId", signature.access_key_id.clone()),
        ("Signature", signature.signature.clone()),
        ("acl", signature.acl.clone()),
        ("bucket", signature.bucket.clone()),
        ("policy", signature.policy.clone()),
        (
            "success_action_status",
            signature.success_action_status.clone(),
        ),
    ]
}
