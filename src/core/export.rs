use crate::domain::model::ExportArtifact;
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Writes export artifacts to storage.
pub struct ExportEngine<S: Storage> {
    storage: S,
    output_path: String,
}

impl<S: Storage> ExportEngine<S> {
    pub fn new(storage: S, output_path: impl Into<String>) -> Self {
        Self {
            storage,
            output_path: output_path.into(),
        }
    }

    /// Save every artifact under its own file name and return the written paths.
    pub async fn save(&self, artifacts: &[ExportArtifact]) -> Result<Vec<String>> {
        let mut written = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            tracing::debug!(
                "Writing {} ({}, {} bytes)",
                artifact.filename,
                artifact.mime_type,
                artifact.bytes.len()
            );
            self.storage.write_file(&artifact.filename, &artifact.bytes).await?;
            written.push(format!("{}/{}", self.output_path, artifact.filename));
        }

        tracing::info!("Saved {} export files", written.len());
        Ok(written)
    }
}
