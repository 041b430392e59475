use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::batch::OutputArtifact;
use crate::error::{CertError, Result};

pub fn generate_batch_id() -> String {
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d"),
        &Uuid::new_v4().simple().to_string()[..8]
    )
}

/// Download name for an archive generated at `now`.
pub fn archive_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Certificates_{}.zip", now.format("%Y%m%d_%H%M"))
}

/// Zip the artifacts (deflate) in the order given.
pub fn write_archive(artifacts: &[OutputArtifact]) -> Result<Vec<u8>> {
    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut zip_data));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for artifact in artifacts {
            zip.start_file(artifact.path.as_str(), options)?;
            zip.write_all(&artifact.pdf)?;
        }
        zip.finish()?;
    }
    Ok(zip_data)
}

/// The uploaded template if one was sent, otherwise the bundled default.
pub fn load_template(upload: Option<Vec<u8>>, default_path: &Path) -> Result<Vec<u8>> {
    if let Some(bytes) = upload.filter(|b| !b.is_empty()) {
        return Ok(bytes);
    }
    if default_path.is_file() {
        tracing::info!("Using bundled template {}", default_path.display());
        return Ok(std::fs::read(default_path)?);
    }
    Err(CertError::validation(
        "Upload a PDF template (no bundled default template is available).",
    ))
}
