use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use sha2::{Digest, Sha256};
use tokio::fs::{create_dir_all, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::Error;

pub const MAX_CV_BYTES: usize = 5 * 1024 * 1024;
/// Request body cap for the upload route: the file plus multipart framing.
pub const MAX_UPLOAD_BODY: usize = MAX_CV_BYTES + 64 * 1024;

pub const FILE_TOO_LARGE: &str = "File too large, maximum size is 5MB";

const PDF_MAGIC: &[u8] = b"%PDF-";

pub async fn prepare_io(dir: &Path) -> anyhow::Result<()> {
    create_dir_all(dir).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CvUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Pulls the `cv` field out of a multipart body, ignoring any other field.
pub async fn read_cv_field(multipart: &mut Multipart) -> Result<CvUpload, Error> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("cv") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(CvUpload {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(Error::validation("No file uploaded"))
}

pub fn validate_cv(upload: &CvUpload) -> Result<(), Error> {
    if upload.bytes.is_empty() {
        return Err(Error::validation("Uploaded file is empty"));
    }
    if upload.bytes.len() > MAX_CV_BYTES {
        return Err(Error::validation(FILE_TOO_LARGE));
    }
    let declared_pdf = upload
        .content_type
        .as_deref()
        .map(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    let named_pdf = upload
        .file_name
        .as_deref()
        .map(|name| name.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    if !declared_pdf && !named_pdf {
        return Err(Error::validation("Only PDF files are accepted"));
    }
    if !upload.bytes.starts_with(PDF_MAGIC) {
        return Err(Error::validation("File is not a valid PDF"));
    }
    Ok(())
}

/// Validates and writes the upload, returning the stored file name.
/// Identical content maps to the same file.
pub async fn store_cv(dir: &Path, upload: &CvUpload) -> Result<String, Error> {
    validate_cv(upload)?;
    let digest = Sha256::digest(&upload.bytes);
    let name = format!("cv-{}.pdf", hex::encode(digest));
    let path = dir.join(&name);
    if path.exists() {
        log::debug!("CV {} already stored", name);
        return Ok(name);
    }
    let file = create_io_file(&path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&upload.bytes).await?;
    writer.flush().await?;
    log::debug!("Stored CV {} ({} bytes)", name, upload.bytes.len());
    Ok(name)
}

async fn create_io_file(path: &Path) -> Result<File, Error> {
    let pathbuf = PathBuf::from(path);
    if let Some(parent) = pathbuf.parent() {
        create_dir_all(parent).await?;
    }
    Ok(File::create(pathbuf).await?)
}
