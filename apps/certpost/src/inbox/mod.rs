//! Inbox and filing — finds certificates waiting in `inbox/` and files finished
//! posts under `done/<category>/<short_name>/`.
//!
//! Filing is move-on-success: the post is written first, and if the certificate
//! cannot then be moved the written files are removed again.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::AppError;

pub const SUPPORTED_IMAGES: &[&str] = &["png", "jpg", "jpeg", "webp", "heic", "heif"];
pub const SUPPORTED_DOCS: &[&str] = &["pdf"];

const NOTES_SUFFIX: &str = ".notes.txt";
pub const POST_FILE: &str = "post.md";
pub const RECORD_FILE: &str = "meta.json";

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension_lower(path)
        .map(|ext| {
            SUPPORTED_IMAGES.contains(&ext.as_str()) || SUPPORTED_DOCS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// All supported certificate files directly inside `dir`, sorted by name.
pub fn find_all_certs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut certs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            certs.push(path);
        }
    }
    certs.sort();
    Ok(certs)
}

/// `bls-cert.pdf` → `bls-cert.notes.txt`, in the same directory.
pub fn notes_path(cert: &Path) -> PathBuf {
    let stem = cert
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    cert.with_file_name(format!("{stem}{NOTES_SUFFIX}"))
}

/// Trimmed notes for `cert`, or `None` when the file is missing or blank.
pub fn read_notes(cert: &Path) -> Option<String> {
    let path = notes_path(cert);
    match fs::read_to_string(&path) {
        Ok(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Could not read notes {}: {e}", path.display());
            None
        }
    }
}

/// MIME type for a certificate, by extension.
pub fn media_type_for(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }
    match extension_lower(path).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Media types the model accepts as an attachment.
pub const ATTACHABLE_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
];

/// Media type to attach `cert` with, or a validation error for formats the model
/// rejects (HEIC/HEIF). Checked before any request is made.
pub fn attachment_media_type(cert: &Path) -> Result<String, AppError> {
    let media_type = media_type_for(cert);
    if ATTACHABLE_TYPES.contains(&media_type.as_str()) {
        return Ok(media_type);
    }
    let ext = extension_lower(cert).unwrap_or_default().to_uppercase();
    Err(AppError::Validation(format!(
        "{}: {ext} ({media_type}) cannot be sent to the model; convert it to JPEG or PNG",
        cert.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    )))
}

/// Where a filed post ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filed {
    pub dest_dir: PathBuf,
    pub post_path: PathBuf,
    pub cert_path: PathBuf,
}

/// What to file for one certificate.
pub struct FilingRequest<'a> {
    pub cert: &'a Path,
    pub category_dir: &'a str,
    pub short_name: &'a str,
    pub post_text: &'a str,
    /// Serialized run record, written beside the post.
    pub record_json: &'a str,
}

/// Files a generated post and moves the certificate (and its notes) next to it.
///
/// Steps:
/// 1. Pick `done/<category>/<short_name>/`, suffixing `-2`, `-3`… if already taken
/// 2. Write `post.md` and `meta.json` atomically
/// 3. Move the certificate; on failure remove what step 2 wrote
/// 4. Move the notes file if present (failure only warns)
pub fn file_post(done: &Path, request: &FilingRequest<'_>) -> Result<Filed, AppError> {
    let cert_name = request
        .cert
        .file_name()
        .ok_or_else(|| AppError::Validation(format!("{} has no file name", request.cert.display())))?;

    let dest_dir = unique_dest_dir(&done.join(request.category_dir), request.short_name);
    fs::create_dir_all(&dest_dir)?;

    let post_path = dest_dir.join(POST_FILE);
    let record_path = dest_dir.join(RECORD_FILE);
    if let Err(e) = write_atomic(&post_path, request.post_text.as_bytes()) {
        abandon(&dest_dir, &[]);
        return Err(e.into());
    }
    if let Err(e) = write_atomic(&record_path, request.record_json.as_bytes()) {
        abandon(&dest_dir, &[post_path.as_path()]);
        return Err(e.into());
    }

    let cert_path = dest_dir.join(cert_name);
    if let Err(e) = move_file(request.cert, &cert_path) {
        abandon(&dest_dir, &[post_path.as_path(), record_path.as_path()]);
        return Err(e.into());
    }

    let notes = notes_path(request.cert);
    if notes.exists() {
        if let Some(name) = notes.file_name() {
            if let Err(e) = move_file(&notes, &dest_dir.join(name)) {
                warn!("Could not move notes {}: {e}", notes.display());
            }
        }
    }

    debug!("Filed {} → {}", request.cert.display(), dest_dir.display());
    Ok(Filed {
        dest_dir,
        post_path,
        cert_path,
    })
}

/// Removes what a failed filing wrote, then the destination directory itself so the
/// short name stays free for the retry.
fn abandon(dest_dir: &Path, written: &[&Path]) {
    for path in written {
        remove_quietly(path);
    }
    if let Err(e) = fs::remove_dir(dest_dir) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove {}: {e}", dest_dir.display());
        }
    }
}

fn unique_dest_dir(parent: &Path, short_name: &str) -> PathBuf {
    let first = parent.join(short_name);
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| parent.join(format!("{short_name}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Temp file in the target directory, then rename into place.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Rename, falling back to copy + delete when the rename crosses filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !from.exists() {
                return Err(rename_err);
            }
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                remove_quietly(to);
                return Err(e);
            }
            Ok(())
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not clean up {}: {e}", path.display());
        }
    }
}
