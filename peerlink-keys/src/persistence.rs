//! On-disk handling of identity files.
//!
//! New files are written to a temporary sibling, flushed to disk, and then
//! linked into place only if nothing exists at the target yet. Two processes
//! racing through first-run setup therefore never interleave writes: one of
//! them creates the file and the other observes [`CreateOutcome::AlreadyExists`].

use crate::error::{KeyError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Owner read/write only (private keys)
    Private,
    /// World readable (certificates, config)
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Atomically create `path` with `contents`, failing over to
/// [`CreateOutcome::AlreadyExists`] when the path is already taken.
pub fn create_new(path: &Path, contents: &[u8], mode: FileMode) -> io::Result<CreateOutcome> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".peerlink-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    set_mode(tmp.as_file(), mode)?;
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(CreateOutcome::Created),
        // the temporary file is removed when the returned handle drops
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            Ok(CreateOutcome::AlreadyExists)
        }
        Err(e) => Err(e.error),
    }
}

/// Read an identity file that is expected to exist.
pub fn read_existing(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => KeyError::FileNotFound(path.to_path_buf()),
        _ => KeyError::Io(e),
    })
}

/// Remove a file if present. Returns whether anything was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(KeyError::Io(e)),
    }
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: FileMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = match mode {
        FileMode::Private => 0o600,
        FileMode::Public => 0o644,
    };
    file.set_permissions(fs::Permissions::from_mode(bits))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: FileMode) -> io::Result<()> {
    Ok(())
}
