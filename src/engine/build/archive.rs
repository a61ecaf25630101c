//! Tar packing of the build context directory.
//!
//! The engine receives the build context as a single tar stream. Entries are
//! written in sorted order so identical trees produce identical archives.

use std::io;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs::Metadata;
use cap_std::fs_utf8::Dir;
use tar::{Builder, EntryType, Header};

use crate::error::{FilesystemError, RelaunchError};

const DEFAULT_DIRECTORY_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Pack every regular file and directory under `context_dir` into a tar
/// archive, with paths relative to `context_dir`.
///
/// Symlinks and special files are skipped.
///
/// # Errors
///
/// Returns `FilesystemError::NotFound` when `context_dir` does not exist and
/// `FilesystemError::IoError` for any other read failure.
pub fn pack_build_context(context_dir: &Utf8Path) -> Result<Vec<u8>, RelaunchError> {
    let root = Dir::open_ambient_dir(context_dir, ambient_authority())
        .map_err(|error| map_io_error(context_dir, &error))?;

    build_tar_archive(&root).map_err(|error| map_io_error(context_dir, &error))
}

fn map_io_error(context_dir: &Utf8Path, error: &io::Error) -> RelaunchError {
    let path = context_dir.as_std_path().to_path_buf();
    if error.kind() == io::ErrorKind::NotFound {
        RelaunchError::from(FilesystemError::NotFound { path })
    } else {
        RelaunchError::from(FilesystemError::IoError {
            path,
            message: error.to_string(),
        })
    }
}

pub(super) fn build_tar_archive(root: &Dir) -> io::Result<Vec<u8>> {
    let mut builder = Builder::new(vec![]);
    append_directory_contents(&mut builder, root, Utf8Path::new(""))?;
    builder.finish()?;
    builder.into_inner()
}

fn append_directory_contents(
    builder: &mut Builder<Vec<u8>>,
    current_dir: &Dir,
    current_relative_path: &Utf8Path,
) -> io::Result<()> {
    for entry in sorted_entries(current_dir)? {
        let entry_relative_path = current_relative_path.join(&entry.file_name);

        match entry.entry_kind {
            EntryKind::Directory => {
                let metadata = current_dir.metadata(&entry.file_name)?;
                append_directory_header(builder, &entry_relative_path, &metadata)?;
                let child_dir = current_dir.open_dir(&entry.file_name)?;
                append_directory_contents(builder, &child_dir, &entry_relative_path)?;
            }
            EntryKind::File => {
                append_file(builder, current_dir, &entry.file_name, &entry_relative_path)?;
            }
            EntryKind::Other => {}
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortedEntry {
    file_name: String,
    entry_kind: EntryKind,
}

fn sorted_entries(directory: &Dir) -> io::Result<Vec<SortedEntry>> {
    let mut entries = vec![];

    for entry_result in directory.entries()? {
        let entry = entry_result?;
        let file_type = entry.file_type()?;

        let entry_kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        entries.push(SortedEntry {
            file_name: entry.file_name()?,
            entry_kind,
        });
    }

    entries.sort_unstable_by(|left, right| left.file_name.cmp(&right.file_name));
    Ok(entries)
}

fn append_directory_header(
    builder: &mut Builder<Vec<u8>>,
    relative_path: &Utf8Path,
    metadata: &Metadata,
) -> io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(metadata_mode(metadata, DEFAULT_DIRECTORY_MODE));
    header.set_cksum();

    let path = format!("{}/", archive_path(relative_path));
    builder.append_data(&mut header, path, io::empty())
}

fn append_file(
    builder: &mut Builder<Vec<u8>>,
    parent_dir: &Dir,
    file_name: &str,
    relative_path: &Utf8Path,
) -> io::Result<()> {
    let metadata = parent_dir.metadata(file_name)?;
    let mut file = parent_dir.open(file_name)?;

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(metadata.len());
    header.set_mode(metadata_mode(&metadata, DEFAULT_FILE_MODE));
    header.set_cksum();

    builder.append_data(&mut header, archive_path(relative_path), &mut file)
}

/// Tar paths always use forward slashes.
fn archive_path(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

#[cfg(unix)]
fn metadata_mode(metadata: &Metadata, _fallback: u32) -> u32 {
    use cap_std::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn metadata_mode(_metadata: &Metadata, fallback: u32) -> u32 {
    fallback
}
