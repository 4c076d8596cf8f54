// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Directory iteration and `/`-separated path resolution.

use tf5000_block::BlockSource;
use tf5000_err::{Error, Result};

use crate::dirent::{DirectoryEntry, EntryType, ENTRY_SIZE};
use crate::file::FileHandle;
use crate::Filesystem;

/// Open the filesystem's root directory.
pub fn open_root<'fs, 'd, B: BlockSource>(
    fs: &'fs Filesystem<'d, B>,
) -> Result<FileHandle<'fs, 'd, B>> {
    FileHandle::open_dir_entry(fs, &fs.root_entry())
}

/// Read every entry of a directory to the end, skipping `Unused` slots (a
/// gap left by a deleted entry, not an error).
pub fn list_entries<'fs, 'd, B: BlockSource>(
    dir: &mut FileHandle<'fs, 'd, B>,
) -> Result<Vec<DirectoryEntry>> {
    let mut entries = Vec::new();
    while let Some(chunk) = dir.read_chunk()? {
        let mut offset = 0;
        while offset + ENTRY_SIZE <= chunk.len() {
            let entry = DirectoryEntry::parse(&chunk[offset..offset + ENTRY_SIZE])?;
            if entry.entry_type != EntryType::Unused {
                entries.push(entry);
            }
            offset += ENTRY_SIZE;
        }
    }
    Ok(entries)
}

/// Resolve a `/`-separated path starting from `base` (the root directory
/// if `None`). Leading, trailing, and repeated slashes are ignored; an
/// empty path returns the starting directory unchanged. On failure, the
/// error names the first component that could not be found.
pub fn open_path<'fs, 'd, B: BlockSource>(
    fs: &'fs Filesystem<'d, B>,
    base: Option<FileHandle<'fs, 'd, B>>,
    path: &str,
) -> Result<FileHandle<'fs, 'd, B>> {
    let mut current = match base {
        Some(handle) => handle,
        None => open_root(fs)?,
    };
    for component in path.split('/').filter(|s| !s.is_empty()) {
        let entries = list_entries(&mut current)?;
        let entry = entries
            .iter()
            .find(|e| e.filename == component)
            .ok_or_else(|| Error::NotFound {
                component: component.to_string(),
            })?;
        current = FileHandle::open_dir_entry(fs, entry)?;
    }
    Ok(current)
}

/// One entry as surfaced by `list_dir`. `size` is only meaningful when
/// listing with `long`; computing it may require a fixup read.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// List the contents of the directory at `path` relative to the root.
/// `Dot`/`DotDot` entries are never shown. In `long` mode every remaining
/// entry is opened to report its size; subdirectories need one chunk read
/// first to trigger their size fixup.
pub fn list_dir<'d, B: BlockSource>(
    fs: &Filesystem<'d, B>,
    path: &str,
    long: bool,
) -> Result<Vec<ListEntry>> {
    let mut dir = open_path(fs, None, path)?;
    let entries = list_entries(&mut dir)?;

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if matches!(entry.entry_type, EntryType::Dot | EntryType::DotDot) {
            continue;
        }
        let is_dir = entry.entry_type.is_directory();
        let size = if long {
            let mut handle = FileHandle::open_dir_entry(fs, &entry)?;
            if handle.filesize_needs_fixup() {
                handle.read_chunk()?;
            }
            handle.filesize()
        } else {
            0
        };
        out.push(ListEntry {
            name: entry.filename,
            is_dir,
            size,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_fixture_disk, FixtureOptions};
    use crate::Disk;

    #[test]
    fn lists_single_file_in_root() {
        let (block, opts) = build_fixture_disk(FixtureOptions::single_file(2, 50));
        let disk = Disk::open("fixture", block);
        let fs = Filesystem::open(&disk).unwrap();
        let listing = list_dir(&fs, "", true).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "DATA000.TST");
        assert!(!listing[0].is_dir);
        assert_eq!(listing[0].size, 2 * opts.bytes_per_cluster() - 50);
    }

    #[test]
    fn open_path_finds_file_by_name() {
        let (block, opts) = build_fixture_disk(FixtureOptions::single_file(1, 0));
        let disk = Disk::open("fixture", block);
        let fs = Filesystem::open(&disk).unwrap();
        let handle = open_path(&fs, None, "DATA000.TST").unwrap();
        assert_eq!(handle.filesize(), opts.bytes_per_cluster());
    }

    #[test]
    fn open_path_reports_missing_component() {
        let (block, _opts) = build_fixture_disk(FixtureOptions::single_file(1, 0));
        let disk = Disk::open("fixture", block);
        let fs = Filesystem::open(&disk).unwrap();
        let err = open_path(&fs, None, "NOPE.TXT").unwrap_err();
        assert!(matches!(err, Error::NotFound { component } if component == "NOPE.TXT"));
    }
}
