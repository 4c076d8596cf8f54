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

//! Directory entries: the fixed 128-byte records that make up a
//! directory's cluster chain.

use tf5000_err::{FormatError, Result};
use zerocopy::{big_endian::U16, big_endian::U32, FromBytes, Immutable, KnownLayout};

pub const ENTRY_SIZE: usize = 128;

const TYPE_FILE_A: u8 = 0xd0;
const TYPE_FILE_T: u8 = 0xd1;
const TYPE_DOT_DOT: u8 = 0xf0;
const TYPE_DOT: u8 = 0xf1;
const TYPE_SUBDIR: u8 = 0xf2;
const TYPE_RECYCLE: u8 = 0xf3;
const TYPE_UNUSED: u8 = 0xff;
const TYPE_ROOT: u8 = 0xef;

/// The closed set of directory entry types. `Root` is synthetic: it never
/// appears on disk, only in the value manufactured for the filesystem's
/// root directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    FileA,
    FileT,
    DotDot,
    Dot,
    SubDir,
    Recycle,
    Unused,
    Root,
}

impl EntryType {
    pub fn from_byte(b: u8) -> Result<Self> {
        Ok(match b {
            TYPE_FILE_A => EntryType::FileA,
            TYPE_FILE_T => EntryType::FileT,
            TYPE_DOT_DOT => EntryType::DotDot,
            TYPE_DOT => EntryType::Dot,
            TYPE_SUBDIR => EntryType::SubDir,
            TYPE_RECYCLE => EntryType::Recycle,
            TYPE_UNUSED => EntryType::Unused,
            TYPE_ROOT => EntryType::Root,
            other => return Err(FormatError::UnrecognizedEntryType { found: other }.into()),
        })
    }

    pub fn is_directory(self) -> bool {
        matches!(
            self,
            EntryType::DotDot | EntryType::Dot | EntryType::SubDir | EntryType::Recycle | EntryType::Root
        )
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
pub(crate) struct RawDirEntry {
    entry_type: u8,
    mtime: [u8; 7],
    start_cluster: U32,
    clusters: U32,
    unused_bytes_in_last_cluster: U32,
    filename: [u8; 64],
    service_name: [u8; 31],
    _unused1: u8,
    attributes: U32,
    flags: U16,
    _unused2: [u8; 2],
    _unused3: u8,
    _s3_crc: u8,
    _bytes_in_last_block: U16,
}

const _: () = assert!(std::mem::size_of::<RawDirEntry>() == ENTRY_SIZE);

/// A parsed directory entry, owned (decoupled from the raw byte buffer it
/// came from).
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub entry_type: EntryType,
    pub start_cluster: u32,
    pub clusters: u32,
    pub unused_bytes_in_last_cluster: u32,
    pub filename: String,
    pub attributes: u32,
    pub flags: u16,
}

impl DirectoryEntry {
    pub(crate) fn parse(raw: &[u8]) -> Result<Self> {
        let raw = RawDirEntry::ref_from_bytes(raw)
            .map_err(|_| tf5000_err::Error::Fatal("directory entry buffer too small".into()))?;
        let entry_type = EntryType::from_byte(raw.entry_type)?;
        Ok(DirectoryEntry {
            entry_type,
            start_cluster: raw.start_cluster.get(),
            clusters: raw.clusters.get(),
            unused_bytes_in_last_cluster: raw.unused_bytes_in_last_cluster.get(),
            filename: nul_terminated(&raw.filename),
            attributes: raw.attributes.get(),
            flags: raw.flags.get(),
        })
    }

    /// The synthetic entry used to open the filesystem's root directory.
    /// Built fresh on demand rather than cached as hidden static state.
    pub fn synthetic_root(root_dir_cluster: u32, unused_bytes_in_root: u32) -> Self {
        DirectoryEntry {
            entry_type: EntryType::Root,
            start_cluster: root_dir_cluster,
            clusters: 1,
            unused_bytes_in_last_cluster: unused_bytes_in_root,
            filename: "/".to_string(),
            attributes: 0,
            flags: 0,
        }
    }
}

fn nul_terminated(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_layout_is_128_bytes() {
        assert_eq!(std::mem::size_of::<RawDirEntry>(), ENTRY_SIZE);
    }

    #[test]
    fn unrecognized_type_is_a_format_error() {
        let err = EntryType::from_byte(0x42).unwrap_err();
        assert!(matches!(
            err,
            tf5000_err::Error::Format(FormatError::UnrecognizedEntryType { found: 0x42 })
        ));
    }

    #[test]
    fn filename_stops_at_nul() {
        let mut name = [0u8; 64];
        name[..5].copy_from_slice(b"hello");
        assert_eq!(nul_terminated(&name), "hello");
    }
}
