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

//! Cluster chains viewed as files: construction by directory-entry type,
//! chunked reads, and the subdirectory size-fixup protocol.

use tf5000_block::BlockSource;
use tf5000_err::{Error, Result};

use crate::dirent::{DirectoryEntry, EntryType, ENTRY_SIZE};
use crate::fat::ClusterDescriptor;
use crate::Filesystem;

/// Reads proceed one "chunk" (188 blocks) at a time, keeping every read
/// aligned to the MPEG-TS packet grid and within a single cluster.
const DEFAULT_BUFFER_CHUNKS: u64 = 188;

#[derive(Debug)]
pub struct FileHandle<'fs, 'd, B: BlockSource> {
    fs: &'fs Filesystem<'d, B>,
    clusters: Vec<ClusterDescriptor>,
    filesize: u64,
    offset: u64,
    buffer: Vec<u8>,
    nread: usize,
    filesize_needs_fixup: bool,
    buffer_size: usize,
}

impl<'fs, 'd, B: BlockSource> FileHandle<'fs, 'd, B> {
    /// Open a handle for `entry`, materializing its cluster chain. Per
    /// spec: `SubDir`/`DotDot`/`Recycle` entries carry an unreliable size
    /// (the firmware never updates it) and are flagged for a one-shot
    /// fixup from their own `Dot` entry on first read.
    pub fn open_dir_entry(fs: &'fs Filesystem<'d, B>, entry: &DirectoryEntry) -> Result<Self> {
        let (clusters, unused, needs_fixup) = match entry.entry_type {
            EntryType::Unused => {
                return Err(Error::Fatal("attempt to open unused DirEntry".into()))
            }
            EntryType::SubDir | EntryType::DotDot | EntryType::Recycle => (1, 0, true),
            EntryType::Dot | EntryType::Root | EntryType::FileA | EntryType::FileT => {
                (entry.clusters, entry.unused_bytes_in_last_cluster, false)
            }
        };

        let bytes_per_cluster = fs.bytes_per_cluster();
        let filesize = clusters as u64 * bytes_per_cluster - unused as u64;
        let chain = fs.chain(entry.start_cluster, clusters, filesize)?;

        Ok(FileHandle {
            fs,
            clusters: chain,
            filesize,
            offset: 0,
            buffer: Vec::new(),
            nread: 0,
            filesize_needs_fixup: needs_fixup,
            buffer_size: (DEFAULT_BUFFER_CHUNKS * fs.block_size() as u64) as usize,
        })
    }

    pub fn filesize(&self) -> u64 {
        self.filesize
    }

    pub fn filesize_needs_fixup(&self) -> bool {
        self.filesize_needs_fixup
    }

    pub(crate) fn clusters(&self) -> &[ClusterDescriptor] {
        &self.clusters
    }

    /// The valid bytes from the most recent `read_chunk`, or an empty
    /// slice before the first read.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[..self.nread]
    }

    /// Read the next chunk (up to `buffer_size` bytes, truncated to the
    /// remaining filesize). Returns `Ok(None)` at end of file.
    pub fn read_chunk(&mut self) -> Result<Option<&[u8]>> {
        if self.offset >= self.filesize {
            return Ok(None);
        }
        if self.buffer.len() != self.buffer_size {
            self.buffer.resize(self.buffer_size, 0);
        }

        let bytes_per_cluster = self.fs.bytes_per_cluster();
        let cluster_index = (self.offset / bytes_per_cluster) as usize;
        let cluster = self.clusters[cluster_index].cluster;
        let cluster_offset = self.offset % bytes_per_cluster;
        let mut bytes = self
            .buffer_size
            .min((self.filesize - self.offset) as usize);

        self.fs
            .read_cluster(cluster, cluster_offset, &mut self.buffer[..bytes])?;

        if self.filesize_needs_fixup {
            let dot = DirectoryEntry::parse(&self.buffer[..ENTRY_SIZE])?;
            let new_size =
                dot.clusters as u64 * bytes_per_cluster - dot.unused_bytes_in_last_cluster as u64;
            // Signed: a directory's real size (from its own `Dot` entry)
            // routinely exceeds the one-cluster placeholder it was opened
            // with, making this delta negative. Unsigned subtraction here
            // would underflow.
            let delta = self.filesize as i64 - new_size as i64;
            let last = self.clusters.len() - 1;
            self.clusters[last].bytes_used -= delta as i32;
            self.filesize = new_size;
            bytes = bytes.min(new_size as usize);
            self.filesize_needs_fixup = false;
        }

        self.nread = bytes;
        self.offset += bytes as u64;
        Ok(Some(&self.buffer[..bytes]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_fixture_disk, FixtureOptions};
    use crate::Disk;

    #[test]
    fn sequential_read_consumes_exactly_filesize() {
        let (block, opts) = build_fixture_disk(FixtureOptions::single_file(3, 100));
        let disk = Disk::open("fixture", block);
        let fs = Filesystem::open(&disk).unwrap();
        let mut root = crate::path::open_root(&fs).unwrap();
        let entries = crate::path::list_entries(&mut root).unwrap();
        let file_entry = entries
            .iter()
            .find(|e| e.entry_type == EntryType::FileT)
            .unwrap();
        let mut handle = FileHandle::open_dir_entry(&fs, file_entry).unwrap();
        let expected = 3 * opts.bytes_per_cluster() - 100;
        let mut total = 0usize;
        while let Some(chunk) = handle.read_chunk().unwrap() {
            total += chunk.len();
        }
        assert_eq!(total as u64, expected);
        assert_eq!(handle.filesize(), expected);
    }

    #[test]
    fn fixup_grows_size_past_the_placeholder_for_a_multi_cluster_subdirectory() {
        // A `SubDir` whose real chain (reported by its own `Dot` entry)
        // spans more than the one-cluster placeholder it's opened with --
        // the ordinary case, and the one that made the unsigned delta
        // subtraction underflow.
        let (block, opts) = build_fixture_disk(FixtureOptions::single_subdir(3, 200));
        let disk = Disk::open("fixture", block);
        let fs = Filesystem::open(&disk).unwrap();
        let mut root = crate::path::open_root(&fs).unwrap();
        let entries = crate::path::list_entries(&mut root).unwrap();
        let subdir_entry = entries
            .iter()
            .find(|e| e.entry_type == EntryType::SubDir)
            .unwrap();

        let mut handle = FileHandle::open_dir_entry(&fs, subdir_entry).unwrap();
        assert!(handle.filesize_needs_fixup());
        assert_eq!(handle.filesize(), opts.bytes_per_cluster());

        handle.read_chunk().unwrap();

        assert!(!handle.filesize_needs_fixup());
        let expected = 3 * opts.bytes_per_cluster() - 200;
        assert_eq!(handle.filesize(), expected);

        let total_bytes_used: i64 = handle.clusters().iter().map(|c| c.bytes_used as i64).sum();
        assert_eq!(total_bytes_used as u64, expected);
    }
}
