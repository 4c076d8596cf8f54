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

//! A read-only decoder for the FAT24 filesystem used by Topfield TF5000
//! PVR hard disks: super block validation, FAT chain walking, directory
//! traversal, and file reads, all through the byte-swapped block layer in
//! [`byteswap`].

mod byteswap;
mod dirent;
mod fat;
mod file;
mod geometry;
mod path;
mod superblock;

#[cfg(test)]
mod test_support;

pub use dirent::{DirectoryEntry, EntryType};
pub use file::FileHandle;
pub use path::{list_dir, open_path, open_root, ListEntry};
pub use superblock::{MAGIC, VERSION};

use std::cell::RefCell;

use tf5000_block::BlockSource;
use tf5000_err::Result;

use fat::{ClusterDescriptor, Fat};

/// A disk: a block source plus the cluster geometry derived from its size.
/// Owns the `BlockSource`; there is no `disk_close` — dropping the value
/// closes it.
#[derive(Debug)]
pub struct Disk<B: BlockSource> {
    path: String,
    block: B,
    block_size: u32,
    total_blocks: u64,
    blocks_per_cluster: u32,
}

impl<B: BlockSource> Disk<B> {
    pub fn open(path: impl Into<String>, block: B) -> Self {
        let block_size = block.sector_size();
        let total_blocks = block.total_blocks();
        let blocks_per_cluster = geometry::blocks_per_cluster(total_blocks);
        Disk {
            path: path.into(),
            block,
            block_size,
            total_blocks,
            blocks_per_cluster,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    /// Cluster size calculated from disk geometry. The super block on a
    /// real disk should agree; [`Filesystem::open`] trusts the super block
    /// when it doesn't and only logs a warning.
    pub fn blocks_per_cluster(&self) -> u32 {
        self.blocks_per_cluster
    }
}

/// An open filesystem on a [`Disk`]. The FAT is loaded lazily, on first
/// access to anything beyond the root directory's own entry.
#[derive(Debug)]
pub struct Filesystem<'d, B: BlockSource> {
    disk: &'d Disk<B>,
    blocks_per_cluster: u32,
    bytes_per_cluster: u64,
    root_dir_cluster: u32,
    unused_bytes_in_root: u32,
    used_clusters: u32,
    fat_crc32: u32,
    fat: RefCell<Option<Fat>>,
}

impl<'d, B: BlockSource> Filesystem<'d, B> {
    pub fn open(disk: &'d Disk<B>) -> Result<Self> {
        let calculated_bytes_per_cluster = disk.blocks_per_cluster as u64 * disk.block_size as u64;
        let sb = superblock::read_super_blocks(&disk.block, calculated_bytes_per_cluster)?;

        let blocks_per_cluster = if sb.sectors_per_cluster as u32 != disk.blocks_per_cluster {
            log::warn!(
                "super block declares {} blocks per cluster, but disk geometry calculates {}; \
                 trusting the super block",
                sb.sectors_per_cluster,
                disk.blocks_per_cluster
            );
            sb.sectors_per_cluster as u32
        } else {
            disk.blocks_per_cluster
        };

        Ok(Filesystem {
            disk,
            blocks_per_cluster,
            bytes_per_cluster: blocks_per_cluster as u64 * disk.block_size as u64,
            root_dir_cluster: sb.root_dir_cluster as u32,
            unused_bytes_in_root: sb.unused_bytes_in_root,
            used_clusters: sb.used_clusters,
            fat_crc32: sb.fat_crc32,
            fat: RefCell::new(None),
        })
    }

    pub fn blocks_per_cluster(&self) -> u32 {
        self.blocks_per_cluster
    }

    pub fn used_clusters(&self) -> u32 {
        self.used_clusters
    }

    pub fn fat_crc32(&self) -> u32 {
        self.fat_crc32
    }

    pub(crate) fn bytes_per_cluster(&self) -> u64 {
        self.bytes_per_cluster
    }

    pub(crate) fn block_size(&self) -> u32 {
        self.disk.block_size
    }

    pub(crate) fn root_entry(&self) -> DirectoryEntry {
        DirectoryEntry::synthetic_root(self.root_dir_cluster, self.unused_bytes_in_root)
    }

    fn ensure_fat_loaded(&self) -> Result<()> {
        if self.fat.borrow().is_none() {
            let fat = Fat::load(
                &self.disk.block,
                self.bytes_per_cluster,
                self.disk.block_size as u64,
            )?;
            *self.fat.borrow_mut() = Some(fat);
        }
        Ok(())
    }

    pub(crate) fn chain(
        &self,
        start_cluster: u32,
        expected_cluster_count: u32,
        filesize: u64,
    ) -> Result<Vec<ClusterDescriptor>> {
        self.ensure_fat_loaded()?;
        let fat = self.fat.borrow();
        fat.as_ref()
            .expect("just loaded")
            .chain(start_cluster, expected_cluster_count, filesize, self.bytes_per_cluster)
    }

    pub(crate) fn read_cluster(&self, cluster: i32, offset_in_cluster: u64, buf: &mut [u8]) -> Result<()> {
        byteswap::read(&self.disk.block, self.bytes_per_cluster, cluster, offset_in_cluster, buf)
    }
}
