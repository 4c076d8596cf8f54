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

//! Super block parsing and validation.
//!
//! Two identical 512-byte super blocks open the filesystem. Both must
//! carry the TF5000 magic/version/identifier and agree byte-for-byte.

use tf5000_block::BlockSource;
use tf5000_err::{Error, FormatError, Result};
use zerocopy::{big_endian::U16, big_endian::U32, FromBytes, Immutable, KnownLayout};

use crate::byteswap;

pub const MAGIC: u32 = 0x07082607;
pub const VERSION: u16 = 0x0101;
pub const IDENTIFIER: &str = "TOPFIELD TF5000PVR HDD";

const SECTOR_SIZE: usize = 512;
const HEADER_BYTES: usize = 4 + 28 + 2 + 2 + 2 + 2 + 4 + 4 + 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
struct RawSuperBlock {
    magic: U32,
    identifier: [u8; 28],
    version: U16,
    sectors_per_cluster: U16,
    root_dir_cluster: U16,
    unused_1: U16,
    used_clusters: U32,
    unused_bytes_in_root: U32,
    fat_crc32: U32,
    _reserved: [u8; SECTOR_SIZE - HEADER_BYTES],
}

/// Filesystem parameters extracted from the validated super block pair.
#[derive(Debug, Clone, Copy)]
pub struct SuperBlockInfo {
    pub sectors_per_cluster: u16,
    pub root_dir_cluster: u16,
    pub used_clusters: u32,
    pub unused_bytes_in_root: u32,
    pub fat_crc32: u32,
}

/// Read and validate the two super blocks at the start of the device.
pub fn read_super_blocks(block: &dyn BlockSource, bytes_per_cluster: u64) -> Result<SuperBlockInfo> {
    let mut raw = vec![0u8; 2 * SECTOR_SIZE];
    byteswap::read(block, bytes_per_cluster, -1, 0, &mut raw)?;

    let (raw1, raw2) = raw.split_at(SECTOR_SIZE);
    let sb1 = RawSuperBlock::ref_from_bytes(raw1)
        .map_err(|_| Error::Fatal("super block buffer too small".into()))?;
    let sb2 = RawSuperBlock::ref_from_bytes(raw2)
        .map_err(|_| Error::Fatal("super block buffer too small".into()))?;

    if sb1.magic.get() != MAGIC {
        return Err(FormatError::BadMagic {
            found: sb1.magic.get(),
        }
        .into());
    }
    if sb2.magic.get() != MAGIC {
        return Err(FormatError::BadMagic {
            found: sb2.magic.get(),
        }
        .into());
    }
    if raw1 != raw2 {
        return Err(FormatError::SuperBlocksDiffer.into());
    }

    let identifier = identifier_str(&sb1.identifier);
    if identifier != IDENTIFIER {
        return Err(FormatError::BadIdentifier.into());
    }

    if sb1.version.get() != VERSION {
        return Err(FormatError::BadVersion {
            found: sb1.version.get(),
        }
        .into());
    }

    Ok(SuperBlockInfo {
        sectors_per_cluster: sb1.sectors_per_cluster.get(),
        root_dir_cluster: sb1.root_dir_cluster.get(),
        used_clusters: sb1.used_clusters.get(),
        unused_bytes_in_root: sb1.unused_bytes_in_root.get(),
        fat_crc32: sb1.fat_crc32.get(),
    })
}

fn identifier_str(raw: &[u8; 28]) -> &str {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).unwrap_or("")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a 2-super-block region (pre-swap, on-disk form) for tests:
    /// big-endian fields, then word-swapped so it round-trips exactly like
    /// a real image through [`byteswap::read`].
    pub fn build_super_block_region(
        sectors_per_cluster: u16,
        root_dir_cluster: u16,
        used_clusters: u32,
        unused_bytes_in_root: u32,
    ) -> Vec<u8> {
        let mut sector = vec![0u8; SECTOR_SIZE];
        sector[0..4].copy_from_slice(&MAGIC.to_be_bytes());
        sector[4..4 + IDENTIFIER.len()].copy_from_slice(IDENTIFIER.as_bytes());
        sector[32..34].copy_from_slice(&VERSION.to_be_bytes());
        sector[34..36].copy_from_slice(&sectors_per_cluster.to_be_bytes());
        sector[36..38].copy_from_slice(&root_dir_cluster.to_be_bytes());
        sector[40..44].copy_from_slice(&used_clusters.to_be_bytes());
        sector[44..48].copy_from_slice(&unused_bytes_in_root.to_be_bytes());

        let mut region = sector.clone();
        region.extend_from_slice(&sector);
        byteswap::swap_words(&mut region).unwrap();
        region
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build_super_block_region;
    use super::*;
    use std::cell::RefCell;

    struct FixedBlock(RefCell<Vec<u8>>);

    impl BlockSource for FixedBlock {
        fn read_at(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
            let data = self.0.borrow();
            let start = offset as usize;
            buffer.copy_from_slice(&data[start..start + buffer.len()]);
            Ok(())
        }
        fn total_bytes(&self) -> u64 {
            self.0.borrow().len() as u64
        }
        fn sector_size(&self) -> u32 {
            512
        }
    }

    #[test]
    fn valid_super_blocks_parse() {
        let region = build_super_block_region(2256, 1, 42, 0);
        let block = FixedBlock(RefCell::new(region));
        let info = read_super_blocks(&block, 1 << 20).unwrap();
        assert_eq!(info.sectors_per_cluster, 2256);
        assert_eq!(info.root_dir_cluster, 1);
        assert_eq!(info.used_clusters, 42);
        assert_eq!(info.unused_bytes_in_root, 0);
    }

    #[test]
    fn mismatched_super_blocks_fail() {
        let mut region = build_super_block_region(2256, 1, 42, 0);
        // Flip a single byte in the second (post-swap) sector.
        let last = region.len() - 1;
        region[last] ^= 0xff;
        let block = FixedBlock(RefCell::new(region));
        let err = read_super_blocks(&block, 1 << 20).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::SuperBlocksDiffer)
        ));
    }
}
