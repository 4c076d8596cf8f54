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

//! Cluster geometry derivation.
//!
//! A cluster is an integer number of 188-block "chunks" (188 blocks being
//! four times 47 blocks, the smallest block count holding a whole number
//! of 188-byte MPEG-TS packets: 47 * 512 = 128 * 188). The FAT has a fixed
//! 131072 entries, so the cluster size must grow with disk size to cover
//! the whole device.

pub const CHUNK_BLOCKS: u64 = 188;
pub const FAT_ENTRIES: u64 = 131072;
pub const MIN_CHUNKS_PER_FAT: u64 = 11;

/// Derive blocks-per-cluster from the total block count of the device.
pub fn blocks_per_cluster(total_blocks: u64) -> u32 {
    let chunks_per_fat = total_blocks
        .div_ceil(FAT_ENTRIES * CHUNK_BLOCKS)
        .max(MIN_CHUNKS_PER_FAT);
    (chunks_per_fat * CHUNK_BLOCKS) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_minimum_for_small_disks() {
        assert_eq!(blocks_per_cluster(0), (MIN_CHUNKS_PER_FAT * CHUNK_BLOCKS) as u32);
        assert_eq!(
            blocks_per_cluster(11 * 188 * 131072 - 1),
            (MIN_CHUNKS_PER_FAT * CHUNK_BLOCKS) as u32
        );
    }

    #[test]
    fn grows_for_larger_disks() {
        // One block past the minimum's capacity needs a 12th chunk.
        let boundary = MIN_CHUNKS_PER_FAT * CHUNK_BLOCKS * FAT_ENTRIES;
        assert_eq!(blocks_per_cluster(boundary + 1), 12 * CHUNK_BLOCKS as u32);
    }
}
