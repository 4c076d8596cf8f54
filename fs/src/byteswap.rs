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

//! Byte-swapped block I/O.
//!
//! The disk stores multi-byte fields as big-endian values packed into
//! 32-bit words that are themselves stored byte-reversed. A single
//! word-swap of the raw bytes (reverse each 4-byte group) turns the buffer
//! into ordinary big-endian-on-disk data, which every on-disk record in
//! this crate is defined against.

use tf5000_block::BlockSource;
use tf5000_err::{Error, Result};

/// Reverse the byte order of every 4-byte word in `buf`, in place.
/// An involution: applying it twice restores the original bytes.
pub fn swap_words(buf: &mut [u8]) -> Result<()> {
    if buf.len() % 4 != 0 {
        return Err(Error::Fatal(format!(
            "attempt to read {} bytes which isn't a whole number of 32-bit words",
            buf.len()
        )));
    }
    for word in buf.chunks_exact_mut(4) {
        word.swap(0, 3);
        word.swap(1, 2);
    }
    Ok(())
}

/// Read `buf.len()` bytes from `cluster` at `offset_in_cluster`, then
/// word-swap them in place. `cluster == -1` addresses the super block
/// region at the start of the device. `offset_in_cluster` must lie in
/// `[0, bytes_per_cluster]`; `buf.len()` must be a multiple of 4 — both are
/// programmer errors (bounds violations), surfaced as `Error::Fatal`.
pub fn read(
    block: &dyn BlockSource,
    bytes_per_cluster: u64,
    cluster: i32,
    offset_in_cluster: u64,
    buf: &mut [u8],
) -> Result<()> {
    if cluster < -1 {
        return Err(Error::Fatal(format!("invalid cluster number {cluster}")));
    }
    if offset_in_cluster > bytes_per_cluster {
        return Err(Error::Fatal(format!(
            "invalid offset within cluster {offset_in_cluster}"
        )));
    }

    let absolute = (cluster as i64 + 1) as u64 * bytes_per_cluster + offset_in_cluster;
    block.read_at(absolute, buf)?;
    swap_words(buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_is_an_involution() {
        let original = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut buf = original;
        swap_words(&mut buf).unwrap();
        assert_ne!(buf, original);
        swap_words(&mut buf).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn non_multiple_of_four_is_fatal() {
        let mut buf = [1u8, 2, 3];
        assert!(matches!(swap_words(&mut buf), Err(Error::Fatal(_))));
    }
}
