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

//! The `BlockSource` capability: a positioned-read view of a device or disk
//! image, plus the disk-size string grammar (`1.5T`, `160G`, ...) used by
//! the `tfhd` CLI's `-s SIZE` override and by `ls -l`'s human-readable
//! sizes.

use tf5000_err::Result;

/// A source of positioned byte reads, reporting total size and sector
/// size. Implemented by `tf5000_block_file` (plain files/images) and
/// `tf5000_block_linux` (raw block devices via ioctl).
pub trait BlockSource {
    /// Read `buffer.len()` bytes starting at `offset`. Short reads are an
    /// error: callers rely on exactly `buffer.len()` bytes being filled.
    fn read_at(&self, offset: u64, buffer: &mut [u8]) -> Result<()>;

    /// Total size of the underlying device or image, in bytes.
    fn total_bytes(&self) -> u64;

    /// Sector size in bytes (512 by default, overridden by ioctl on raw
    /// Linux block devices).
    fn sector_size(&self) -> u32;

    /// Total size in whole sectors, per `sector_size()`.
    fn total_blocks(&self) -> u64 {
        self.total_bytes() / self.sector_size() as u64
    }
}

const PREFIX_FACTORS: &[(&str, f64)] = &[
    ("k", 1_000.0),
    ("M", 1_000_000.0),
    ("G", 1_000_000_000.0),
    ("T", 1_000_000_000_000.0),
];

/// Parse a disk size string: a decimal number with an optional `k`/`M`/`G`/`T`
/// suffix multiplying by 10^3/10^6/10^9/10^12. Returns 0 on malformed input,
/// matching `parse_disk_size`'s "no exceptions, just best effort" behavior.
pub fn parse_disk_size(size: &str) -> u64 {
    let size = size.trim();
    let split_at = size
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(size.len());
    let (digits, suffix) = size.split_at(split_at);
    let Ok(value) = digits.parse::<f64>() else {
        return 0;
    };
    let factor = PREFIX_FACTORS
        .iter()
        .find(|(prefix, _)| *prefix == suffix)
        .map(|(_, factor)| *factor)
        .unwrap_or(1.0);
    (value * factor) as u64
}

/// Format a byte count as a short human-readable size, picking the largest
/// `k`/`M`/`G`/`T` prefix that keeps the mantissa under 1000, matching
/// `format_disk_size`.
pub fn format_disk_size(size: u64) -> String {
    let mut value = size as f64;
    let mut prefix_index = None;
    for (index, _) in PREFIX_FACTORS.iter().enumerate() {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        prefix_index = Some(index);
    }
    match prefix_index {
        Some(index) => format!("{}{}", format_mantissa(value), PREFIX_FACTORS[index].0),
        None => format_mantissa(value),
    }
}

fn format_mantissa(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as u64)
    } else {
        let s = format!("{value:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_suffixes() {
        assert_eq!(parse_disk_size("1.5T"), 1_500_000_000_000);
        assert_eq!(parse_disk_size("160G"), 160_000_000_000);
        assert_eq!(parse_disk_size("512"), 512);
    }

    #[test]
    fn parse_malformed_is_zero() {
        assert_eq!(parse_disk_size("not-a-size"), 0);
    }

    #[test]
    fn format_round_trips_common_sizes() {
        assert_eq!(format_disk_size(20), "20");
        assert_eq!(format_disk_size(1_500_000_000_000), "1.5T");
        assert_eq!(format_disk_size(160_000_000_000), "160G");
    }
}
