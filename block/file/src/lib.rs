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

//! `BlockSource` backed by a plain file: a disk image, or (on platforms
//! without a dedicated ioctl-based backend) a raw device node opened
//! through the ordinary `File` positioned-read API.

use std::{fs::File, path::Path};

use tf5000_block::BlockSource;
use tf5000_err::Result;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Default sector size assumed for plain files (per spec: 512 bytes unless
/// overridden).
const DEFAULT_SECTOR_SIZE: u32 = 512;

pub struct FileBlockSource {
    file: File,
    total_bytes: u64,
    sector_size: u32,
}

impl FileBlockSource {
    /// Open `path`, using the file's own length as the total size unless
    /// `size_override` is given (mirrors `tfhd -s SIZE`).
    pub fn open(path: impl AsRef<Path>, size_override: Option<u64>) -> Result<Self> {
        let file = File::open(path)?;
        let total_bytes = match size_override {
            Some(size) => size,
            None => file.metadata()?.len(),
        };
        Ok(Self {
            file,
            total_bytes,
            sector_size: DEFAULT_SECTOR_SIZE,
        })
    }
}

impl BlockSource for FileBlockSource {
    fn read_at(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buffer, offset)?;
        Ok(())
    }

    fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_at_offset() {
        let mut tmp = tempfile_in_cwd();
        tmp.write_all(&[0u8; 16]).unwrap();
        tmp.write_all(b"abcd").unwrap();
        let path = tmp_path();
        let src = FileBlockSource::open(&path, None).unwrap();
        let mut buf = [0u8; 4];
        src.read_at(16, &mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn size_override_wins_over_metadata() {
        let mut tmp = tempfile_in_cwd();
        tmp.write_all(&[0u8; 4]).unwrap();
        let path = tmp_path();
        let src = FileBlockSource::open(&path, Some(1 << 30)).unwrap();
        assert_eq!(src.total_bytes(), 1 << 30);
        std::fs::remove_file(&path).unwrap();
    }

    fn tmp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "tf5000_block_file_test_{:?}",
            std::thread::current().id()
        ))
    }

    fn tempfile_in_cwd() -> File {
        let path = tmp_path();
        File::create(path).unwrap()
    }
}
