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

//! Error taxonomy shared by every `tf5000fs` crate.
//!
//! Mirrors the four classes the original `fs_error`/`fatal`/`fs_warn`
//! helpers distinguished by convention: I/O failures, on-disk format
//! violations, missing paths, and programmer-error bounds violations.
//! Warnings (superblock/geometry mismatch, chain-length disagreement) are
//! not represented here — they are logged via `log::warn!` at the call
//! site and never fail the operation.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("not found: {component}")]
    NotFound { component: String },
    #[error("fatal: {0}")]
    Fatal(String),
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("super block magic 0x{found:08x} != expected 0x07082607")]
    BadMagic { found: u32 },
    #[error("super blocks do not match")]
    SuperBlocksDiffer,
    #[error("super block identifier not recognised")]
    BadIdentifier,
    #[error("unrecognised filesystem version number 0x{found:04x}")]
    BadVersion { found: u16 },
    #[error("unrecognised directory entry type {found:#x}")]
    UnrecognizedEntryType { found: u8 },
    #[error("free cluster found in cluster chain")]
    FreeClusterInChain,
    #[error("fat entry points to cluster {cluster} which is out of range")]
    ClusterOutOfRange { cluster: u32 },
    #[error("more than 131072 clusters in chain: loop in FAT?")]
    ChainCycle,
}

pub type Result<T> = core::result::Result<T, Error>;
