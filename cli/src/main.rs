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

//! `tfhd`: a read-only inspector for Topfield TF5000 PVR FAT24 disks.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tf5000_block::{format_disk_size, parse_disk_size};
use tf5000_block_file::FileBlockSource;
use tf5000_fs::{list_dir, open_path, Disk, Filesystem};

#[derive(Parser)]
#[command(name = "tfhd", about = "Inspect Topfield TF5000 PVR FAT24 disks")]
struct Cli {
    /// Device or disk image to operate on.
    #[arg(short = 'f', long = "file", global = true)]
    device: PathBuf,

    /// Override the probed disk size (e.g. "160G", "1.5T").
    #[arg(short = 's', long = "size", global = true)]
    size: Option<String>,

    /// Disk-map file. Not supported: the sparse-clone recorder and
    /// disk-map dumper this fed are out of scope.
    #[arg(short = 'm', long = "map", global = true)]
    mapfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print disk geometry and filesystem parameters.
    Info,
    /// List a directory.
    Ls {
        #[arg(short = 'l', long = "long")]
        long: bool,
        dir: Option<String>,
    },
    /// Copy a file from the disk to a host-filesystem destination.
    Cp { src: String, dst: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.mapfile.is_some() {
        eprintln!("tfhd: -m/--map (disk-map loading) is not supported");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tfhd: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> tf5000_err::Result<()> {
    let size_override = cli.size.as_deref().map(parse_disk_size);
    let block = FileBlockSource::open(&cli.device, size_override)?;
    let disk = Disk::open(cli.device.to_string_lossy().into_owned(), block);
    let fs = Filesystem::open(&disk)?;

    match cli.command {
        Command::Info => {
            println!("disk:            {}", disk.path());
            println!("block size:      {}", disk.block_size());
            println!("total blocks:    {}", disk.total_blocks());
            println!("blocks/cluster:  {}", fs.blocks_per_cluster());
            println!("used clusters:   {}", fs.used_clusters());
            println!("fat crc32:       0x{:08x}", fs.fat_crc32());
        }
        Command::Ls { long, dir } => {
            let path = dir.unwrap_or_default();
            for entry in list_dir(&fs, &path, long)? {
                let suffix = if entry.is_dir { "/" } else { "" };
                if long {
                    let kind = if entry.is_dir { "d" } else { "-" };
                    println!("{kind} {:>8} {}{suffix}", format_disk_size(entry.size), entry.name);
                } else {
                    println!("{}{suffix}", entry.name);
                }
            }
        }
        Command::Cp { src, dst } => {
            let mut file = open_path(&fs, None, &src)?;
            let mut out = std::fs::File::create(&dst)?;
            while let Some(chunk) = file.read_chunk()? {
                out.write_all(chunk)?;
            }
        }
    }
    Ok(())
}
