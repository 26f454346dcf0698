//! Jumbo is a minimal hierarchical file system layered on a fixed-size block device.
//! No paths, permissions, timestamps, links or journaling: every operation works on a
//! single name inside the session's current directory.
//!
//! Every block the file system owns is one of:
//! - Directory node: up to `MAX_DIR_ENTRIES` (name, block) entries
//! - Inode: file size plus the ordered list of its data blocks
//! - Data block: raw file bytes, referenced by exactly one inode
//!
//! Jumbo's layers (from bottom to top):
//! 1. Block Device: allocation and block I/O.       User implemented, `RamDisk` provided
//! 2. Node: typed encode/decode of metadata blocks.  Fs implemented
//! 3. Directory: name lookup and entry bookkeeping.  Fs implemented
//! 4. File: data block growth, reads and release.    Fs implemented
//! 5. FileSystem: the public operations + session.   Fs implemented

extern crate alloc;

mod config;
mod error;
mod block_dev;
mod bitmap;
mod ram_disk;
mod structs;
mod node;
mod directory;
mod file;
mod fs;

pub use block_dev::BlockDevice;
pub use config::*;
pub use ram_disk::RamDisk;
pub use structs::*;
pub use node::{is_dir, read_node, write_node};
pub use directory::{check_name, dir_lookup};
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
