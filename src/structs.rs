use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::config::*;
use crate::error::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub block_num: BlockNum,
}

impl DirEntry {
    pub fn new(name: &str, block_num: BlockNum) -> Self {
        Self {
            name: name.into(),
            block_num,
        }
    }
}

/// Directory node: a dense list of entries, at most `MAX_DIR_ENTRIES` long.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirNode {
    pub entries: Vec<DirEntry>,
}

impl DirNode {
    pub fn encode(&self) -> Box<[u8; BLOCK_SIZE]> {
        debug_assert!(self.entries.len() <= MAX_DIR_ENTRIES);
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        buf[0..2].copy_from_slice(&TAG_DIRECTORY.to_le_bytes());
        buf[2..4].copy_from_slice(&(self.entries.len() as u16).to_le_bytes());
        for (i, entry) in self.entries.iter().enumerate() {
            let off = DIR_HEADER_SIZE + i * DIR_ENTRY_SIZE;
            let name = entry.name.as_bytes();
            debug_assert!(name.len() <= MAX_NAME_LENGTH);
            buf[off..off + name.len()].copy_from_slice(name);
            let num_off = off + NAME_FIELD_LEN;
            buf[num_off..num_off + 2].copy_from_slice(&entry.block_num.to_le_bytes());
        }
        buf
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_DIR_ENTRIES
    }
}

/// File metadata: byte size plus the ordered data blocks holding the content.
/// `data_blocks.len()` is always `blocks_for(file_size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    pub file_size: u32,
    pub data_blocks: Vec<BlockNum>,
}

impl Inode {
    pub fn encode(&self) -> Box<[u8; BLOCK_SIZE]> {
        debug_assert_eq!(self.data_blocks.len(), self.num_data_blocks());
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        buf[0..2].copy_from_slice(&TAG_INODE.to_le_bytes());
        buf[4..8].copy_from_slice(&self.file_size.to_le_bytes());
        for (i, num) in self.data_blocks.iter().enumerate() {
            let off = INODE_HEADER_SIZE + i * 2;
            buf[off..off + 2].copy_from_slice(&num.to_le_bytes());
        }
        buf
    }

    pub fn num_data_blocks(&self) -> usize {
        blocks_for(self.file_size as usize)
    }
}

/// A metadata block as stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Directory(DirNode),
    Inode(Inode),
}

impl Block {
    pub fn file_type(&self) -> FileType {
        match self {
            Block::Directory(_) => FileType::Directory,
            Block::Inode(_) => FileType::Regular,
        }
    }

    /// Serializes the block into its on-disk form.
    ///
    /// Layout (little-endian):
    /// - directory: `tag: u16`, `num_entries: u16`, then `num_entries` entries of
    ///   a NUL-padded name field followed by `block_num: u16`.
    /// - inode: `tag: u16`, `reserved: u16`, `file_size: u32`, then one `u16` per data block.
    pub fn encode(&self) -> Box<[u8; BLOCK_SIZE]> {
        match self {
            Block::Directory(dir) => dir.encode(),
            Block::Inode(inode) => inode.encode(),
        }
    }

    /// Parses an on-disk block. `block_num` is only used to label errors.
    pub fn decode(block_num: BlockNum, buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        let corrupted = FsError::Corrupted(block_num);
        match read_u16(buf, 0) {
            TAG_DIRECTORY => {
                let num_entries = read_u16(buf, 2) as usize;
                if num_entries > MAX_DIR_ENTRIES {
                    return Err(corrupted);
                }
                let mut entries = Vec::with_capacity(num_entries);
                for i in 0..num_entries {
                    let off = DIR_HEADER_SIZE + i * DIR_ENTRY_SIZE;
                    let field = &buf[off..off + NAME_FIELD_LEN];
                    let len = field.iter().position(|&c| c == 0).ok_or(corrupted)?;
                    let name = core::str::from_utf8(&field[..len]).map_err(|_| corrupted)?;
                    let num = read_u16(buf, off + NAME_FIELD_LEN);
                    if name.is_empty() || num == NULL_BLOCK {
                        return Err(corrupted);
                    }
                    entries.push(DirEntry::new(name, num));
                }
                Ok(Block::Directory(DirNode { entries }))
            }
            TAG_INODE => {
                let file_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
                if file_size as usize > MAX_FILE_SIZE {
                    return Err(corrupted);
                }
                let count = blocks_for(file_size as usize);
                let mut data_blocks = Vec::with_capacity(count);
                for i in 0..count {
                    let num = read_u16(buf, INODE_HEADER_SIZE + i * 2);
                    if num == NULL_BLOCK {
                        return Err(corrupted);
                    }
                    data_blocks.push(num);
                }
                Ok(Block::Inode(Inode {
                    file_size,
                    data_blocks,
                }))
            }
            _ => Err(corrupted),
        }
    }
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

/// Result of `stat`. Size fields are zero for directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub ftype: FileType,
    pub name: String,
    pub block_num: BlockNum,
    pub file_size: u32,
    pub num_data_blocks: usize,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.ftype == FileType::Directory
    }
}

/// Result of `ls`: names in the current directory, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub directories: Vec<String>,
    pub files: Vec<String>,
}
