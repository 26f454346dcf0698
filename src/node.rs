//! Reading and writing metadata blocks through the device.

use alloc::boxed::Box;

use log::trace;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{Block, DirNode, Inode};
use crate::BlockDevice;

pub fn read_node(device: &impl BlockDevice, block_num: BlockNum) -> Result<Block> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(block_num, &mut buf)?;
    let block = Block::decode(block_num, &buf)?;
    trace!("decoded block {} as {:?}", block_num, block.file_type());
    Ok(block)
}

pub fn write_node(device: &impl BlockDevice, block_num: BlockNum, block: &Block) -> Result<()> {
    device.write_block(block_num, &block.encode())
}

pub fn write_dir_node(device: &impl BlockDevice, block_num: BlockNum, dir: &DirNode) -> Result<()> {
    device.write_block(block_num, &dir.encode())
}

pub fn write_inode(device: &impl BlockDevice, block_num: BlockNum, inode: &Inode) -> Result<()> {
    device.write_block(block_num, &inode.encode())
}

pub fn is_dir(device: &impl BlockDevice, block_num: BlockNum) -> Result<bool> {
    Ok(matches!(read_node(device, block_num)?, Block::Directory(_)))
}

/// Reads a block that must be a directory node.
pub fn read_dir_node(device: &impl BlockDevice, block_num: BlockNum) -> Result<DirNode> {
    match read_node(device, block_num)? {
        Block::Directory(dir) => Ok(dir),
        Block::Inode(_) => Err(FsError::NotADirectory),
    }
}

/// Reads a block that must be an inode.
pub fn read_inode(device: &impl BlockDevice, block_num: BlockNum) -> Result<Inode> {
    match read_node(device, block_num)? {
        Block::Inode(inode) => Ok(inode),
        Block::Directory(_) => Err(FsError::IsADirectory),
    }
}

/// Overwrites a block with zeros.
pub fn zero_block(device: &impl BlockDevice, block_num: BlockNum) -> Result<()> {
    device.write_block(block_num, &[0u8; BLOCK_SIZE])
}
