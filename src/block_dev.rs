use alloc::sync::Arc;

use crate::config::{BlockNum, BLOCK_SIZE};
use crate::error::Result;

/// Fixed-size block storage the file system is layered on.
///
/// Block `0` is never valid and block `ROOT_BLOCK` is allocated and holds the
/// root directory as soon as the device is mounted.
pub trait BlockDevice: Send + Sync {
    /// Makes the named device image accessible.
    fn mount(&self, name: &str) -> Result<()>;

    /// Makes the device inaccessible until it is mounted again.
    fn unmount(&self) -> Result<()>;

    /// Reads a block of data from the block device.
    fn read_block(&self, block_num: BlockNum, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes a block of data to the block device.
    fn write_block(&self, block_num: BlockNum, buf: &[u8; BLOCK_SIZE]) -> Result<()>;

    /// Hands out a free block, or `None` once the device is exhausted.
    /// The block's previous contents are not cleared.
    fn allocate_block(&self) -> Option<BlockNum>;

    /// Returns a block to the free pool.
    fn release_block(&self, block_num: BlockNum) -> Result<()>;

    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Returns the number of blocks still available to `allocate_block`.
    fn free_blocks(&self) -> usize;

    /// Flushes any cached data to the block device.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for Arc<T> {
    fn mount(&self, name: &str) -> Result<()> {
        (**self).mount(name)
    }

    fn unmount(&self) -> Result<()> {
        (**self).unmount()
    }

    fn read_block(&self, block_num: BlockNum, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        (**self).read_block(block_num, buf)
    }

    fn write_block(&self, block_num: BlockNum, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        (**self).write_block(block_num, buf)
    }

    fn allocate_block(&self) -> Option<BlockNum> {
        (**self).allocate_block()
    }

    fn release_block(&self, block_num: BlockNum) -> Result<()> {
        (**self).release_block(block_num)
    }

    fn num_blocks(&self) -> usize {
        (**self).num_blocks()
    }

    fn free_blocks(&self) -> usize {
        (**self).free_blocks()
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}
