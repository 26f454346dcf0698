//! File content: growing an inode's data blocks, reading them back and
//! releasing them.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::Inode;
use crate::BlockDevice;

/// Blocks allocated during one operation.
/// Dropping an uncommitted reservation releases every block it holds.
pub(crate) struct Reservation<'a, D: BlockDevice> {
    device: &'a D,
    blocks: Vec<BlockNum>,
}

impl<'a, D: BlockDevice> Reservation<'a, D> {
    pub fn new(device: &'a D) -> Self {
        Reservation {
            device,
            blocks: Vec::new(),
        }
    }

    /// Allocates `count` more blocks, failing with `DiskFull` when the device runs out.
    pub fn reserve(&mut self, count: usize) -> Result<()> {
        self.blocks.reserve(count);
        for _ in 0..count {
            let block_num = self.device.allocate_block().ok_or(FsError::DiskFull)?;
            self.blocks.push(block_num);
        }
        Ok(())
    }

    pub fn blocks(&self) -> &[BlockNum] {
        &self.blocks
    }

    /// Keeps the blocks; the caller now owns them.
    pub fn commit(mut self) -> Vec<BlockNum> {
        core::mem::take(&mut self.blocks)
    }
}

impl<D: BlockDevice> Drop for Reservation<'_, D> {
    fn drop(&mut self) {
        if self.blocks.is_empty() {
            return;
        }
        debug!("rolling back {} allocated blocks", self.blocks.len());
        release_all(self.device, &self.blocks);
    }
}

/// Best-effort release of every block in `blocks`.
/// Failures are logged and skipped so the remaining blocks still go back.
/// Returns the number of blocks that could not be released.
pub fn release_all(device: &impl BlockDevice, blocks: &[BlockNum]) -> usize {
    let mut failed = 0;
    for &block_num in blocks {
        if let Err(e) = device.release_block(block_num) {
            warn!("failed to release block {}: {}", block_num, e);
            failed += 1;
        }
    }
    failed
}

/// Releases every data block of an inode that is no longer linked anywhere.
/// Keeps going past failures; if any block leaked the result is `Unknown`.
pub fn release_data_blocks(device: &impl BlockDevice, inode: &Inode) -> Result<()> {
    match release_all(device, &inode.data_blocks[..inode.num_data_blocks()]) {
        0 => Ok(()),
        leaked => {
            warn!("{} data blocks leaked", leaked);
            Err(FsError::Unknown)
        }
    }
}

/// Reads from the start of the file into `buffer`.
/// Returns the number of bytes copied: `min(buffer.len(), file_size)`.
pub fn fread(device: &impl BlockDevice, inode: &Inode, buffer: &mut [u8]) -> Result<usize> {
    let count = buffer.len().min(inode.file_size as usize);
    let mut block_buf = Box::new([0u8; BLOCK_SIZE]);

    for (chunk, &block_num) in buffer[..count].chunks_mut(BLOCK_SIZE).zip(&inode.data_blocks) {
        device.read_block(block_num, &mut block_buf)?;
        chunk.copy_from_slice(&block_buf[..chunk.len()]);
    }

    Ok(count)
}

/// Appends `payload` to the end of the file.
///
/// All new blocks are allocated before any data moves; running out part way
/// gives them all back and fails with `DiskFull`. The spare tail of the current
/// last block is filled first, then each new block in order. `inode` is only
/// updated once every data block has been written, so on failure it still
/// describes the file as it was. Persisting the inode itself is left to the caller.
pub fn fwrite(device: &impl BlockDevice, inode: &mut Inode, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }

    let cur_size = inode.file_size as usize;
    let cur_blocks = inode.num_data_blocks();
    let cur_capacity = cur_blocks * BLOCK_SIZE;
    let new_size = cur_size + payload.len();
    if new_size > MAX_FILE_SIZE {
        return Err(FsError::FileTooLarge);
    }
    let extra = blocks_for(new_size) - cur_blocks;

    let mut fresh = Reservation::new(device);
    fresh.reserve(extra)?;

    // Spare room in the current last block.
    let mut copied = 0;
    let mut tail = None;
    if cur_size < cur_capacity {
        let last = inode.data_blocks[cur_blocks - 1];
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        device.read_block(last, &mut buf)?;
        let from = cur_size % BLOCK_SIZE;
        copied = (BLOCK_SIZE - from).min(payload.len());
        buf[from..from + copied].copy_from_slice(&payload[..copied]);
        tail = Some((last, buf));
    }

    // Fresh blocks are written whole, so bytes past the end of the file are zero.
    let new_bufs: Vec<Box<[u8; BLOCK_SIZE]>> = payload[copied..]
        .chunks(BLOCK_SIZE)
        .map(|chunk| {
            let mut buf = Box::new([0u8; BLOCK_SIZE]);
            buf[..chunk.len()].copy_from_slice(chunk);
            buf
        })
        .collect();
    debug_assert_eq!(new_bufs.len(), extra);

    if let Some((last, buf)) = &tail {
        device.write_block(*last, buf)?;
    }
    for (&block_num, buf) in fresh.blocks().iter().zip(&new_bufs) {
        device.write_block(block_num, buf)?;
    }

    inode.file_size = new_size as u32;
    inode.data_blocks.extend(fresh.commit());
    debug!(
        "appended {} bytes: size {} -> {}, {} new blocks",
        payload.len(),
        cur_size,
        new_size,
        extra
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::RamDisk;

    fn disk(num_blocks: usize) -> RamDisk {
        let rd = RamDisk::new(num_blocks);
        rd.mount("DISK").unwrap();
        rd
    }

    fn contents(rd: &RamDisk, inode: &Inode) -> Vec<u8> {
        let mut buf = vec![0u8; inode.file_size as usize];
        let n = fread(rd, inode, &mut buf).unwrap();
        assert_eq!(n, buf.len());
        buf
    }

    #[test]
    fn test_fill_tail_then_new_blocks() {
        let rd = disk(16);
        let mut inode = Inode::default();
        fwrite(&rd, &mut inode, &[1u8; 100]).unwrap();
        assert_eq!(inode.data_blocks.len(), 1);
        let first = inode.data_blocks[0];

        fwrite(&rd, &mut inode, &[2u8; BLOCK_SIZE]).unwrap();
        assert_eq!(inode.file_size as usize, BLOCK_SIZE + 100);
        assert_eq!(inode.data_blocks.len(), 2);
        assert_eq!(inode.data_blocks[0], first);

        let data = contents(&rd, &inode);
        assert!(data[..100].iter().all(|&b| b == 1));
        assert!(data[100..].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_exact_block_boundary() {
        let rd = disk(16);
        let mut inode = Inode::default();
        fwrite(&rd, &mut inode, &[7u8; BLOCK_SIZE]).unwrap();
        assert_eq!(inode.data_blocks.len(), 1);
        // A full last block has no spare room; the next byte needs a new block.
        fwrite(&rd, &mut inode, b"x").unwrap();
        assert_eq!(inode.data_blocks.len(), 2);
        assert_eq!(contents(&rd, &inode)[BLOCK_SIZE], b'x');
    }

    #[test]
    fn test_new_block_tail_is_zeroed() {
        let rd = disk(16);
        // Dirty a block, free it, and make sure it comes back clean past the data.
        let dirty = rd.allocate_block().unwrap();
        rd.write_block(dirty, &[0xAA; BLOCK_SIZE]).unwrap();
        rd.release_block(dirty).unwrap();

        let mut inode = Inode::default();
        fwrite(&rd, &mut inode, b"abc").unwrap();
        assert_eq!(inode.data_blocks, vec![dirty]);
        let mut raw = [0u8; BLOCK_SIZE];
        rd.read_block(dirty, &mut raw).unwrap();
        assert_eq!(&raw[..3], b"abc");
        assert!(raw[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_disk_full_rolls_back() {
        // Blocks 0 and 1 are reserved, leaving 3 for data.
        let rd = disk(5);
        let mut inode = Inode::default();
        fwrite(&rd, &mut inode, &[1u8; 10]).unwrap();
        let before = inode.clone();
        let free = rd.free_blocks();

        let result = fwrite(&rd, &mut inode, &vec![2u8; BLOCK_SIZE * 3]);
        assert_eq!(result, Err(FsError::DiskFull));
        assert_eq!(inode, before);
        assert_eq!(rd.free_blocks(), free);
        assert_eq!(contents(&rd, &inode), vec![1u8; 10]);
    }

    #[test]
    fn test_read_is_bounded() {
        let rd = disk(16);
        let mut inode = Inode::default();
        fwrite(&rd, &mut inode, b"hello world").unwrap();

        let mut small = [0u8; 5];
        assert_eq!(fread(&rd, &inode, &mut small).unwrap(), 5);
        assert_eq!(&small, b"hello");

        let mut large = [0u8; 64];
        assert_eq!(fread(&rd, &inode, &mut large).unwrap(), 11);
        assert_eq!(&large[..11], b"hello world");
    }

    #[test]
    fn test_release_data_blocks() {
        let rd = disk(16);
        let free = rd.free_blocks();
        let mut inode = Inode::default();
        fwrite(&rd, &mut inode, &vec![3u8; BLOCK_SIZE * 2 + 1]).unwrap();
        assert_eq!(rd.free_blocks(), free - 3);
        release_data_blocks(&rd, &inode).unwrap();
        assert_eq!(rd.free_blocks(), free);
    }

    #[test]
    fn test_reservation_drop_releases() {
        let rd = disk(8);
        let free = rd.free_blocks();
        {
            let mut res = Reservation::new(&rd);
            res.reserve(3).unwrap();
            assert_eq!(rd.free_blocks(), free - 3);
        }
        assert_eq!(rd.free_blocks(), free);

        let mut res = Reservation::new(&rd);
        res.reserve(2).unwrap();
        let kept = res.commit();
        assert_eq!(kept.len(), 2);
        assert_eq!(rd.free_blocks(), free - 2);
    }
}
