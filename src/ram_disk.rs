//! In-memory block device.
//! Keeps every block in a single heap buffer and tracks allocation with a [`Bitmap`].

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use std::sync::Mutex;

use log::{debug, trace};

use crate::bitmap::Bitmap;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::BlockDevice;

struct Inner {
    data: Vec<u8>,
    bitmap: Bitmap,
    mounted: Option<String>,
}

pub struct RamDisk {
    inner: Mutex<Inner>,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a zero-filled disk of `num_blocks` blocks.
    /// Block 0 and the root block are reserved up front.
    ///
    /// # Panics
    /// If `num_blocks` is outside `ROOT_BLOCK + 1..=BlockNum::MAX + 1`; see [`RamDisk::try_new`].
    pub fn new(num_blocks: usize) -> Self {
        match Self::try_new(num_blocks) {
            Ok(disk) => disk,
            Err(e) => panic!("{}", e),
        }
    }

    /// Like [`RamDisk::new`], but rejects an unsupported size with `InvalidDeviceSize`.
    pub fn try_new(num_blocks: usize) -> Result<Self> {
        if num_blocks <= ROOT_BLOCK as usize || num_blocks > BlockNum::MAX as usize + 1 {
            return Err(FsError::InvalidDeviceSize(num_blocks));
        }
        let mut bitmap = Bitmap::new(num_blocks);
        bitmap.set_at(NULL_BLOCK as usize, true);
        bitmap.set_at(ROOT_BLOCK as usize, true);
        Ok(RamDisk {
            inner: Mutex::new(Inner {
                data: vec![0u8; num_blocks * BLOCK_SIZE],
                bitmap,
                mounted: None,
            }),
            num_blocks,
        })
    }

    /// Name the disk is currently mounted under.
    pub fn label(&self) -> Option<String> {
        self.lock().ok()?.mounted.clone()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| FsError::IoError)
    }

    fn check_range(&self, block_num: BlockNum) -> Result<usize> {
        if block_num == NULL_BLOCK || block_num as usize >= self.num_blocks {
            return Err(FsError::InvalidBlock(block_num));
        }
        Ok(block_num as usize * BLOCK_SIZE)
    }
}

impl BlockDevice for RamDisk {
    fn mount(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.mounted.is_some() {
            return Err(FsError::AlreadyMounted);
        }
        debug!("ram disk mounted as {:?}", name);
        inner.mounted = Some(name.into());
        Ok(())
    }

    fn unmount(&self) -> Result<()> {
        let mut inner = self.lock()?;
        match inner.mounted.take() {
            Some(name) => {
                debug!("ram disk {:?} unmounted", name);
                Ok(())
            }
            None => Err(FsError::NotMounted),
        }
    }

    fn read_block(&self, block_num: BlockNum, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        let start = self.check_range(block_num)?;
        let inner = self.lock()?;
        if inner.mounted.is_none() {
            return Err(FsError::NotMounted);
        }
        buf.copy_from_slice(&inner.data[start..start + BLOCK_SIZE]);
        trace!("read block {}", block_num);
        Ok(())
    }

    fn write_block(&self, block_num: BlockNum, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        let start = self.check_range(block_num)?;
        let mut inner = self.lock()?;
        if inner.mounted.is_none() {
            return Err(FsError::NotMounted);
        }
        inner.data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        trace!("wrote block {}", block_num);
        Ok(())
    }

    fn allocate_block(&self) -> Option<BlockNum> {
        let mut inner = self.lock().ok()?;
        inner.mounted.as_ref()?;
        let item = inner.bitmap.set_first_fit()?;
        // Bounded by `num_blocks`, which fits in a BlockNum.
        Some(item as BlockNum)
    }

    fn release_block(&self, block_num: BlockNum) -> Result<()> {
        self.check_range(block_num)?;
        if block_num == ROOT_BLOCK {
            return Err(FsError::InvalidBlock(block_num));
        }
        let mut inner = self.lock()?;
        if inner.mounted.is_none() {
            return Err(FsError::NotMounted);
        }
        match inner.bitmap.set_at(block_num as usize, false) {
            Some(true) => Ok(()),
            // Double release
            _ => Err(FsError::InvalidBlock(block_num)),
        }
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn free_blocks(&self) -> usize {
        self.lock().map(|inner| inner.bitmap.free()).unwrap_or(0)
    }
}
