//! Common utilities for tests
#![allow(unused)]

use std::sync::{Arc, Mutex};

use jumbo::{BlockDevice, BlockNum, Error, FileSystem, RamDisk, Result, BLOCK_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Knobs for [`Faulty`]. Everything off by default.
#[derive(Debug, Default)]
pub struct Faults {
    /// Writes to this block fail.
    pub bad_block: Option<BlockNum>,
    /// Number of writes that still succeed before every write fails.
    pub writes_left: Option<usize>,
    /// Every release fails.
    pub fail_release: bool,
    /// Number of releases that still succeed before every release fails.
    pub releases_left: Option<usize>,
}

/// Block device wrapper that injects failures into an inner device.
pub struct Faulty<D: BlockDevice> {
    device: D,
    faults: Mutex<Faults>,
}

impl<D: BlockDevice> Faulty<D> {
    pub fn new(device: D) -> Self {
        Faulty {
            device,
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn set(&self, f: impl FnOnce(&mut Faults)) {
        f(&mut self.faults.lock().unwrap());
    }

    pub fn clear(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }
}

impl<D: BlockDevice> BlockDevice for Faulty<D> {
    fn mount(&self, name: &str) -> Result<()> {
        self.device.mount(name)
    }

    fn unmount(&self) -> Result<()> {
        self.device.unmount()
    }

    fn read_block(&self, block_num: BlockNum, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.device.read_block(block_num, buf)
    }

    fn write_block(&self, block_num: BlockNum, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        {
            let mut faults = self.faults.lock().unwrap();
            if faults.bad_block == Some(block_num) {
                return Err(Error::IoError);
            }
            match faults.writes_left {
                Some(0) => return Err(Error::IoError),
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        self.device.write_block(block_num, buf)
    }

    fn allocate_block(&self) -> Option<BlockNum> {
        self.device.allocate_block()
    }

    fn release_block(&self, block_num: BlockNum) -> Result<()> {
        {
            let mut faults = self.faults.lock().unwrap();
            if faults.fail_release {
                return Err(Error::IoError);
            }
            match faults.releases_left {
                Some(0) => return Err(Error::IoError),
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        self.device.release_block(block_num)
    }

    fn num_blocks(&self) -> usize {
        self.device.num_blocks()
    }

    fn free_blocks(&self) -> usize {
        self.device.free_blocks()
    }
}

/// Mounts a fresh RamDisk of `num_blocks` blocks.
pub fn mounted(num_blocks: usize) -> FileSystem<RamDisk> {
    FileSystem::mount(Arc::new(RamDisk::new(num_blocks)), "DISK").unwrap()
}

/// Mounts a fresh RamDisk wrapped in a fault injector.
pub fn mounted_faulty(num_blocks: usize) -> (FileSystem<Faulty<RamDisk>>, Arc<Faulty<RamDisk>>) {
    let disk = Arc::new(Faulty::new(RamDisk::new(num_blocks)));
    let fs = FileSystem::mount(Arc::clone(&disk), "DISK").unwrap();
    (fs, disk)
}

/// Directory and file names of the current directory, sorted.
pub fn sorted_ls<D: BlockDevice>(fs: &FileSystem<D>) -> (Vec<String>, Vec<String>) {
    let mut listing = fs.ls().unwrap();
    listing.directories.sort();
    listing.files.sort();
    (listing.directories, listing.files)
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
