use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use crate::config::*;
use crate::directory::{check_name, dir_add_entry, dir_lookup, dir_rm_entry, dir_unlink, free_node};
use crate::error::{FsError, Result};
use crate::file::{fread, fwrite, release_all, release_data_blocks, Reservation};
use crate::node::*;
use crate::structs::*;
use crate::BlockDevice;

/// Current directories of every open session on one mount, with a count per block.
#[derive(Debug, Default)]
struct CwdTable(Mutex<BTreeMap<BlockNum, usize>>);

impl CwdTable {
    fn enter(&self, dir_num: BlockNum) {
        let mut table = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *table.entry(dir_num).or_insert(0) += 1;
    }

    fn leave(&self, dir_num: BlockNum) {
        let mut table = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = table.get_mut(&dir_num) {
            *count -= 1;
            if *count == 0 {
                table.remove(&dir_num);
            }
        }
    }

    fn is_occupied(&self, dir_num: BlockNum) -> bool {
        let table = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        table.contains_key(&dir_num)
    }
}

/// A mounted file system plus one navigation session over it.
///
/// Every name-based operation resolves against the session's current
/// directory. Sessions opened with [`FileSystem::session`] share the device
/// and know each other's current directory, so none of them can remove a
/// directory another one is standing in. Operations run to completion one at
/// a time; callers sharing a device across threads must serialize access
/// themselves.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    cwd: BlockNum,
    cwds: Arc<CwdTable>,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Mounts the device under `name` and starts at the root directory.
    pub fn mount(device: Arc<D>, name: &str) -> Result<Self> {
        device.mount(name)?;
        debug!("mounted {:?}, {} free blocks", name, device.free_blocks());
        let cwds = Arc::new(CwdTable::default());
        cwds.enter(ROOT_BLOCK);
        Ok(Self {
            device,
            cwd: ROOT_BLOCK,
            cwds,
        })
    }

    /// Opens another session over the same mounted device, starting at the root.
    pub fn session(&self) -> Self {
        self.cwds.enter(ROOT_BLOCK);
        Self {
            device: Arc::clone(&self.device),
            cwd: ROOT_BLOCK,
            cwds: Arc::clone(&self.cwds),
        }
    }

    pub fn unmount(self) -> Result<()> {
        self.device.flush()?;
        self.device.unmount()
    }

    /// Creates an empty subdirectory in the current directory.
    pub fn mkdir(&mut self, name: &str) -> Result<()> {
        self.create(name, Block::Directory(DirNode::default()))
    }

    /// Changes the current directory to the named subdirectory, or to the root
    /// when `name` is `None`.
    pub fn chdir(&mut self, name: Option<&str>) -> Result<()> {
        let target = match name {
            None => ROOT_BLOCK,
            Some(name) => {
                let target = self.resolve(name)?.block_num;
                if !is_dir(&*self.device, target)? {
                    return Err(FsError::NotADirectory);
                }
                debug!("chdir {:?}: {} -> {}", name, self.cwd, target);
                target
            }
        };
        self.move_to(target);
        Ok(())
    }

    /// Lists the current directory, split into subdirectories and files.
    pub fn ls(&self) -> Result<Listing> {
        let dir = read_dir_node(&*self.device, self.cwd)?;
        let mut listing = Listing::default();
        for entry in dir.entries {
            if is_dir(&*self.device, entry.block_num)? {
                listing.directories.push(entry.name);
            } else {
                listing.files.push(entry.name);
            }
        }
        Ok(listing)
    }

    /// Removes an empty subdirectory of the current directory.
    pub fn rmdir(&mut self, name: &str) -> Result<()> {
        let mut cur = read_dir_node(&*self.device, self.cwd)?;
        let index = dir_lookup(&cur, name).ok_or(FsError::NotExists)?;
        let target = cur.entries[index].block_num;
        let Block::Directory(dir) = read_node(&*self.device, target)? else {
            return Err(FsError::NotADirectory);
        };
        if dir.num_entries() > 0 {
            return Err(FsError::NotEmpty);
        }
        if self.cwds.is_occupied(target) {
            return Err(FsError::Busy);
        }
        dir_rm_entry(&*self.device, self.cwd, &mut cur, index)?;
        debug!("rmdir {:?} (block {})", name, target);
        Ok(())
    }

    /// Creates an empty file in the current directory.
    pub fn creat(&mut self, name: &str) -> Result<()> {
        self.create(name, Block::Inode(Inode::default()))
    }

    /// Deletes a file and all of its data.
    ///
    /// The entry is unlinked before any block goes back to the device. If the
    /// parent write fails nothing has changed. A failed release afterwards leaks
    /// that block and reports `Unknown`; the file is gone either way.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let mut cur = read_dir_node(&*self.device, self.cwd)?;
        let index = dir_lookup(&cur, name).ok_or(FsError::NotExists)?;
        let target = cur.entries[index].block_num;
        let inode = read_inode(&*self.device, target)?;
        dir_unlink(&*self.device, self.cwd, &mut cur, index)?;
        let data = release_data_blocks(&*self.device, &inode);
        free_node(&*self.device, target).and(data)?;
        debug!(
            "removed {:?} (block {}, {} data blocks)",
            name,
            target,
            inode.num_data_blocks()
        );
        Ok(())
    }

    pub fn stat(&self, name: &str) -> Result<Stat> {
        let entry = self.resolve(name)?;
        let target = entry.block_num;
        let block = read_node(&*self.device, target)?;
        let (file_size, num_data_blocks) = match &block {
            Block::Inode(inode) => (inode.file_size, inode.num_data_blocks()),
            Block::Directory(_) => (0, 0),
        };
        Ok(Stat {
            ftype: block.file_type(),
            name: entry.name,
            block_num: target,
            file_size,
            num_data_blocks,
        })
    }

    /// Appends `data` to the end of the named file.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(name)?.block_num;
        let mut inode = read_inode(&*self.device, target)?;
        if inode.file_size as usize + data.len() > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }

        let old_blocks = inode.data_blocks.len();
        fwrite(&*self.device, &mut inode, data)?;
        if let Err(e) = write_inode(&*self.device, target, &inode) {
            warn!("inode {} not updated after append: {}", target, e);
            release_all(&*self.device, &inode.data_blocks[old_blocks..]);
            return Err(FsError::Unknown);
        }
        Ok(())
    }

    /// Reads the named file from its start into `buf`.
    /// Returns the number of bytes copied, at most `buf.len()` and the file size.
    pub fn read(&self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let target = self.resolve(name)?.block_num;
        let inode = read_inode(&*self.device, target)?;
        fread(&*self.device, &inode, buf)
    }

    /// Renders the whole tree below the root, one entry per line.
    pub fn tree(&self) -> Result<String> {
        let mut out = String::from("/\n");
        self.tree_at(ROOT_BLOCK, 1, &mut out)?;
        Ok(out)
    }

    pub fn current_dir(&self) -> BlockNum {
        self.cwd
    }

    pub fn free_blocks(&self) -> usize {
        self.device.free_blocks()
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }

    fn move_to(&mut self, dir_num: BlockNum) {
        if dir_num != self.cwd {
            self.cwds.enter(dir_num);
            self.cwds.leave(self.cwd);
            self.cwd = dir_num;
        }
    }

    /// Looks `name` up in the current directory.
    fn resolve(&self, name: &str) -> Result<DirEntry> {
        let mut cur = read_dir_node(&*self.device, self.cwd)?;
        let index = dir_lookup(&cur, name).ok_or(FsError::NotExists)?;
        Ok(cur.entries.swap_remove(index))
    }

    /// Shared body of `mkdir` and `creat`: allocate, initialize, link.
    fn create(&mut self, name: &str, block: Block) -> Result<()> {
        check_name(name)?;
        let mut cur = read_dir_node(&*self.device, self.cwd)?;
        if cur.is_full() {
            return Err(FsError::DirectoryFull);
        }
        if dir_lookup(&cur, name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let mut fresh = Reservation::new(&*self.device);
        fresh.reserve(1)?;
        let block_num = fresh.blocks()[0];
        write_node(&*self.device, block_num, &block).map_err(|e| {
            warn!("could not initialize block {}: {}", block_num, e);
            FsError::Unknown
        })?;

        dir_add_entry(&mut cur, name, block_num);
        write_dir_node(&*self.device, self.cwd, &cur).map_err(|e| {
            warn!("could not link {:?} into directory {}: {}", name, self.cwd, e);
            FsError::Unknown
        })?;
        fresh.commit();

        debug!(
            "created {:?} {:?} at block {} in {}",
            block.file_type(),
            name,
            block_num,
            self.cwd
        );
        Ok(())
    }

    fn tree_at(&self, dir_num: BlockNum, depth: usize, out: &mut String) -> Result<()> {
        let dir = read_dir_node(&*self.device, dir_num)?;
        let mut entries: Vec<DirEntry> = dir.entries;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        for entry in entries {
            let indent = "  ".repeat(depth);
            match read_node(&*self.device, entry.block_num)? {
                Block::Directory(_) => {
                    out.push_str(&format!("{}{}/\n", indent, entry.name));
                    self.tree_at(entry.block_num, depth + 1, out)?;
                }
                Block::Inode(inode) => {
                    out.push_str(&format!("{}{} ({} bytes)\n", indent, entry.name, inode.file_size));
                }
            }
        }
        Ok(())
    }
}

impl<D: BlockDevice> Drop for FileSystem<D> {
    fn drop(&mut self) {
        self.cwds.leave(self.cwd);
    }
}
