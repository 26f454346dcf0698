//! Name lookup and entry bookkeeping inside a single directory node.

use log::{debug, warn};

use crate::config::*;
use crate::error::{FsError, Result};
use crate::node::{write_dir_node, zero_block};
use crate::structs::*;
use crate::BlockDevice;

/// Checks that `name` can be stored in a directory entry.
pub fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(FsError::NameTooLong);
    }
    if name.is_empty() || name.bytes().any(|c| c == 0) {
        return Err(FsError::InvalidName);
    }
    Ok(())
}

/// Returns the index of the entry called `name`, if any.
/// Names are unique within a directory, so there is at most one match.
pub fn dir_lookup(dir: &DirNode, name: &str) -> Option<usize> {
    dir.entries.iter().position(|entry| entry.name == name)
}

/// Appends an entry. The caller has already validated the name, checked for
/// duplicates and made sure the directory is not full.
pub fn dir_add_entry(dir: &mut DirNode, name: &str, block_num: BlockNum) {
    debug_assert!(!dir.is_full());
    debug_assert!(dir_lookup(dir, name).is_none());
    dir.entries.push(DirEntry::new(name, block_num));
}

/// Drops entry `index` from the directory stored at `dir_num` and rewrites it.
/// The last entry takes the removed slot. On a failed write `dir` and the device
/// are left as they were. Returns the removed entry.
pub fn dir_unlink(
    device: &impl BlockDevice,
    dir_num: BlockNum,
    dir: &mut DirNode,
    index: usize,
) -> Result<DirEntry> {
    if index >= dir.num_entries() {
        return Err(FsError::NotExists);
    }
    let mut updated = dir.clone();
    let entry = updated.entries.swap_remove(index);
    write_dir_node(device, dir_num, &updated)?;
    *dir = updated;
    Ok(entry)
}

/// Clears and releases a metadata block that nothing references any more.
/// A failed release leaks the block and reports `Unknown`.
pub fn free_node(device: &impl BlockDevice, block_num: BlockNum) -> Result<()> {
    if let Err(e) = zero_block(device, block_num) {
        warn!("could not clear block {} before release: {}", block_num, e);
    }
    device.release_block(block_num).map_err(|e| {
        warn!("block {} unlinked but not released: {}", block_num, e);
        FsError::Unknown
    })?;
    debug!("released block {}", block_num);
    Ok(())
}

/// Removes entry `index` from the directory stored at `dir_num` and frees the
/// block it referenced.
///
/// The parent is rewritten before anything is released: if that write fails the
/// device is untouched. A release failure afterwards reports `Unknown` and leaks
/// the block rather than leaving a dangling entry.
/// Returns the freed block number.
pub fn dir_rm_entry(
    device: &impl BlockDevice,
    dir_num: BlockNum,
    dir: &mut DirNode,
    index: usize,
) -> Result<BlockNum> {
    let target = dir_unlink(device, dir_num, dir, index)?.block_num;
    free_node(device, target)?;
    Ok(target)
}
