pub type BlockNum = u16;

pub const BLOCK_SIZE: usize = 4096;
pub const ROOT_BLOCK: BlockNum = 1; // Root directory, pre-allocated by the device
pub const NULL_BLOCK: BlockNum = 0; // Never a valid block

pub const TAG_DIRECTORY: u16 = 0; // Zeroed blocks decode as empty directories
pub const TAG_INODE: u16 = 1;

pub const MAX_NAME_LENGTH: usize = 29;
pub const NAME_FIELD_LEN: usize = MAX_NAME_LENGTH + 1; // Name bytes plus NUL terminator
pub const DIR_ENTRY_SIZE: usize = NAME_FIELD_LEN + 2; // Name + block number
pub const DIR_HEADER_SIZE: usize = 4; // Tag + entry count
pub const MAX_DIR_ENTRIES: usize = (BLOCK_SIZE - DIR_HEADER_SIZE) / DIR_ENTRY_SIZE;

pub const INODE_HEADER_SIZE: usize = 8; // Tag + reserved + file size
pub const MAX_DATA_BLOCKS: usize = (BLOCK_SIZE - INODE_HEADER_SIZE) / 2;
pub const MAX_FILE_SIZE: usize = MAX_DATA_BLOCKS * BLOCK_SIZE;

/// Number of blocks needed to hold `size` bytes.
pub const fn blocks_for(size: usize) -> usize {
    size.div_ceil(BLOCK_SIZE)
}
