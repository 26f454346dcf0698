use thiserror::Error;

use crate::config::{BlockNum, MAX_DIR_ENTRIES, MAX_FILE_SIZE, MAX_NAME_LENGTH};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("an entry with that name already exists")]
    AlreadyExists,
    #[error("name is longer than {max} bytes", max = MAX_NAME_LENGTH)]
    NameTooLong,
    #[error("name is empty or contains a NUL byte")]
    InvalidName,
    #[error("directory already holds {max} entries", max = MAX_DIR_ENTRIES)]
    DirectoryFull,
    #[error("no free blocks left on the device")]
    DiskFull,
    #[error("no such file or directory")]
    NotExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    NotEmpty,
    #[error("directory is the current directory of an open session")]
    Busy,
    #[error("file would grow past {max} bytes", max = MAX_FILE_SIZE)]
    FileTooLarge,
    #[error("block device I/O error")]
    IoError,
    #[error("block {0} is out of range for this device")]
    InvalidBlock(BlockNum),
    #[error("a device of {0} blocks is outside the supported range")]
    InvalidDeviceSize(usize),
    #[error("device is not mounted")]
    NotMounted,
    #[error("device is already mounted")]
    AlreadyMounted,
    #[error("block {0} does not hold a valid directory node or inode")]
    Corrupted(BlockNum),
    #[error("metadata update failed after data was written")]
    Unknown,
}

impl FsError {
    /// Whether the error came from the storage layer rather than from validation.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            FsError::IoError
                | FsError::InvalidBlock(_)
                | FsError::InvalidDeviceSize(_)
                | FsError::NotMounted
                | FsError::AlreadyMounted
                | FsError::Corrupted(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
