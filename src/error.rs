use thiserror::Error;

/// Config validation failures, detected before any device mutation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum FormatError {
    /// `total_clusters` is zero or above the 28-bit FAT32 ceiling.
    #[error("invalid total clusters count")]
    InvalidTotalClustersCount,
    /// Not a power of two, or below 512.
    #[error("invalid bytes per sector")]
    InvalidBytesPerSector,
    /// Zero, or not a power of two.
    #[error("invalid sectors per cluster")]
    InvalidSectorsPerCluster,
    /// Boot code does not fit in an addressable reserved area.
    #[error("invalid boot code size")]
    InvalidBootCodeSize,
}

/// On-disk state that violates the FAT layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("not a FAT filesystem")]
    NotFAT,
    #[error("boot sector signature mismatch")]
    BootSignature,
    #[error("corrupt cluster chain")]
    BadClusterChain,
    #[error("corrupt directory entry")]
    DirectoryEntry,
    #[error("unexpected end of device")]
    UnexpectedEof,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum OperationError {
    #[error("end of file")]
    EOF,
    #[error("seek position out of range")]
    SeekPosition,
    #[error("no such file or directory")]
    NoSuchFileOrDirectory,
    #[error("not a directory")]
    NotADirectory,
    #[error("not a file")]
    NotAFile,
    #[error("no free cluster available")]
    OutOfSpace,
    #[error("file size limit exceeded")]
    FileSizeLimit,
    #[error("invalid file name")]
    FileName,
}

/// Combined error type of every public operation.
///
/// The three storage-side variants carry the backend's own error types
/// unmodified, so no storage-specific information is erased.
#[derive(Debug, Error)]
pub enum Error<R: core::fmt::Debug, W: core::fmt::Debug, S: core::fmt::Debug> {
    #[error("read error: {0:?}")]
    Read(R),
    #[error("write error: {0:?}")]
    Write(W),
    #[error("seek error: {0:?}")]
    Seek(S),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// `Error` specialized to the error types of one storage capability.
pub type StorageError<S> = Error<
    <S as crate::io::Storage>::ReadError,
    <S as crate::io::Storage>::WriteError,
    <S as crate::io::Storage>::SeekError,
>;
