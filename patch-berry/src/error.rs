//! 运行时错误.

use std::path::PathBuf;

use ndarray::ShapeError;
use ndarray_npy::{ReadNpyError, ReadNpzError};
use thiserror::Error;

/// 解析体数据 ([`crate::Volume`]) 时可能出现的错误.
///
/// 只有真正可能在运行时发生的 I/O 问题才会以该类型返回.
/// 数据契约问题 (形状不一致, 空掩码) 一律 panic.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// 读取 nifti 文件错误.
    #[error("failed to read nifti volume: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 读取 npy 文件错误.
    #[error("failed to read npy volume: {0}")]
    Npy(#[from] ReadNpyError),

    /// 读取 npz 归档错误.
    #[error("failed to read npz entry: {0}")]
    Npz(#[from] ReadNpzError),

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 无法识别的文件扩展名.
    #[error("unsupported volume file: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// 堆叠多个体数据时形状不一致.
    #[error("cannot stack volumes: {0}")]
    Stack(#[from] ShapeError),

    /// npz 归档中不存在该条目.
    #[error("entry `{0}` not found in archive")]
    MissingEntry(String),
}

/// 体数据解析结果.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// 打开 [`crate::NpzArchive`] 错误.
#[derive(Debug, Error)]
pub enum OpenArchiveError {
    /// workers 太大. 最多支持 64.
    #[error("too many workers, at most {0} are supported")]
    TooManyWorkers(u32),

    /// 打开 npz 文件错误.
    #[error(transparent)]
    ReadNpzError(#[from] ReadNpzError),

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
