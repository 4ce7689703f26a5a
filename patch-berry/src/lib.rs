#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 为 3D/4D 医学影像 (尤其是纵向多时间点扫描) 的监督学习准备训练样本.
//!
//! 该 crate 负责三件事:
//!
//! 1. 在掩码包围盒内按重叠步长切分固定大小的 patch;
//! 2. 在每个病例的多次扫描之间挑选 (较早, 较晚) 时间点组合;
//! 3. 把长度参差不齐的 "病例 -> patch / 组合" 集合展平成一个可随机访问的序列.
//!
//! 另外提供若干比较预测与真值的损失函数 ([`criterion`]), 它们与寻址部分互相独立.
//!
//! # 注意
//!
//! 1. 所有索引表 (patch 位置, 时间点组合, 前缀和表) 都在数据集构造时一次性算好,
//!   之后只读. 因此数据集可以被多个读取线程共享.
//! 2. 形状不一致, 掩码为空等数据问题会在构造时直接 panic, 不会拖到训练阶段.
//! 3. 越界的扁平索引属于调用方违约, 仅在 debug 模式下检查.
//!
//! # 坐标约定
//!
//! 从 nifti 文件读入的体数据会把轴顺序倒置, 即 `[W, H, z]` -> `[z, H, W]`,
//! 即常见的 `[z, H, W]` 约定. 从 `.npy` 读入的数据保持原样.

/// 体数据. 标量以 `f32` 保存, 维度在运行时确定.
pub type Volume = ndarray::ArrayD<f32>;

/// 体数据的只读视图.
pub type VolumeView<'a> = ndarray::ArrayViewD<'a, f32>;

/// 一个病例内的时间点组合 `(较早, 较晚)`, 保证 `.0 < .1`.
pub type Combo = (usize, usize);

pub mod addressing;
pub mod combo;
pub mod config;
pub mod consts;
pub mod criterion;
pub mod dataset;
mod error;
pub mod geometry;
pub mod mesh;
pub mod prelude;
pub mod volume;

pub use error::{OpenArchiveError, VolumeError, VolumeResult};

pub use addressing::FlatIndex;
pub use combo::ComboMode;
pub use config::{ComboSpec, DatasetConfig, PatchSize, PatchSpec};
pub use geometry::{BoundingBox, PatchPlacement};
pub use volume::{NpzArchive, VolumeProvider, VolumeSource, VolumeStore};
