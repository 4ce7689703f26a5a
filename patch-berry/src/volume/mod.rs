//! 体数据来源.
//!
//! 数据集只通过 [`VolumeProvider`] 拿体数据, 并不关心它来自内存还是磁盘.
//! 是否缓存 (`preload`) 是 provider 自己的策略.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use ndarray::{ArrayViewD, Axis};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::consts::{NIFTI_EXTENSIONS, NPY_EXTENSION};
use crate::{Volume, VolumeError, VolumeResult};

pub mod loader;
mod npz;

pub use npz::NpzArchive;

/// 按扩展名从磁盘读取体数据.
///
/// 1. `.nii`, `.nii.gz`: nifti 格式, 轴顺序倒置 (`[W, H, z]` -> `[z, H, W]`);
/// 2. `.npy`: numpy 数组, 轴顺序不变.
///
/// 其他扩展名返回 [`VolumeError::UnsupportedFormat`].
pub fn load_volume<P: AsRef<Path>>(path: P) -> VolumeResult<Volume> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if NIFTI_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        load_nifti(path)
    } else if name.ends_with(NPY_EXTENSION) {
        Ok(ndarray_npy::read_npy(path)?)
    } else {
        Err(VolumeError::UnsupportedFormat(path.to_owned()))
    }
}

fn load_nifti(path: &Path) -> VolumeResult<Volume> {
    let obj = ReaderOptions::new().read_file(path)?;
    let data = obj.into_volume().into_ndarray::<f32>()?.reversed_axes();
    log::debug!("loaded {} with shape {:?}", path.display(), data.shape());
    Ok(data.as_standard_layout().into_owned())
}

/// 体数据来源: 已在内存中的数组, 磁盘路径, 或若干来源的堆叠.
#[derive(Clone, Debug)]
pub enum VolumeSource {
    /// 内存中的数组.
    Array(Volume),

    /// 磁盘路径, 每次解析时读取.
    Path(PathBuf),

    /// 若干来源沿新的首轴堆叠 (例如多通道或多时间点).
    Stack(Vec<VolumeSource>),
}

impl VolumeSource {
    /// 解析为体数据. 内存中的数组以借用返回, 其余情况会重新读取或堆叠.
    pub fn resolve(&self) -> VolumeResult<Cow<'_, Volume>> {
        match self {
            Self::Array(v) => Ok(Cow::Borrowed(v)),
            Self::Path(p) => load_volume(p).map(Cow::Owned),
            Self::Stack(list) => {
                let parts = list
                    .iter()
                    .map(Self::resolve)
                    .collect::<VolumeResult<Vec<_>>>()?;
                let views: Vec<ArrayViewD<f32>> = parts.iter().map(|v| v.view()).collect();
                Ok(Cow::Owned(ndarray::stack(Axis(0), &views)?))
            }
        }
    }

    /// 解析并转换为 [`VolumeSource::Array`].
    pub fn materialize(self) -> VolumeResult<Self> {
        match self {
            Self::Array(_) => Ok(self),
            other => Ok(Self::Array(other.resolve()?.into_owned())),
        }
    }

    /// 是否已在内存中.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl From<Volume> for VolumeSource {
    #[inline]
    fn from(value: Volume) -> Self {
        Self::Array(value)
    }
}

impl From<PathBuf> for VolumeSource {
    #[inline]
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for VolumeSource {
    #[inline]
    fn from(value: &Path) -> Self {
        Self::Path(value.to_owned())
    }
}

impl From<Vec<VolumeSource>> for VolumeSource {
    #[inline]
    fn from(value: Vec<VolumeSource>) -> Self {
        Self::Stack(value)
    }
}

/// 按序号提供体数据的能力.
///
/// 实现者决定缓存策略: 可以总是返回已缓存的数组, 也可以每次调用都重新读取.
pub trait VolumeProvider {
    /// 体数据个数.
    fn len(&self) -> usize;

    /// 是否为空.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取第 `index` 个体数据. `index` 越界时 panic.
    fn resolve(&self, index: usize) -> VolumeResult<Cow<'_, Volume>>;

    /// 获取第 `index` 个体数据的形状.
    fn shape(&self, index: usize) -> VolumeResult<Vec<usize>> {
        Ok(self.resolve(index)?.shape().to_vec())
    }
}

/// 全部缓存在内存中.
impl VolumeProvider for Vec<Volume> {
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    fn resolve(&self, index: usize) -> VolumeResult<Cow<'_, Volume>> {
        Ok(Cow::Borrowed(&self[index]))
    }

    #[inline]
    fn shape(&self, index: usize) -> VolumeResult<Vec<usize>> {
        Ok(self[index].shape().to_vec())
    }
}

/// 由 [`VolumeSource`] 组成的体数据集合.
///
/// 默认惰性: 路径来源在每次 [`VolumeProvider::resolve`] 时重新读取.
/// 以 `preload = true` 构造时, 全部来源在构造阶段解析一次并常驻内存.
#[derive(Clone, Debug, Default)]
pub struct VolumeStore {
    sources: Vec<VolumeSource>,
}

impl VolumeStore {
    /// 构造集合. `preload` 为 `true` 时立即解析全部来源.
    pub fn new<I>(sources: I, preload: bool) -> VolumeResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<VolumeSource>,
    {
        let store = Self {
            sources: sources.into_iter().map(Into::into).collect(),
        };
        if preload {
            store.preload()
        } else {
            Ok(store)
        }
    }

    /// 惰性集合.
    pub fn lazy<I>(sources: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VolumeSource>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// 解析全部来源并常驻内存.
    pub fn preload(self) -> VolumeResult<Self> {
        let sources = self
            .sources
            .into_iter()
            .map(VolumeSource::materialize)
            .collect::<VolumeResult<Vec<_>>>()?;
        log::debug!("preloaded {} volumes", sources.len());
        Ok(Self { sources })
    }

    /// 是否全部来源都已在内存中.
    pub fn is_preloaded(&self) -> bool {
        self.sources.iter().all(VolumeSource::is_loaded)
    }

    /// 全部来源.
    #[inline]
    pub fn sources(&self) -> &[VolumeSource] {
        &self.sources
    }
}

impl VolumeProvider for VolumeStore {
    #[inline]
    fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    fn resolve(&self, index: usize) -> VolumeResult<Cow<'_, Volume>> {
        self.sources[index].resolve()
    }
}

/// 依次解析 `provider` 中的全部体数据.
pub(crate) fn resolve_all<P: VolumeProvider + ?Sized>(
    provider: &P,
) -> VolumeResult<Vec<Cow<'_, Volume>>> {
    (0..provider.len()).map(|i| provider.resolve(i)).collect()
}
