//! 数据集.
//!
//! 四种数据集都由同样的零件组合而成: 构造时计算 patch 网格 / 时间点组合 /
//! 前缀和表, 访问时把全局索引翻译为 `(病例, 病例内偏移)`, 再按需解析体数据并切片.
//!
//! | 数据集 | 寻址单位 | 用途 |
//! | --- | --- | --- |
//! | [`CroppingDataset`] | patch | 单体数据病例, 训练或推理 |
//! | [`LongitudinalDataset`] | patch | source/target 成对病例 + 病灶 |
//! | [`TimepointCroppingDataset`] | 组合 × patch | 多时间点病例 |
//! | [`TimepointDataset`] | 组合 | 多时间点病例, 整体裁剪到共同包围盒 |
//!
//! 返回的每个数组都在最前面多出一个长度为 1 的 batch 轴. 坐标网格 patch 例外:
//! 它的首轴本身就是通道轴.

use std::path::{Path, PathBuf};

use ndarray::{ArrayD, Axis};

use crate::{VolumeProvider, VolumeResult};

mod cropping;
mod longitudinal;
mod timepoint;
mod timepoint_cropping;

pub use cropping::{CropItem, CroppingDataset};
pub use longitudinal::LongitudinalDataset;
pub use timepoint::TimepointDataset;
pub use timepoint_cropping::TimepointCroppingDataset;

/// 可按索引随机访问的定长样本序列.
pub trait Dataset {
    /// 单个样本的类型.
    type Item;

    /// 样本总数.
    fn len(&self) -> usize;

    /// 是否为空.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取第 `index` 个样本. 调用方须保证 `index < self.len()`.
    ///
    /// 仅当惰性解析体数据失败时返回 `Err`.
    fn get(&self, index: usize) -> VolumeResult<Self::Item>;

    /// 按索引升序迭代全部样本.
    #[inline]
    fn iter(&self) -> DatasetIter<'_, Self>
    where
        Self: Sized,
    {
        DatasetIter {
            dataset: self,
            next: 0,
        }
    }
}

/// [`Dataset::iter`] 返回的迭代器.
#[derive(Debug)]
pub struct DatasetIter<'a, D> {
    dataset: &'a D,
    next: usize,
}

impl<'a, D: Dataset> Iterator for DatasetIter<'a, D> {
    type Item = VolumeResult<D::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.dataset.len() {
            return None;
        }
        let ans = self.dataset.get(self.next);
        self.next += 1;
        Some(ans)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.dataset.len().saturating_sub(self.next);
        (rest, Some(rest))
    }
}

impl<'a, D: Dataset> ExactSizeIterator for DatasetIter<'a, D> {}

/// 一个训练样本: 输入数组组与目标数组组.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// 网络输入.
    pub inputs: Vec<ArrayD<f32>>,

    /// 监督目标.
    pub targets: Vec<ArrayD<f32>>,
}

/// 在最前面插入长度为 1 的 batch 轴.
#[inline]
pub(crate) fn batch1(a: ArrayD<f32>) -> ArrayD<f32> {
    a.insert_axis(Axis(0))
}

/// 依次解析 `provider` 中全部体数据的形状.
pub(crate) fn shapes_of<P: VolumeProvider + ?Sized>(provider: &P) -> VolumeResult<Vec<Vec<usize>>> {
    (0..provider.len()).map(|i| provider.shape(i)).collect()
}

/// 检查两组体数据逐个形状一致. 不一致时 panic.
pub(crate) fn assert_paired_shapes(what: &str, a: &[Vec<usize>], b: &[Vec<usize>]) {
    assert_eq!(a.len(), b.len(), "{what}: 病例个数不一致");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert_eq!(x, y, "{what}: 第 {i} 个病例形状不一致");
    }
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_dataset_dir() {
        if let Some(home) = dirs::home_dir() {
            let p = home_dataset_dir_with(["train", "label"]).unwrap();
            assert_eq!(p, home.join("dataset").join("train").join("label"));
        }
    }
}
