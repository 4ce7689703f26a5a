//! 数据集构造参数.
//!
//! 打开 `serde` feature 后, 所有参数均可序列化 (例如写在 TOML 实验配置中).

use crate::combo::ComboMode;
use crate::consts::{DEFAULT_OVERLAP, DEFAULT_PATCH_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// patch 边长.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum PatchSize {
    /// 各轴边长相同.
    Isotropic(usize),

    /// 逐轴指定边长.
    PerAxis(Vec<usize>),
}

impl PatchSize {
    /// 展开为长度为 `ndim` 的逐轴边长.
    ///
    /// 若为 [`PatchSize::PerAxis`] 且长度与 `ndim` 不符, 程序 panic.
    pub fn resolve(&self, ndim: usize) -> Vec<usize> {
        match self {
            Self::Isotropic(s) => vec![*s; ndim],
            Self::PerAxis(v) => {
                assert_eq!(v.len(), ndim, "patch 维数与体数据维数不一致");
                v.clone()
            }
        }
    }
}

impl From<usize> for PatchSize {
    #[inline]
    fn from(value: usize) -> Self {
        Self::Isotropic(value)
    }
}

impl From<Vec<usize>> for PatchSize {
    #[inline]
    fn from(value: Vec<usize>) -> Self {
        Self::PerAxis(value)
    }
}

/// patch 网格参数: 边长和相邻 patch 的重叠体素数.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PatchSpec {
    /// patch 边长.
    pub size: PatchSize,

    /// 相邻 patch 的重叠体素数.
    pub overlap: usize,
}

impl PatchSpec {
    /// 构造网格参数.
    #[inline]
    pub fn new(size: impl Into<PatchSize>, overlap: usize) -> Self {
        Self {
            size: size.into(),
            overlap,
        }
    }
}

impl Default for PatchSpec {
    fn default() -> Self {
        Self::new(DEFAULT_PATCH_SIZE, DEFAULT_OVERLAP)
    }
}

/// 时间点组合参数. 含义见 [`ComboMode`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComboSpec {
    /// 是否只比较首末两个时间点.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limits_only: bool,

    /// 若给定, 只比较第 0 个与第 `min(T - 1, step)` 个时间点.
    #[cfg_attr(feature = "serde", serde(default))]
    pub step: Option<i64>,
}

impl ComboSpec {
    /// 转换为组合模式.
    #[inline]
    pub fn mode(&self) -> ComboMode {
        ComboMode::from_flags(self.limits_only, self.step)
    }
}

/// 数据集完整构造参数.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasetConfig {
    /// patch 网格参数.
    #[cfg_attr(feature = "serde", serde(default))]
    pub patch: PatchSpec,

    /// 时间点组合参数.
    #[cfg_attr(feature = "serde", serde(default))]
    pub combos: ComboSpec,

    /// 是否在构造时一次性加载全部体数据.
    #[cfg_attr(feature = "serde", serde(default))]
    pub preload: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_size_resolve() {
        assert_eq!(PatchSize::from(4).resolve(3), vec![4, 4, 4]);
        assert_eq!(PatchSize::from(vec![2, 3]).resolve(2), vec![2, 3]);
    }

    #[test]
    #[should_panic]
    fn test_patch_size_rank_mismatch() {
        PatchSize::from(vec![2, 3]).resolve(3);
    }

    #[test]
    fn test_combo_spec_mode() {
        let spec = ComboSpec {
            limits_only: true,
            step: None,
        };
        assert_eq!(spec.mode(), ComboMode::LimitsOnly);
        assert_eq!(ComboSpec::default().mode(), ComboMode::All);
    }
}
