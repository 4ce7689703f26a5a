use std::ops::Range;

use itertools::Itertools;
use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use num::Zero;

use super::BoundingBox;

/// patch 在体数据中的位置: 每个轴一个 `[start, end)` 区间.
///
/// 保证 `end - start` 等于该轴的 patch 边长. 区间 **可以** 越出体数据范围
/// (包围盒贴近边界时会出现), 越界部分在提取时以零填充.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatchPlacement {
    ranges: Vec<(isize, isize)>,
}

/// 一个 patch 与体数据相交部分在两侧坐标系中的区间.
struct Overlap {
    src: Vec<Range<usize>>,
    dst: Vec<Range<usize>>,
}

impl PatchPlacement {
    /// 以 `center` 为中心构造 patch: `start = center - half`, `end = start + size`.
    pub fn from_center(center: &[isize], size: &[usize]) -> Self {
        debug_assert_eq!(center.len(), size.len());
        let ranges = center
            .iter()
            .zip(size)
            .map(|(&c, &s)| {
                let start = c - (s / 2) as isize;
                (start, start + s as isize)
            })
            .collect();
        Self { ranges }
    }

    /// 直接由逐轴区间构造.
    ///
    /// 存在 `start > end` 的轴时 panic.
    pub fn from_ranges(ranges: Vec<(isize, isize)>) -> Self {
        assert!(ranges.iter().all(|(a, b)| a <= b));
        Self { ranges }
    }

    /// 逐轴 `[start, end)` 区间.
    #[inline]
    pub fn ranges(&self) -> &[(isize, isize)] {
        &self.ranges
    }

    /// 维数.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ranges.len()
    }

    /// 逐轴边长.
    pub fn lens(&self) -> Vec<usize> {
        self.ranges.iter().map(|(a, b)| (b - a) as usize).collect()
    }

    /// patch 是否完全落在形状为 `shape` 的体数据内部.
    pub fn is_inside(&self, shape: &[usize]) -> bool {
        shape.len() == self.ndim()
            && self
                .ranges
                .iter()
                .zip(shape)
                .all(|(&(a, b), &s)| a >= 0 && b <= s as isize)
    }

    /// 计算与形状为 `shape` 的体数据的交集. 交集为空时返回 `None`.
    fn overlap(&self, shape: &[usize]) -> Option<Overlap> {
        let mut src = Vec::with_capacity(self.ndim());
        let mut dst = Vec::with_capacity(self.ndim());
        for (&(a, b), &s) in self.ranges.iter().zip(shape) {
            let lo = a.max(0);
            let hi = b.min(s as isize);
            if lo >= hi {
                return None;
            }
            src.push(lo as usize..hi as usize);
            dst.push((lo - a) as usize..(hi - a) as usize);
        }
        Some(Overlap { src, dst })
    }

    /// 从 `volume` 中取出该 patch. `volume` 的维数必须与 patch 相同.
    #[inline]
    pub fn extract<T: Clone + Zero>(&self, volume: ArrayViewD<'_, T>) -> ArrayD<T> {
        self.extract_trailing(volume, 0)
    }

    /// 从 `volume` 的最后 `self.ndim()` 个轴上取出该 patch, 前 `lead` 个轴
    /// (例如通道轴) 整体保留.
    ///
    /// 越出体数据的部分以零填充, 因此输出形状总为 `volume.shape()[..lead] ++ self.lens()`.
    pub fn extract_trailing<T: Clone + Zero>(
        &self,
        volume: ArrayViewD<'_, T>,
        lead: usize,
    ) -> ArrayD<T> {
        assert_eq!(volume.ndim(), lead + self.ndim(), "patch 维数与体数据维数不一致");
        let mut shape = volume.shape()[..lead].to_vec();
        shape.extend(self.lens());
        let mut ans = ArrayD::zeros(IxDyn(&shape));

        let Some(Overlap { src, dst }) = self.overlap(&volume.shape()[lead..]) else {
            return ans;
        };
        let pick = |ranges: &[Range<usize>], axis: usize| match axis.checked_sub(lead) {
            Some(i) => Slice::from(ranges[i].clone()),
            None => Slice::from(..),
        };
        let part = volume.slice_each_axis(|ax| pick(&src, ax.axis.index()));
        ans.slice_each_axis_mut(|ax| pick(&dst, ax.axis.index()))
            .assign(&part);
        ans
    }

    /// patch 与 `mask` 相交部分是否至少有一个严格正体素.
    pub fn covers_positive<T: PartialOrd + Zero>(&self, mask: ArrayViewD<'_, T>) -> bool {
        assert_eq!(mask.ndim(), self.ndim(), "patch 维数与掩码维数不一致");
        let Some(Overlap { src, .. }) = self.overlap(mask.shape()) else {
            return false;
        };
        let zero = T::zero();
        mask.slice_each_axis(|ax| Slice::from(src[ax.axis.index()].clone()))
            .iter()
            .any(|v| *v > zero)
    }
}

/// 生成某个轴上的 patch 中心序列: 从 `lo` 开始以 `step` 递增直至 (不含) `hi`,
/// 然后 **总是** 追加 `hi` 本身.
///
/// 当跨度不能被步长整除时, 最后一个 patch 会与前一个重叠. 若 `lo >= hi`,
/// 结果只有 `hi` 一个中心.
pub fn axis_centers(lo: isize, hi: isize, step: usize) -> Vec<isize> {
    debug_assert!(step >= 1);
    let mut ans: Vec<isize> = (lo..hi).step_by(step).collect();
    ans.push(hi);
    ans
}

/// 由 patch 边长和重叠量得到逐轴步长 `max(size - overlap, 1)`.
#[inline]
pub fn steps(size: &[usize], overlap: usize) -> Vec<usize> {
    size.iter().map(|s| s.saturating_sub(overlap).max(1)).collect()
}

/// 在包围盒 `bb` 内按 patch 边长 `size` 与重叠量 `overlap` 铺设 patch 网格.
///
/// 各轴中心序列见 [`axis_centers`], 网格点为各轴中心序列的笛卡尔积
/// (最后一个轴变化最快).
pub fn grid_in_bounding_box(bb: &BoundingBox, size: &[usize], overlap: usize) -> Vec<PatchPlacement> {
    let half: Vec<usize> = size.iter().map(|s| s / 2).collect();
    let (lo, hi) = bb.shrink(&half);
    lo.into_iter()
        .zip(hi)
        .zip(steps(size, overlap))
        .map(|((lo, hi), step)| axis_centers(lo, hi, step).into_iter())
        .multi_cartesian_product()
        .map(|center| PatchPlacement::from_center(&center, size))
        .collect()
}

/// 在单个掩码的正体素包围盒内铺设 patch 网格.
///
/// 若 `filtered` 为 `true`, 则只保留与掩码正体素相交的 patch.
///
/// # 注意
///
/// 掩码不存在正体素时程序 panic.
pub fn mask_patches<T>(
    mask: ArrayViewD<'_, T>,
    size: &[usize],
    overlap: usize,
    filtered: bool,
) -> Vec<PatchPlacement>
where
    T: PartialOrd + Zero,
{
    assert_eq!(mask.ndim(), size.len(), "patch 维数与掩码维数不一致");
    let bb = BoundingBox::from_mask(mask.view()).expect("掩码中不存在正体素");
    let mut ans = grid_in_bounding_box(&bb, size, overlap);
    if filtered {
        ans.retain(|p| p.covers_positive(mask.view()));
    }
    ans
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        /// 对每个掩码独立调用 [`mask_patches`], 结果按病例顺序排列.
        ///
        /// 打开 `rayon` feature 时病例间并行计算.
        pub fn mask_patches_per_case<T>(
            masks: Vec<ArrayViewD<'_, T>>,
            size: &[usize],
            overlap: usize,
            filtered: bool,
        ) -> Vec<Vec<PatchPlacement>>
        where
            T: PartialOrd + Zero + Sync,
        {
            masks
                .into_par_iter()
                .map(|m| mask_patches(m, size, overlap, filtered))
                .collect()
        }
    } else {
        /// 对每个掩码独立调用 [`mask_patches`], 结果按病例顺序排列.
        ///
        /// 打开 `rayon` feature 时病例间并行计算.
        pub fn mask_patches_per_case<T>(
            masks: Vec<ArrayViewD<'_, T>>,
            size: &[usize],
            overlap: usize,
            filtered: bool,
        ) -> Vec<Vec<PatchPlacement>>
        where
            T: PartialOrd + Zero + Sync,
        {
            masks
                .into_iter()
                .map(|m| mask_patches(m, size, overlap, filtered))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array2, Array3};

    fn cube_mask() -> ArrayD<f32> {
        let mut mask = Array3::<f32>::zeros((8, 8, 8));
        mask.slice_mut(s![2..6, 2..6, 2..6]).fill(1.0);
        mask.into_dyn()
    }

    #[test]
    fn test_axis_centers() {
        assert_eq!(axis_centers(3, 4, 1), vec![3, 4]);
        assert_eq!(axis_centers(0, 10, 4), vec![0, 4, 8, 10]);
        // 步长整除跨度时 hi 不在 arange 中, 仍会追加.
        assert_eq!(axis_centers(0, 8, 4), vec![0, 4, 8]);
        assert_eq!(axis_centers(5, 5, 2), vec![5]);
        assert_eq!(axis_centers(6, 2, 2), vec![2]);
    }

    #[test]
    fn test_steps() {
        assert_eq!(steps(&[32, 16, 8], 16), vec![16, 1, 1]);
        assert_eq!(steps(&[2], 1), vec![1]);
    }

    /// `(8, 8, 8)` 掩码, 正体素为 `[2:6]^3`, patch 边长 2, 重叠 1.
    #[test]
    fn test_cube_grid() {
        let mask = cube_mask();
        let patches = mask_patches(mask.view(), &[2, 2, 2], 1, false);
        // 每轴中心 [3, 4], 共 2^3 个.
        assert_eq!(patches.len(), 8);
        assert_eq!(patches[0].ranges(), &[(2, 4), (2, 4), (2, 4)]);
        assert_eq!(patches[1].ranges(), &[(2, 4), (2, 4), (3, 5)]);
        assert_eq!(patches[7].ranges(), &[(3, 5), (3, 5), (3, 5)]);
        assert!(patches.iter().all(|p| p.lens() == vec![2, 2, 2]));
        assert!(patches.iter().all(|p| p.is_inside(mask.shape())));

        let filtered = mask_patches(mask.view(), &[2, 2, 2], 1, true);
        assert_eq!(filtered, patches);
    }

    /// 不过滤时, 全部 patch 的并集覆盖收缩后的包围盒, 且最后一个中心恰为上界.
    #[test]
    fn test_grid_covers_shrunk_box() {
        let bb = BoundingBox::new(vec![3, 0], vec![20, 13]);
        let size = [4, 6];
        let patches = grid_in_bounding_box(&bb, &size, 1);
        let (lo, hi) = bb.shrink(&[2, 3]);

        let last = patches.last().unwrap();
        let last_center: Vec<isize> = last
            .ranges()
            .iter()
            .zip(&size)
            .map(|(r, s)| r.0 + (s / 2) as isize)
            .collect();
        assert_eq!(last_center, hi);

        for h in lo[0]..=hi[0] {
            for w in lo[1]..=hi[1] {
                assert!(patches.iter().any(|p| {
                    let r = p.ranges();
                    r[0].0 <= h && h < r[0].1 && r[1].0 <= w && w < r[1].1
                }));
            }
        }
    }

    #[test]
    fn test_filtered_grid() {
        let mut mask = Array2::<u8>::zeros((16, 16));
        mask[[1, 1]] = 1;
        mask[[14, 14]] = 1;
        let mask = mask.into_dyn();

        let all = mask_patches(mask.view(), &[4, 4], 0, false);
        let kept = mask_patches(mask.view(), &[4, 4], 0, true);
        assert!(kept.len() < all.len());
        assert!(kept.iter().all(|p| p.covers_positive(mask.view())));
        assert!(!kept.is_empty());
    }

    #[test]
    fn test_extract_padding() {
        let vol = Array2::from_shape_fn((4, 4), |(h, w)| (h * 4 + w) as f32).into_dyn();

        let inside = PatchPlacement::from_ranges(vec![(1, 3), (0, 2)]);
        let p = inside.extract(vol.view());
        assert_eq!(p.shape(), &[2, 2]);
        assert_eq!(p.iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0, 8.0, 9.0]);

        let edge = PatchPlacement::from_ranges(vec![(-1, 1), (3, 5)]);
        let p = edge.extract(vol.view());
        assert_eq!(p.shape(), &[2, 2]);
        assert_eq!(p.iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 3.0, 0.0]);

        let outside = PatchPlacement::from_ranges(vec![(10, 12), (0, 2)]);
        assert!(outside.extract(vol.view()).iter().all(|v| *v == 0.0));
        assert!(!outside.covers_positive(vol.view()));
    }

    #[test]
    fn test_extract_trailing() {
        let vol =
            Array3::from_shape_fn((2, 3, 3), |(c, h, w)| (c * 100 + h * 3 + w) as f32).into_dyn();
        let p = PatchPlacement::from_ranges(vec![(1, 3), (1, 3)]).extract_trailing(vol.view(), 1);
        assert_eq!(p.shape(), &[2, 2, 2]);
        assert_eq!(p[[0, 0, 0]], 4.0);
        assert_eq!(p[[1, 1, 1]], 108.0);
    }

    #[test]
    fn test_per_case() {
        let a = cube_mask();
        let mut b = ArrayD::<f32>::zeros(IxDyn(&[8, 8, 8]));
        b[IxDyn(&[4, 4, 4])] = 1.0;
        let per_case = mask_patches_per_case(vec![a.view(), b.view()], &[2, 2, 2], 1, false);
        assert_eq!(per_case.len(), 2);
        assert_eq!(per_case[0].len(), 8);
        // 单点包围盒: 收缩后 lo = 5 > hi = 3, 每轴只有中心 3.
        assert_eq!(per_case[1].len(), 1);
        assert_eq!(per_case[1][0].ranges(), &[(2, 4), (2, 4), (2, 4)]);
    }
}
