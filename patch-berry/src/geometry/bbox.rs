use ndarray::{ArrayViewD, Dimension};
use num::Zero;

/// 轴对齐包围盒. `min` 和 `max` 均为闭区间端点.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    min: Vec<usize>,
    max: Vec<usize>,
}

impl BoundingBox {
    /// 由两个端点构造. 维数不同或存在 `min > max` 的轴时 panic.
    pub fn new(min: Vec<usize>, max: Vec<usize>) -> Self {
        assert_eq!(min.len(), max.len(), "包围盒端点维数不一致");
        assert!(
            min.iter().zip(&max).all(|(a, b)| a <= b),
            "包围盒存在 min > max 的轴"
        );
        Self { min, max }
    }

    /// 计算掩码中所有严格正体素的最小包围盒.
    ///
    /// 若不存在正体素, 则返回 `None`.
    pub fn from_mask<T>(mask: ArrayViewD<'_, T>) -> Option<Self>
    where
        T: PartialOrd + Zero,
    {
        let zero = T::zero();
        let mut ans: Option<Self> = None;
        for (pos, _) in mask.indexed_iter().filter(|(_, v)| **v > zero) {
            let pos = pos.slice();
            match ans.as_mut() {
                None => ans = Some(Self::new(pos.to_vec(), pos.to_vec())),
                Some(bb) => bb.include(pos),
            }
        }
        ans
    }

    /// 扩张包围盒使其包含 `pos`.
    fn include(&mut self, pos: &[usize]) {
        debug_assert_eq!(pos.len(), self.ndim());
        for ((lo, hi), &p) in self.min.iter_mut().zip(self.max.iter_mut()).zip(pos) {
            *lo = (*lo).min(p);
            *hi = (*hi).max(p);
        }
    }

    /// 包含 `self` 和 `other` 的最小包围盒.
    pub fn union(&self, other: &Self) -> Self {
        assert_eq!(self.ndim(), other.ndim(), "包围盒维数不一致");
        let min = self.min.iter().zip(&other.min).map(|(a, b)| *a.min(b));
        let max = self.max.iter().zip(&other.max).map(|(a, b)| *a.max(b));
        Self {
            min: min.collect(),
            max: max.collect(),
        }
    }

    /// 维数.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.min.len()
    }

    /// 各轴最小坐标.
    #[inline]
    pub fn min(&self) -> &[usize] {
        &self.min
    }

    /// 各轴最大坐标 (含).
    #[inline]
    pub fn max(&self) -> &[usize] {
        &self.max
    }

    /// 各轴跨度 (体素个数).
    pub fn lens(&self) -> Vec<usize> {
        self.min.iter().zip(&self.max).map(|(a, b)| b - a + 1).collect()
    }

    /// `pos` 是否位于包围盒内.
    pub fn contains(&self, pos: &[usize]) -> bool {
        pos.len() == self.ndim()
            && pos
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(p, (lo, hi))| lo <= p && p <= hi)
    }

    /// 按各轴半边长向内收缩, 得到 patch 中心的取值范围 `(min + half, max - half)`.
    ///
    /// 收缩后上界可能小于下界, 也可能为负, 因此以 `isize` 返回.
    pub fn shrink(&self, half: &[usize]) -> (Vec<isize>, Vec<isize>) {
        assert_eq!(half.len(), self.ndim(), "patch 维数与包围盒维数不一致");
        let lo = self.min.iter().zip(half).map(|(m, h)| (m + h) as isize);
        let hi = self.max.iter().zip(half).map(|(m, h)| *m as isize - *h as isize);
        (lo.collect(), hi.collect())
    }
}

/// 计算一组掩码的共同包围盒.
///
/// 若任一掩码不存在正体素, 则返回 `None`. 空输入同样返回 `None`.
pub fn shared_bounding_box<'a, T, I>(masks: I) -> Option<BoundingBox>
where
    T: PartialOrd + Zero + 'a,
    I: IntoIterator<Item = ArrayViewD<'a, T>>,
{
    masks
        .into_iter()
        .map(BoundingBox::from_mask)
        .try_fold(None::<BoundingBox>, |acc, bb| {
            let bb = bb?;
            Some(Some(match acc {
                None => bb,
                Some(acc) => acc.union(&bb),
            }))
        })
        .flatten()
}
