//! 扁平索引寻址.
//!
//! 每个病例贡献的样本数各不相同 (patch 数, 或 patch 数 × 组合数). 该模块把它们
//! 拼成一个连续序列: 全局索引 `i` 通过前缀和表二分查找到 `(病例, 病例内偏移)`.

/// 前缀和表. `cumsum[k]` 为前 `k + 1` 个病例的样本数之和.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatIndex {
    cumsum: Vec<usize>,
}

impl FlatIndex {
    /// 由每个病例的样本数构造.
    pub fn new<I: IntoIterator<Item = usize>>(counts: I) -> Self {
        let cumsum = counts
            .into_iter()
            .scan(0usize, |acc, c| {
                *acc += c;
                Some(*acc)
            })
            .collect();
        Self { cumsum }
    }

    /// 样本总数. 没有病例时为 0.
    #[inline]
    pub fn len(&self) -> usize {
        self.cumsum.last().copied().unwrap_or(0)
    }

    /// 是否不含任何样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 病例个数 (包括样本数为 0 的病例).
    #[inline]
    pub fn cases(&self) -> usize {
        self.cumsum.len()
    }

    /// 前缀和表.
    #[inline]
    pub fn cumsum(&self) -> &[usize] {
        &self.cumsum
    }

    /// 第 `case` 个病例的第一个全局索引.
    #[inline]
    pub fn offset(&self, case: usize) -> usize {
        match case {
            0 => 0,
            k => self.cumsum[k - 1],
        }
    }

    /// 第 `case` 个病例的样本数.
    #[inline]
    pub fn count(&self, case: usize) -> usize {
        self.cumsum[case] - self.offset(case)
    }

    /// 将全局索引翻译为 `(病例, 病例内偏移)`.
    ///
    /// 病例为满足 `cumsum[k] > index` 的最小 `k`, 因此样本数为 0 的病例永远不会被选中.
    /// 调用方必须保证 `index < self.len()`, 否则结果无意义 (debug 模式下 panic).
    #[inline]
    pub fn locate(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.len(), "索引 {index} 越界 (长度 {})", self.len());
        let case = self.cumsum.partition_point(|&c| c <= index);
        (case, index - self.offset(case))
    }
}

/// 病例内偏移到 `(组合序号, patch 序号)` 的分解. patch 序号变化最快.
///
/// `n_patches` 必须非零.
#[inline]
pub const fn split_combo_patch(local: usize, n_patches: usize) -> (usize, usize) {
    (local / n_patches, local % n_patches)
}
