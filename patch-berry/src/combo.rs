//! 时间点组合生成.
//!
//! 给定每个病例的时间点个数, 按 [`ComboMode`] 选出需要比较的
//! `(较早, 较晚)` 时间点下标对.

use itertools::Itertools;
use ndarray::Array2;

use crate::Combo;

/// 时间点选取模式. 三者互斥.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComboMode {
    /// 只以 `{0, min(T - 1, step)}` 作为锚点. `step` 至少为 1.
    Step(usize),

    /// 只以首末时间点 `{0, T - 1}` 作为锚点.
    LimitsOnly,

    /// 全部时间点两两组合.
    All,
}

impl ComboMode {
    /// 从 `limits_only` 和可选的 `step` 推出模式. `step` 优先,
    /// 小于 1 的 `step` 被修正为 1.
    pub fn from_flags(limits_only: bool, step: Option<i64>) -> Self {
        match step {
            Some(s) => Self::Step(s.max(1) as usize),
            None if limits_only => Self::LimitsOnly,
            None => Self::All,
        }
    }

    /// 时间点个数为 `len` 时的锚点集合 (升序, 无重复).
    fn anchors(&self, len: usize) -> Vec<usize> {
        if len == 0 {
            return vec![];
        }
        let last = len - 1;
        let mut anchors = match self {
            Self::Step(step) => vec![0, last.min(*step)],
            Self::LimitsOnly => vec![0, last],
            Self::All => (0..len).collect(),
        };
        // 单时间点时两个锚点重合, 不应产生 (0, 0).
        anchors.dedup();
        anchors
    }

    /// 为时间点个数为 `len` 的病例生成全部组合. 结果按字典序排列.
    ///
    /// 时间点少于 2 个时返回空 `Vec`.
    pub fn combos(&self, len: usize) -> Vec<Combo> {
        self.anchors(len).into_iter().tuple_combinations().collect()
    }
}

/// 为每个病例生成组合. `lens[i]` 为第 `i` 个病例的时间点个数.
pub fn combos_per_case(lens: &[usize], mode: ComboMode) -> Vec<Vec<Combo>> {
    lens.iter()
        .map(|&len| {
            let combos = mode.combos(len);
            log::debug!("{len} timepoints -> {} combos ({mode:?})", combos.len());
            combos
        })
        .collect()
}

/// 将组合列表转换为形如 `(组合数, 2)` 的矩阵, 每行为 `(较早, 较晚)`.
pub fn combos_to_array(combos: &[Combo]) -> Array2<usize> {
    let mut ans = Array2::zeros((combos.len(), 2));
    for (mut row, &(i, j)) in ans.rows_mut().into_iter().zip(combos) {
        row[0] = i;
        row[1] = j;
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(ComboMode::from_flags(false, None), ComboMode::All);
        assert_eq!(ComboMode::from_flags(true, None), ComboMode::LimitsOnly);
        // step 优先于 limits_only.
        assert_eq!(ComboMode::from_flags(true, Some(2)), ComboMode::Step(2));
        assert_eq!(ComboMode::from_flags(false, Some(0)), ComboMode::Step(1));
        assert_eq!(ComboMode::from_flags(false, Some(-7)), ComboMode::Step(1));
    }

    #[test]
    fn test_all_pairs() {
        assert_eq!(ComboMode::All.combos(2), vec![(0, 1)]);
        assert_eq!(ComboMode::All.combos(3), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(ComboMode::All.combos(5).len(), 10);
    }

    #[test]
    fn test_degenerate_cases() {
        for mode in [ComboMode::All, ComboMode::LimitsOnly, ComboMode::Step(3)] {
            assert!(mode.combos(0).is_empty());
            assert!(mode.combos(1).is_empty());
        }
    }

    #[test]
    fn test_limits_only() {
        for len in 2..8 {
            assert_eq!(ComboMode::LimitsOnly.combos(len), vec![(0, len - 1)]);
        }
    }

    #[test]
    fn test_step() {
        assert_eq!(ComboMode::Step(1).combos(4), vec![(0, 1)]);
        assert_eq!(ComboMode::Step(2).combos(4), vec![(0, 2)]);
        // step 超出时间点范围时退化为首末时间点.
        assert_eq!(ComboMode::Step(10).combos(4), vec![(0, 3)]);
    }

    #[test]
    fn test_pairs_strictly_increasing() {
        for mode in [ComboMode::All, ComboMode::LimitsOnly, ComboMode::Step(2)] {
            for len in 0..7 {
                assert!(mode.combos(len).iter().all(|&(i, j)| i < j && j < len));
            }
        }
    }

    #[test]
    fn test_combos_per_case_ragged() {
        let all = combos_per_case(&[2, 3, 1], ComboMode::All);
        assert_eq!(all, vec![vec![(0, 1)], vec![(0, 1), (0, 2), (1, 2)], vec![]]);

        let arr = combos_to_array(&all[1]);
        assert_eq!(arr.shape(), &[3, 2]);
        assert_eq!(arr.row(2).to_vec(), vec![1, 2]);
    }
}
