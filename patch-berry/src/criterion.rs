//! 损失函数.
//!
//! 比较预测数组与真值数组, 归约为一个标量 (或逐类的向量). 与数据集寻址部分无关,
//! 也不带任何状态.
//!
//! 数组布局约定: 第 0 轴为 batch, 多类 Dice 损失额外要求第 1 轴为类别.

use ndarray::{Array1, Array2, ArrayD, ArrayViewD, Axis, Dimension, IxDyn, Zip};
use num::Float;
use ordered_float::OrderedFloat;

use crate::consts::loss::{DEFAULT_ALPHA, DEFAULT_INTERVALS, DEFAULT_NORM_RATE, DEFAULT_SMOOTH};

fn cast<F: Float>(v: f64) -> F {
    F::from(v).expect("浮点常量无法转换为目标类型")
}

/// 区间自适应 MSE.
///
/// 对每个真值 `t`, 取 `intervals` 中包住它的最紧区间 `[lower, upper]`
/// (`upper` 为不小于 `t` 的最小边界, `lower` 为严格小于 `t` 的最大边界),
/// 容差 `a = min(upper - t, t - lower) / alpha`, 损失为
/// `sum(1 - exp(-(pred - t)^2 / a))`.
///
/// `intervals` 必须升序. 缺失的下界视为负无穷, 缺失的上界视为正无穷.
///
/// # 注意
///
/// 真值恰好落在区间边界上时 `a == 0`, 结果为 NaN. 这里不做保护.
pub fn gaussian_mse<F: Float>(
    pred: ArrayViewD<'_, F>,
    target: ArrayViewD<'_, F>,
    intervals: &[F],
    alpha: F,
) -> F {
    assert_eq!(pred.shape(), target.shape(), "预测与真值形状不一致");
    debug_assert!(intervals.windows(2).all(|w| w[0] <= w[1]));

    Zip::from(&pred)
        .and(&target)
        .fold(F::zero(), |acc, &p, &t| {
            let at = intervals.partition_point(|&v| v < t);
            let upper = intervals.get(at).copied().unwrap_or_else(F::infinity);
            let lower = match at {
                0 => F::neg_infinity(),
                k => intervals[k - 1],
            };
            let a = (upper - t).min(t - lower) / alpha;
            let d = p - t;
            acc + (F::one() - (-(d * d) / a).exp())
        })
}

/// 归一化 MSE: `mean((t - p)^2) / (max((t - p)^2) * norm_rate)`.
///
/// 预测与真值完全相同时分母为 0, 结果为 NaN.
pub fn normalised_mse<F: Float>(pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>, norm_rate: F) -> F {
    assert_eq!(pred.shape(), target.shape(), "预测与真值形状不一致");
    let n = pred.len();
    let (sum, max) = Zip::from(&pred)
        .and(&target)
        .fold((F::zero(), F::neg_infinity()), |(sum, max), &p, &t| {
            let sq = (t - p) * (t - p);
            (sum + sq, max.max(sq))
        });
    let mean = sum / cast(n as f64);
    mean / (max * norm_rate)
}

/// 将真值整理为与 `pred` 形状 `[B, C, ...]` 相同的 one-hot 数组.
///
/// 1. 形状与 `pred` 相同: 已是 one-hot, 原样使用;
/// 2. 形状为 `[B, 1, ...]`: 类别标签, 沿第 1 轴展开 (相当于拼接);
/// 3. 形状为 `[B, ...]`: 类别标签, 在第 1 轴插入类别轴 (相当于堆叠).
///
/// 标签最大值超过类别数时程序 panic.
pub fn one_hot<F: Float>(pred_shape: &[usize], target: ArrayViewD<'_, F>) -> ArrayD<F> {
    if target.shape() == pred_shape {
        return target.to_owned();
    }
    let n_classes = pred_shape[1];
    let max = target.iter().fold(F::neg_infinity(), |a, &b| a.max(b));
    assert!(
        max <= cast(n_classes as f64),
        "标签最大值超过类别数 {n_classes}"
    );

    let channel = target.ndim() == pred_shape.len();
    if channel {
        assert_eq!(target.shape()[1], 1, "带类别轴的标签, 该轴长度必须为 1");
        assert_eq!(target.shape()[2..], pred_shape[2..], "标签与预测空间形状不一致");
    } else {
        assert_eq!(target.shape()[1..], pred_shape[2..], "标签与预测空间形状不一致");
    }
    assert_eq!(target.shape()[0], pred_shape[0], "标签与预测 batch 大小不一致");

    ArrayD::from_shape_fn(IxDyn(pred_shape), |idx| {
        let mut at: Vec<usize> = idx.slice().to_vec();
        let class = at[1];
        if channel {
            at[1] = 0;
        } else {
            at.remove(1);
        }
        if target[IxDyn(&at)] == cast(class as f64) {
            F::one()
        } else {
            F::zero()
        }
    })
}

/// 逐 (batch, 类别) 的 Dice 系数 `(2 sum(p t) + smooth) / (sum(p + t) + smooth)`,
/// 形状为 `[B, C]`.
pub fn dsc_per_class<F: Float>(pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>, smooth: F) -> Array2<F> {
    assert!(pred.ndim() >= 2, "预测必须形如 [B, C, ...]");
    let target = one_hot(pred.shape(), target);
    let (b, c) = (pred.shape()[0], pred.shape()[1]);
    let mut inter = Array2::<F>::zeros((b, c));
    let mut total = Array2::<F>::zeros((b, c));
    pred.indexed_iter()
        .zip(target.iter())
        .for_each(|((idx, &p), &t)| {
            let at = [idx[0], idx[1]];
            inter[at] = inter[at] + p * t;
            total[at] = total[at] + p + t;
        });
    let two = F::one() + F::one();
    Zip::from(&inter)
        .and(&total)
        .map_collect(|&i, &s| (two * i + smooth) / (s + smooth))
}

/// 多类 Dice 损失: `1 - mean(dsc)`, 截断到 `[0, 1]`.
pub fn multi_dsc_loss<F: Float>(pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>, smooth: F) -> F {
    let dsc = dsc_per_class(pred, target, smooth);
    let mean = dsc.sum() / cast(dsc.len() as f64);
    clamp01(F::one() - mean)
}

/// 逐类的多类 Dice 损失: 对 batch 取平均后 `1 - dsc`, 长度为类别数.
pub fn multi_dsc_loss_per_class<F: Float>(
    pred: ArrayViewD<'_, F>,
    target: ArrayViewD<'_, F>,
    smooth: F,
) -> Array1<F> {
    let dsc = dsc_per_class(pred, target, smooth);
    let b: F = cast(dsc.len_of(Axis(0)) as f64);
    dsc.sum_axis(Axis(0)).mapv(|s| clamp01(F::one() - s / b))
}

#[inline]
fn clamp01<F: Float>(v: F) -> F {
    v.max(F::zero()).min(F::one())
}

/// 比较预测与真值, 得到标量损失.
pub trait Criterion<F: Float> {
    /// 计算损失.
    fn eval(&self, pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>) -> F;
}

/// 配置好的 [`gaussian_mse`]. 区间边界以 `f64` 保存, 计算时转换为数组的标量类型.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianMse {
    intervals: Vec<OrderedFloat<f64>>,
    alpha: f64,
}

impl GaussianMse {
    /// 由区间边界 (任意顺序, 自动排序去重) 与缩放系数构造.
    pub fn new<I: IntoIterator<Item = f64>>(intervals: I, alpha: f64) -> Self {
        let mut intervals: Vec<OrderedFloat<f64>> = intervals.into_iter().map(OrderedFloat).collect();
        intervals.sort();
        intervals.dedup();
        Self { intervals, alpha }
    }

    /// 升序区间边界.
    pub fn intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.intervals.iter().map(|v| v.0)
    }

    /// 容差缩放系数.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for GaussianMse {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVALS, DEFAULT_ALPHA)
    }
}

impl<F: Float> Criterion<F> for GaussianMse {
    fn eval(&self, pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>) -> F {
        let intervals: Vec<F> = self.intervals().map(cast).collect();
        gaussian_mse(pred, target, &intervals, cast(self.alpha))
    }
}

/// 配置好的 [`normalised_mse`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NormalisedMse<F> {
    /// 归一化系数.
    pub norm_rate: F,
}

/// 配置好的 [`multi_dsc_loss`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MultiDsc<F> {
    /// 平滑项.
    pub smooth: F,
}

macro_rules! impl_default_criterion {
    ($fp: ty) => {
        impl Default for NormalisedMse<$fp> {
            fn default() -> Self {
                Self {
                    norm_rate: DEFAULT_NORM_RATE as $fp,
                }
            }
        }

        impl Default for MultiDsc<$fp> {
            fn default() -> Self {
                Self {
                    smooth: DEFAULT_SMOOTH as $fp,
                }
            }
        }
    };
}

impl_default_criterion!(f32);
impl_default_criterion!(f64);

impl<F: Float> Criterion<F> for NormalisedMse<F> {
    fn eval(&self, pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>) -> F {
        normalised_mse(pred, target, self.norm_rate)
    }
}

impl<F: Float> Criterion<F> for MultiDsc<F> {
    fn eval(&self, pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>) -> F {
        multi_dsc_loss(pred, target, self.smooth)
    }
}

impl<F: Float> MultiDsc<F> {
    /// 逐类损失, 见 [`multi_dsc_loss_per_class`].
    pub fn eval_per_class(&self, pred: ArrayViewD<'_, F>, target: ArrayViewD<'_, F>) -> Array1<F> {
        multi_dsc_loss_per_class(pred, target, self.smooth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};

    #[test]
    fn test_gaussian_mse() {
        let loss = GaussianMse::default();
        assert_eq!(loss.intervals().collect::<Vec<_>>(), DEFAULT_INTERVALS.to_vec());

        let target = array![[100.0, 400.0]].into_dyn();
        assert!(loss.eval(target.view(), target.view()).abs() < 1e-12);

        // t = 100: 区间 [0, 300], a = 100 / 3.
        let pred = array![[110.0, 400.0]].into_dyn();
        let want = 1.0 - (-100.0 / (100.0 / 3.0_f64)).exp();
        assert!((loss.eval(pred.view(), target.view()) - want).abs() < 1e-12);

        // t = 1000: 上界为正无穷, a 由下界 450 决定.
        let target = array![1000.0].into_dyn();
        let pred = array![1010.0].into_dyn();
        let want = 1.0 - (-100.0 / (550.0 / 3.0_f64)).exp();
        assert!((loss.eval(pred.view(), target.view()) - want).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_mse_on_boundary() {
        let loss = GaussianMse::new([450.0, 0.0, 300.0, 300.0], 3.0);
        assert_eq!(loss.intervals().count(), 3);
        let target = array![300.0_f32].into_dyn();
        let pred = array![300.0_f32].into_dyn();
        assert!(loss.eval(pred.view(), target.view()).is_nan());
    }

    #[test]
    fn test_normalised_mse() {
        let loss = NormalisedMse::<f64>::default();
        let pred = array![0.0, 1.0, 2.0, 3.0].into_dyn();
        let target = array![0.0, 1.0, 2.0, 5.0].into_dyn();
        // mean = 1, max = 4.
        assert_eq!(loss.eval(pred.view(), target.view()), 0.25);

        let scaled = NormalisedMse { norm_rate: 2.0 };
        assert_eq!(scaled.eval(pred.view(), target.view()), 0.125);
    }

    #[test]
    fn test_one_hot_layouts() {
        let labels = array![[0.0_f32, 2.0], [1.0, 1.0]]; // [B = 2, 2]
        let stacked = one_hot(&[2, 3, 2], labels.view().into_dyn());
        assert_eq!(stacked.shape(), &[2, 3, 2]);
        assert_eq!(stacked[[0, 0, 0]], 1.0);
        assert_eq!(stacked[[0, 2, 1]], 1.0);
        assert_eq!(stacked[[1, 1, 0]], 1.0);
        assert_eq!(stacked.sum(), 4.0);

        let with_channel = labels.clone().insert_axis(Axis(1)).into_dyn();
        let concatenated = one_hot(&[2, 3, 2], with_channel.view());
        assert_eq!(concatenated, stacked);
    }

    #[test]
    #[should_panic]
    fn test_one_hot_too_many_classes() {
        let labels = array![[0.0_f32, 5.0]].into_dyn();
        one_hot(&[1, 3, 2], labels.view());
    }

    #[test]
    fn test_dice_identical_and_disjoint() {
        let mut pred = Array::<f64, _>::zeros((2, 2, 4, 4));
        pred.slice_mut(ndarray::s![.., 0, ..2, ..]).fill(1.0);
        pred.slice_mut(ndarray::s![.., 1, 2.., ..]).fill(1.0);
        let pred = pred.into_dyn();

        let tiny = MultiDsc { smooth: 1e-9 };
        assert!(tiny.eval(pred.view(), pred.view()) < 1e-9);

        let swapped = pred.mapv(|v| 1.0 - v);
        assert!(tiny.eval(pred.view(), swapped.view()) > 1.0 - 1e-9);

        let per_class = tiny.eval_per_class(pred.view(), swapped.view());
        assert_eq!(per_class.len(), 2);
        assert!(per_class.iter().all(|v| *v > 1.0 - 1e-9));
    }

    #[test]
    fn test_dice_with_labels() {
        // 2 类, 标签 [B = 1, 4].
        let labels = array![[0.0_f32, 0.0, 1.0, 1.0]].into_dyn();
        let pred = array![[[1.0_f32, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 1.0]]].into_dyn();
        let loss = MultiDsc::<f32>::default();
        assert!(loss.eval(pred.view(), labels.view()).abs() < 1e-6);

        let dsc = dsc_per_class(pred.view(), labels.view(), 1.0);
        assert_eq!(dsc.shape(), &[1, 2]);
        assert!(dsc.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_dice_partial_overlap_per_batch_and_class() {
        // [B = 2, C = 2, 2, 2], 每个 (batch, 类别) 的交与和各不相同.
        let pred = Array::from_shape_vec(
            (2, 2, 2, 2),
            vec![
                1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, //
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap()
        .into_dyn();
        let target = Array::from_shape_vec(
            (2, 2, 2, 2),
            vec![
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, //
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap()
        .into_dyn();

        let dsc = dsc_per_class(pred.view(), target.view(), 0.0);
        assert_eq!(dsc.shape(), &[2, 2]);
        // batch 0: 类别 0 交 1 和 3, 类别 1 交 2 和 5.
        assert!((dsc[[0, 0]] - 2.0 / 3.0).abs() < 1e-12);
        assert!((dsc[[0, 1]] - 4.0 / 5.0).abs() < 1e-12);
        assert_eq!(dsc.row(1).to_vec(), vec![1.0, 1.0]);

        let per_class = multi_dsc_loss_per_class(pred.view(), target.view(), 0.0);
        assert!((per_class[0] - (1.0 - (2.0 / 3.0 + 1.0) / 2.0)).abs() < 1e-12);
        assert!((per_class[1] - (1.0 - (0.8 + 1.0) / 2.0)).abs() < 1e-12);
    }
}
