use ndarray::ArrayD;

use super::{assert_paired_shapes, batch1, shapes_of, Dataset, Sample};
use crate::geometry::{mask_patches_per_case, PatchPlacement};
use crate::volume::resolve_all;
use crate::{FlatIndex, PatchSpec, VolumeProvider, VolumeResult};

/// [`CroppingDataset`] 的样本.
#[derive(Clone, Debug, PartialEq)]
pub enum CropItem {
    /// 有标签时: 输入 patch 与标签 patch.
    Labeled(Sample),

    /// 无标签时 (推理): patch 以及把它拼回原位所需的信息.
    Unlabeled {
        /// 输入 patch, 带 batch 轴.
        patch: ArrayD<f32>,

        /// 病例序号.
        case: usize,

        /// patch 在病例体数据中的位置.
        placement: PatchPlacement,
    },
}

impl CropItem {
    /// 若为 [`CropItem::Labeled`], 返回其中的样本.
    pub fn into_sample(self) -> Option<Sample> {
        match self {
            Self::Labeled(s) => Some(s),
            Self::Unlabeled { .. } => None,
        }
    }
}

/// 单体数据病例的 patch 数据集.
///
/// patch 网格的铺设区域按以下优先级确定:
///
/// 1. 给定 `masks` 时, 在掩码包围盒内铺设并只保留与掩码相交的 patch;
/// 2. 否则给定 `labels` 时, 以标签代替掩码, 同样过滤;
/// 3. 都没有时, 以病例体数据自身的正体素包围盒铺设, 不过滤.
pub struct CroppingDataset<P> {
    cases: P,
    labels: Option<P>,
    patches: Vec<Vec<PatchPlacement>>,
    index: FlatIndex,
}

impl<P: VolumeProvider> CroppingDataset<P> {
    /// 构造数据集.
    ///
    /// # 注意
    ///
    /// 1. `labels`, `masks` 与 `cases` 的病例个数和逐个形状必须一致, 否则程序 panic.
    /// 2. 用于铺设网格的体数据 (见类型文档) 必须每个都含有正体素, 否则程序 panic.
    /// 3. 构造时会解析一遍用于铺设网格的体数据; 解析失败时返回 `Err`.
    pub fn new(
        cases: P,
        labels: Option<P>,
        masks: Option<&dyn VolumeProvider>,
        spec: &PatchSpec,
    ) -> VolumeResult<Self> {
        let case_shapes = shapes_of(&cases)?;
        if let Some(labels) = labels.as_ref() {
            assert_paired_shapes("cases/labels", &case_shapes, &shapes_of(labels)?);
        }
        let ndim = case_shapes.first().map_or(0, Vec::len);
        let size = spec.size.resolve(ndim);

        let patches = match (masks, labels.as_ref()) {
            (Some(m), _) => {
                assert_paired_shapes("cases/masks", &case_shapes, &shapes_of(m)?);
                grid(m, &size, spec.overlap, true)?
            }
            (None, Some(l)) => grid(l, &size, spec.overlap, true)?,
            (None, None) => grid(&cases, &size, spec.overlap, false)?,
        };
        let index = FlatIndex::new(patches.iter().map(Vec::len));
        log::info!(
            "cropping dataset: {} cases, {} patches",
            index.cases(),
            index.len()
        );

        Ok(Self {
            cases,
            labels,
            patches,
            index,
        })
    }

    /// 第 `case` 个病例的全部 patch 位置.
    #[inline]
    pub fn patches(&self, case: usize) -> &[PatchPlacement] {
        &self.patches[case]
    }

    /// 寻址表.
    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }
}

/// 为 `provider` 中的每个体数据铺设 patch 网格.
fn grid<P: VolumeProvider + ?Sized>(
    provider: &P,
    size: &[usize],
    overlap: usize,
    filtered: bool,
) -> VolumeResult<Vec<Vec<PatchPlacement>>> {
    let volumes = resolve_all(provider)?;
    let views = volumes.iter().map(|v| v.view()).collect();
    let ans = mask_patches_per_case(views, size, overlap, filtered);
    for (case, p) in ans.iter().enumerate() {
        log::debug!("case {case}: {} patches", p.len());
        if p.is_empty() {
            log::warn!("case {case} contributes no patch");
        }
    }
    Ok(ans)
}

impl<P: VolumeProvider> Dataset for CroppingDataset<P> {
    type Item = CropItem;

    #[inline]
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> VolumeResult<CropItem> {
        let (case, local) = self.index.locate(index);
        let placement = &self.patches[case][local];
        let volume = self.cases.resolve(case)?;
        let patch = batch1(placement.extract(volume.view()));

        Ok(match self.labels.as_ref() {
            Some(labels) => {
                let label = labels.resolve(case)?;
                CropItem::Labeled(Sample {
                    inputs: vec![patch],
                    targets: vec![batch1(placement.extract(label.view()))],
                })
            }
            None => CropItem::Unlabeled {
                patch,
                case,
                placement: placement.clone(),
            },
        })
    }
}
