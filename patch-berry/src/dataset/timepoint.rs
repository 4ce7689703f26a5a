use super::timepoint_cropping::case_shapes;
use super::{assert_paired_shapes, batch1, shapes_of, Dataset, Sample};
use crate::combo::combos_per_case;
use crate::geometry::shared_bounding_box;
use crate::volume::resolve_all;
use crate::{BoundingBox, Combo, ComboMode, FlatIndex, PatchPlacement, VolumeProvider, VolumeResult};

/// 多时间点病例的整体数据集: 不切 patch, 每个组合一个样本.
///
/// 所有病例共用一个包围盒, 即全部掩码正体素包围盒的并. 每个样本都裁剪到该包围盒
/// (含上界), 超出某个病例范围的部分以零填充.
///
/// 裁剪区域为 `[min, max + 1)`, 比按 `[min, max)` 切片的做法每轴多一个体素.
///
/// 第 `i` 个样本:
///
/// + 输入: `[source, target, 病灶图, 掩码]`, 均已裁剪;
/// + 目标: `[target]`, 已裁剪.
pub struct TimepointDataset<P> {
    cases: Vec<P>,
    lesions: P,
    masks: P,
    combos: Vec<Vec<Combo>>,
    bbox: BoundingBox,
    crop: PatchPlacement,
    index: FlatIndex,
}

impl<P: VolumeProvider> TimepointDataset<P> {
    /// 构造数据集.
    ///
    /// # 注意
    ///
    /// 1. 每个病例内的全部时间点, 病灶图与掩码必须形状一致, 否则程序 panic.
    /// 2. 掩码全部为空 (或没有病例) 时程序 panic.
    pub fn new(cases: Vec<P>, lesions: P, masks: P, mode: ComboMode) -> VolumeResult<Self> {
        let lesion_shapes = shapes_of(&lesions)?;
        assert_paired_shapes("lesions/masks", &lesion_shapes, &shapes_of(&masks)?);
        case_shapes(&cases, &lesion_shapes)?;

        let bbox = {
            let resolved = resolve_all(&masks)?;
            shared_bounding_box(resolved.iter().map(|v| v.view())).expect("存在不含正体素的掩码")
        };
        let crop = PatchPlacement::from_ranges(
            bbox.min()
                .iter()
                .zip(bbox.max())
                .map(|(&lo, &hi)| (lo as isize, hi as isize + 1))
                .collect(),
        );
        log::debug!("shared bounding box: {:?} -> {:?}", bbox.min(), bbox.max());

        let lens: Vec<usize> = cases.iter().map(VolumeProvider::len).collect();
        let combos = combos_per_case(&lens, mode);
        let index = FlatIndex::new(combos.iter().map(Vec::len));
        log::info!(
            "timepoint dataset: {} cases, {} combos, crop {:?}",
            index.cases(),
            index.len(),
            crop.lens()
        );

        Ok(Self {
            cases,
            lesions,
            masks,
            combos,
            bbox,
            crop,
            index,
        })
    }

    /// 全部病例共用的包围盒.
    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// 第 `case` 个病例的全部时间点组合.
    #[inline]
    pub fn combos(&self, case: usize) -> &[Combo] {
        &self.combos[case]
    }

    /// 寻址表.
    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }
}

impl<P: VolumeProvider> Dataset for TimepointDataset<P> {
    type Item = Sample;

    #[inline]
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> VolumeResult<Sample> {
        let (case, local) = self.index.locate(index);
        let (src, tgt) = self.combos[case][local];
        let timepoints = &self.cases[case];

        let crop = |v: &crate::Volume| batch1(self.crop.extract(v.view()));
        let target = crop(&*timepoints.resolve(tgt)?);
        let inputs = vec![
            crop(&*timepoints.resolve(src)?),
            target.clone(),
            crop(&*self.lesions.resolve(case)?),
            crop(&*self.masks.resolve(case)?),
        ];
        Ok(Sample {
            inputs,
            targets: vec![target],
        })
    }
}
