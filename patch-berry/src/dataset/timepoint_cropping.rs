use super::{assert_paired_shapes, batch1, shapes_of, Dataset, Sample};
use crate::addressing::split_combo_patch;
use crate::combo::combos_per_case;
use crate::geometry::{mask_patches_per_case, PatchPlacement};
use crate::mesh::MeshCache;
use crate::volume::resolve_all;
use crate::{Combo, ComboMode, FlatIndex, PatchSpec, VolumeProvider, VolumeResult};

/// 多时间点病例的 "组合 × patch" 数据集.
///
/// 每个病例是一串同形状的时间点扫描, 外加一张病灶图和一张掩码.
/// patch 网格铺设在病灶图的包围盒内 (不过滤); 病例内偏移按
/// [`split_combo_patch`] 分解为 `(组合, patch)`, patch 变化最快.
///
/// 第 `i` 个样本:
///
/// + 输入: `[source patch, target patch, 病灶 patch, 掩码 patch, 坐标网格 patch,
///   整个 source, 整个病灶图]`;
/// + 目标: `[target patch]`.
pub struct TimepointCroppingDataset<P> {
    cases: Vec<P>,
    lesions: P,
    masks: P,
    shapes: Vec<Vec<usize>>,
    combos: Vec<Vec<Combo>>,
    meshes: MeshCache,
    patches: Vec<Vec<PatchPlacement>>,
    index: FlatIndex,
}

/// 检查每个病例内全部时间点形状一致, 返回每个病例的形状.
///
/// 没有时间点的病例以病灶图的形状为准.
pub(crate) fn case_shapes<P: VolumeProvider>(
    cases: &[P],
    lesion_shapes: &[Vec<usize>],
) -> VolumeResult<Vec<Vec<usize>>> {
    assert_eq!(cases.len(), lesion_shapes.len(), "cases/lesions: 病例个数不一致");
    let mut ans = Vec::with_capacity(cases.len());
    for (i, (case, lesion)) in cases.iter().zip(lesion_shapes).enumerate() {
        let shapes = shapes_of(case)?;
        for (t, shape) in shapes.iter().enumerate() {
            assert_eq!(shape, lesion, "第 {i} 个病例的第 {t} 个时间点形状不一致");
        }
        ans.push(lesion.clone());
    }
    Ok(ans)
}

impl<P: VolumeProvider> TimepointCroppingDataset<P> {
    /// 构造数据集.
    ///
    /// # 注意
    ///
    /// 1. 每个病例内的全部时间点, 病灶图与掩码必须形状一致, 否则程序 panic.
    /// 2. 每张病灶图都必须含有正体素, 否则程序 panic.
    /// 3. 时间点少于 2 个的病例不贡献任何样本.
    pub fn new(
        cases: Vec<P>,
        lesions: P,
        masks: P,
        spec: &PatchSpec,
        mode: ComboMode,
    ) -> VolumeResult<Self> {
        let lesion_shapes = shapes_of(&lesions)?;
        assert_paired_shapes("lesions/masks", &lesion_shapes, &shapes_of(&masks)?);
        let shapes = case_shapes(&cases, &lesion_shapes)?;

        let lens: Vec<usize> = cases.iter().map(VolumeProvider::len).collect();
        let combos = combos_per_case(&lens, mode);

        let ndim = shapes.first().map_or(0, Vec::len);
        let size = spec.size.resolve(ndim);
        let patches = {
            let resolved = resolve_all(&lesions)?;
            let views = resolved.iter().map(|v| v.view()).collect();
            mask_patches_per_case(views, &size, spec.overlap, false)
        };

        let index = FlatIndex::new(patches.iter().zip(&combos).map(|(p, c)| p.len() * c.len()));
        for case in 0..index.cases() {
            if index.count(case) == 0 {
                log::warn!("case {case} contributes no sample ({} timepoints)", lens[case]);
            }
        }
        let meshes = MeshCache::new(shapes.iter().map(Vec::as_slice));
        log::info!(
            "timepoint cropping dataset: {} cases, {} samples",
            index.cases(),
            index.len()
        );

        Ok(Self {
            cases,
            lesions,
            masks,
            shapes,
            combos,
            meshes,
            patches,
            index,
        })
    }

    /// 第 `case` 个病例的全部时间点组合.
    #[inline]
    pub fn combos(&self, case: usize) -> &[Combo] {
        &self.combos[case]
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

    /// 将全局索引翻译为 `(病例, 组合, patch 位置)`.
    pub fn locate(&self, index: usize) -> (usize, Combo, &PatchPlacement) {
        let (case, local) = self.index.locate(index);
        let (combo, patch) = split_combo_patch(local, self.patches[case].len());
        (case, self.combos[case][combo], &self.patches[case][patch])
    }
}

impl<P: VolumeProvider> Dataset for TimepointCroppingDataset<P> {
    type Item = Sample;

    #[inline]
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> VolumeResult<Sample> {
        let (case, (src, tgt), placement) = self.locate(index);
        let timepoints = &self.cases[case];
        let source = timepoints.resolve(src)?;
        let target = timepoints.resolve(tgt)?;
        let lesion = self.lesions.resolve(case)?;
        let mask = self.masks.resolve(case)?;

        let target_patch = batch1(placement.extract(target.view()));
        let inputs = vec![
            batch1(placement.extract(source.view())),
            target_patch.clone(),
            batch1(placement.extract(lesion.view())),
            batch1(placement.extract(mask.view())),
            self.meshes.patch(&self.shapes[case], placement),
            batch1(source.into_owned()),
            batch1(lesion.into_owned()),
        ];
        Ok(Sample {
            inputs,
            targets: vec![target_patch],
        })
    }
}
