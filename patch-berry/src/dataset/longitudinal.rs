use super::{assert_paired_shapes, batch1, shapes_of, Dataset, Sample};
use crate::geometry::{mask_patches_per_case, PatchPlacement};
use crate::mesh::MeshCache;
use crate::volume::resolve_all;
use crate::{FlatIndex, PatchSpec, VolumeProvider, VolumeResult};

/// source/target 成对病例的 patch 数据集.
///
/// 每个病例由同形状的 source, target 与病灶图组成. patch 网格铺设在掩码
/// (未给定时为病灶图) 的包围盒内, 并只保留与之相交的 patch.
///
/// 第 `i` 个样本:
///
/// + 输入: `[source patch, target patch, 坐标网格 patch, 整个 source]`;
/// + 目标: `[病灶 patch, target patch]`.
pub struct LongitudinalDataset<P> {
    source: P,
    target: P,
    lesions: P,
    shapes: Vec<Vec<usize>>,
    meshes: MeshCache,
    patches: Vec<Vec<PatchPlacement>>,
    index: FlatIndex,
}

impl<P: VolumeProvider> LongitudinalDataset<P> {
    /// 构造数据集. 本数据集的惯用重叠量见 [`crate::consts::DEFAULT_LONGITUDINAL_OVERLAP`].
    ///
    /// # 注意
    ///
    /// 1. `source`, `target`, `lesions` (以及给定的 `masks`) 的病例个数与逐个形状
    ///   必须一致, 否则程序 panic.
    /// 2. 用于铺设网格的体数据必须每个都含有正体素, 否则程序 panic.
    pub fn new(
        source: P,
        target: P,
        lesions: P,
        masks: Option<&dyn VolumeProvider>,
        spec: &PatchSpec,
    ) -> VolumeResult<Self> {
        let shapes = shapes_of(&source)?;
        assert_paired_shapes("source/target", &shapes, &shapes_of(&target)?);
        assert_paired_shapes("source/lesions", &shapes, &shapes_of(&lesions)?);
        if let Some(m) = masks {
            assert_paired_shapes("source/masks", &shapes, &shapes_of(m)?);
        }

        let ndim = shapes.first().map_or(0, Vec::len);
        let size = spec.size.resolve(ndim);
        let patches = {
            let grid_source = match masks {
                Some(m) => resolve_all(m)?,
                None => resolve_all(&lesions)?,
            };
            let views = grid_source.iter().map(|v| v.view()).collect();
            mask_patches_per_case(views, &size, spec.overlap, true)
        };
        for (case, p) in patches.iter().enumerate() {
            log::debug!("case {case}: {} patches", p.len());
        }

        let index = FlatIndex::new(patches.iter().map(Vec::len));
        let meshes = MeshCache::new(shapes.iter().map(Vec::as_slice));
        log::info!(
            "longitudinal dataset: {} cases, {} patches, {} mesh shapes",
            index.cases(),
            index.len(),
            meshes.len()
        );

        Ok(Self {
            source,
            target,
            lesions,
            shapes,
            meshes,
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

impl<P: VolumeProvider> Dataset for LongitudinalDataset<P> {
    type Item = Sample;

    #[inline]
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> VolumeResult<Sample> {
        let (case, local) = self.index.locate(index);
        let placement = &self.patches[case][local];

        let source = self.source.resolve(case)?;
        let target = self.target.resolve(case)?;
        let lesion = self.lesions.resolve(case)?;

        let target_patch = batch1(placement.extract(target.view()));
        let inputs = vec![
            batch1(placement.extract(source.view())),
            target_patch.clone(),
            self.meshes.patch(&self.shapes[case], placement),
            batch1(source.into_owned()),
        ];
        let targets = vec![batch1(placement.extract(lesion.view())), target_patch];
        Ok(Sample { inputs, targets })
    }
}
