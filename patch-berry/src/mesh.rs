//! 恒等坐标网格.
//!
//! 作为形变场 (deformation field) 的初始输入: 在位置 `p` 处,
//! 第 `k` 个通道的值就是 `p[k]` 本身.

use std::collections::HashMap;

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::geometry::PatchPlacement;

/// 为形状 `shape` 构造恒等坐标网格. 输出形状为 `[shape.len(), shape...]`.
pub fn identity_mesh(shape: &[usize]) -> ArrayD<f32> {
    let mut full = Vec::with_capacity(shape.len() + 1);
    full.push(shape.len());
    full.extend_from_slice(shape);
    ArrayD::from_shape_fn(IxDyn(&full), |pos| pos[pos[0] + 1] as f32)
}

/// 按形状缓存的坐标网格. 病例形状各异时, 每种形状只构造一次.
#[derive(Debug, Default, Clone)]
pub struct MeshCache {
    meshes: HashMap<Vec<usize>, ArrayD<f32>>,
}

impl MeshCache {
    /// 为 `shapes` 中出现过的每种形状预先构造网格.
    pub fn new<'a, I: IntoIterator<Item = &'a [usize]>>(shapes: I) -> Self {
        let mut meshes = HashMap::new();
        for shape in shapes {
            meshes
                .entry(shape.to_vec())
                .or_insert_with(|| identity_mesh(shape));
        }
        Self { meshes }
    }

    /// 获取形状为 `shape` 的网格. 若未缓存该形状, 程序 panic.
    pub fn get(&self, shape: &[usize]) -> ArrayViewD<'_, f32> {
        self.meshes
            .get(shape)
            .map(|m| m.view())
            .unwrap_or_else(|| panic!("未缓存形状为 {shape:?} 的坐标网格"))
    }

    /// 截取形状为 `shape` 的网格在 `placement` 处的 patch. 通道轴整体保留.
    #[inline]
    pub fn patch(&self, shape: &[usize], placement: &PatchPlacement) -> ArrayD<f32> {
        placement.extract_trailing(self.get(shape), 1)
    }

    /// 已缓存的形状个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// 是否没有缓存任何网格.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
