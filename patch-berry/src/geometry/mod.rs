//! 几何计算: 掩码包围盒与 patch 网格.

mod bbox;
mod patch;

pub use bbox::{shared_bounding_box, BoundingBox};
pub use patch::{
    axis_centers, grid_in_bounding_box, mask_patches, mask_patches_per_case, steps,
    PatchPlacement,
};
