//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Combo, Volume, VolumeView};

pub use crate::addressing::{split_combo_patch, FlatIndex};
pub use crate::combo::{combos_per_case, combos_to_array, ComboMode};
pub use crate::config::{ComboSpec, DatasetConfig, PatchSize, PatchSpec};
pub use crate::consts::{DEFAULT_LONGITUDINAL_OVERLAP, DEFAULT_OVERLAP, DEFAULT_PATCH_SIZE};

pub use crate::criterion::{Criterion, GaussianMse, MultiDsc, NormalisedMse};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{
    self, CropItem, CroppingDataset, Dataset, LongitudinalDataset, Sample, TimepointCroppingDataset,
    TimepointDataset,
};

pub use crate::geometry::{mask_patches, shared_bounding_box, BoundingBox, PatchPlacement};
pub use crate::mesh::{identity_mesh, MeshCache};

pub use crate::volume::loader::{timepoint_stores, volume_store};
pub use crate::volume::{load_volume, NpzArchive, VolumeProvider, VolumeSource, VolumeStore};

pub use crate::{OpenArchiveError, VolumeError, VolumeResult};
