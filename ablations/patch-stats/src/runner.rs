//! 程序运行函数.

use std::path::Path;
use std::thread;

use patch_berry::consts::DEFAULT_LONGITUDINAL_OVERLAP;
use patch_berry::prelude::*;
use utils::loader;

use crate::result::{DatasetStats, StatsResult};

const LOAD_ERR: &str = "Loading dataset error";

/// 实际运行.
pub fn run() -> StatsResult {
    let root = loader::data_dir_from_env_or_home();
    assert!(root.is_dir(), "数据根目录 {} 不存在", root.display());
    let cfg = utils::config_in_dir_or_default(&root).expect("Loading dataset config error");
    log::info!("data root: {}, {} cpus", root.display(), utils::cpus());

    let (r, c) = (root.as_path(), &cfg);
    let data: Vec<DatasetStats> = thread::scope(|s| {
        let handles = [
            s.spawn(move || cropping(&r.join("cropping"), c)),
            s.spawn(move || longitudinal(&r.join("longitudinal"), c)),
            s.spawn(move || timepoints(&r.join("timepoints"), c)),
        ];
        handles
            .into_iter()
            .flat_map(|th| th.join().expect("Thread joining error"))
            .collect()
    });

    StatsResult::new(cfg, data)
}

fn as_dyn(store: &Option<VolumeStore>) -> Option<&dyn VolumeProvider> {
    store.as_ref().map(|m| m as &dyn VolumeProvider)
}

fn cropping(dir: &Path, cfg: &DatasetConfig) -> Vec<DatasetStats> {
    let Some(images) = loader::optional_store(dir, "images", cfg.preload).expect(LOAD_ERR) else {
        return vec![];
    };
    let labels = loader::optional_store(dir, "labels", cfg.preload).expect(LOAD_ERR);
    let masks = loader::optional_store(dir, "masks", cfg.preload).expect(LOAD_ERR);

    let ds = CroppingDataset::new(images, labels, as_dyn(&masks), &cfg.patch).expect(LOAD_ERR);
    vec![DatasetStats::from_index("cropping", ds.index())]
}

fn longitudinal(dir: &Path, cfg: &DatasetConfig) -> Vec<DatasetStats> {
    let store = |name| loader::optional_store(dir, name, cfg.preload).expect(LOAD_ERR);
    let (Some(source), Some(target), Some(lesions)) =
        (store("source"), store("target"), store("lesions"))
    else {
        return vec![];
    };
    let masks = store("masks");

    // 未显式配置时使用纵向数据集惯用的重叠量.
    let spec = if cfg.patch == PatchSpec::default() {
        PatchSpec {
            overlap: DEFAULT_LONGITUDINAL_OVERLAP,
            ..cfg.patch.clone()
        }
    } else {
        cfg.patch.clone()
    };
    let ds = LongitudinalDataset::new(source, target, lesions, as_dyn(&masks), &spec)
        .expect(LOAD_ERR);
    vec![DatasetStats::from_index("longitudinal", ds.index())]
}

fn timepoints(dir: &Path, cfg: &DatasetConfig) -> Vec<DatasetStats> {
    let cases_dir = dir.join("cases");
    if !cases_dir.is_dir() {
        return vec![];
    }
    let store = |name| loader::optional_store(dir, name, cfg.preload).expect(LOAD_ERR);
    let (Some(lesions), Some(masks)) = (store("lesions"), store("masks")) else {
        log::warn!("{} lacks lesions/ or masks/", dir.display());
        return vec![];
    };
    let cases = loader::timepoint_stores_from_dir(&cases_dir, cfg.preload).expect(LOAD_ERR);
    let mode = cfg.combos.mode();

    let whole = TimepointDataset::new(cases.clone(), lesions.clone(), masks.clone(), mode)
        .expect(LOAD_ERR);
    let cropped =
        TimepointCroppingDataset::new(cases, lesions, masks, &cfg.patch, mode).expect(LOAD_ERR);
    vec![
        DatasetStats::from_index("timepoint (cropped)", cropped.index()),
        DatasetStats::from_index("timepoint (whole)", whole.index()),
    ]
}
