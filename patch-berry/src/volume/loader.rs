//! 按文件名约定构造 [`VolumeStore`] 的快捷方式.

use std::path::Path;

use super::{VolumeSource, VolumeStore};
use crate::VolumeResult;

/// 文件名构造器. 接受病例索引数, 获得文件名.
pub type FilenameBuilder = fn(u32) -> String;

/// 构造以 `path/builder(value)` 为来源的 [`VolumeStore`].
///
/// `preload` 为 `false` 时不会访问磁盘, 文件缺失要等到解析时才会暴露.
pub fn volume_store<I: IntoIterator<Item = u32>, P: AsRef<Path>>(
    data: I,
    path: P,
    builder: FilenameBuilder,
    preload: bool,
) -> VolumeResult<VolumeStore> {
    let path = path.as_ref();
    let sources = data
        .into_iter()
        .map(|idx| VolumeSource::Path(path.join(builder(idx))));
    VolumeStore::new(sources, preload)
}

/// 构造多时间点病例: 第 `case` 个病例的第 `t` 个时间点位于
/// `path/builder(case, t)`, 每个病例的时间点个数由 `timepoints` 给出.
pub fn timepoint_stores<P: AsRef<Path>>(
    timepoints: &[usize],
    path: P,
    builder: fn(u32, u32) -> String,
    preload: bool,
) -> VolumeResult<Vec<VolumeStore>> {
    let path = path.as_ref();
    timepoints
        .iter()
        .enumerate()
        .map(|(case, &n)| {
            let sources =
                (0..n as u32).map(|t| VolumeSource::Path(path.join(builder(case as u32, t))));
            VolumeStore::new(sources, preload)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VolumeProvider;
    use ndarray::{ArrayD, IxDyn};
    use ndarray_npy::write_npy;
    use tempfile::tempdir;

    #[test]
    fn test_volume_store() {
        let dir = tempdir().unwrap();
        for i in 0..3u32 {
            let vol = ArrayD::<f32>::from_elem(IxDyn(&[2, 2]), i as f32);
            write_npy(dir.path().join(format!("case-{i}.npy")), &vol).unwrap();
        }

        let store = volume_store([2, 0], dir.path(), |i| format!("case-{i}.npy"), true).unwrap();
        assert!(store.is_preloaded());
        assert_eq!(store.len(), 2);
        assert_eq!(store.resolve(0).unwrap()[[0, 0]], 2.0);

        // 惰性时不访问磁盘, 缺失的文件在解析时才报错.
        let lazy = volume_store([0, 7], dir.path(), |i| format!("case-{i}.npy"), false).unwrap();
        assert!(lazy.resolve(0).is_ok());
        assert!(lazy.resolve(1).is_err());
        assert!(volume_store([7], dir.path(), |i| format!("case-{i}.npy"), true).is_err());

        let stores =
            timepoint_stores(&[2, 1], dir.path(), |c, t| format!("case-{}.npy", c + t), false)
                .unwrap();
        assert_eq!(stores[0].len(), 2);
        assert_eq!(stores[1].resolve(0).unwrap()[[1, 1]], 1.0);
    }
}
