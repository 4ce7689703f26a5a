//! 对 `patch-berry::volume` 的更一层封装. 按目录约定加载实验数据.
//!
//! 数据根目录的约定布局 (各子目录均可缺省):
//!
//! ```text
//! {root}/
//!     patch-berry.toml
//!     cropping/{images, labels, masks}/
//!     longitudinal/{source, target, lesions, masks}/
//!     timepoints/{lesions, masks}/
//!     timepoints/cases/{case}/    每个病例一个子目录, 时间点按文件名排序
//! ```
//!
//! 同一数据集下的各目录按文件名排序后一一对应.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use patch_berry::consts::{NIFTI_EXTENSIONS, NPY_EXTENSION};
use patch_berry::{VolumeResult, VolumeStore};

/// 获取数据根目录.
///
/// 1. 若环境变量 `$PATCH_BERRY_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/patch-berry`.
pub fn data_dir_from_env_or_home() -> PathBuf {
    match env::var("PATCH_BERRY_DATA_DIR") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => patch_berry::dataset::home_dataset_dir_with(["patch-berry"])
            .expect("无法确定用户主目录"),
    }
}

/// 文件名是否为可加载的体数据.
pub fn is_volume_file(p: &Path) -> bool {
    let Some(name) = p.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    NIFTI_EXTENSIONS
        .iter()
        .chain([&NPY_EXTENSION])
        .any(|ext| name.ends_with(ext))
}

/// 列出 `dir` 下全部体数据文件, 按文件名排序.
pub fn volume_files<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
    let mut ans = Vec::new();
    for entry in fs::read_dir(dir)? {
        let p = entry?.path();
        if p.is_file() && is_volume_file(&p) {
            ans.push(p);
        }
    }
    ans.sort();
    Ok(ans)
}

/// 列出 `dir` 下全部子目录, 按目录名排序.
pub fn sub_dirs<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
    let mut ans = Vec::new();
    for entry in fs::read_dir(dir)? {
        let p = entry?.path();
        if p.is_dir() {
            ans.push(p);
        }
    }
    ans.sort();
    Ok(ans)
}

/// 以 `dir` 下全部体数据文件构造 [`VolumeStore`].
pub fn store_from_dir<P: AsRef<Path>>(dir: P, preload: bool) -> VolumeResult<VolumeStore> {
    let files = volume_files(dir.as_ref())?;
    log::debug!("{}: {} volumes", dir.as_ref().display(), files.len());
    VolumeStore::new(files, preload)
}

/// 若 `root/name` 是目录, 以其构造 [`VolumeStore`]; 否则返回 `None`.
pub fn optional_store(root: &Path, name: &str, preload: bool) -> VolumeResult<Option<VolumeStore>> {
    let dir = root.join(name);
    if dir.is_dir() {
        store_from_dir(dir, preload).map(Some)
    } else {
        Ok(None)
    }
}

/// 以 `dir` 的每个子目录为一个多时间点病例.
pub fn timepoint_stores_from_dir<P: AsRef<Path>>(
    dir: P,
    preload: bool,
) -> VolumeResult<Vec<VolumeStore>> {
    sub_dirs(dir)?
        .into_iter()
        .map(|case| store_from_dir(case, preload))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_volume_file() {
        assert!(is_volume_file(Path::new("a/case-1.nii.gz")));
        assert!(is_volume_file(Path::new("case-1.nii")));
        assert!(is_volume_file(Path::new("case-1.npy")));
        assert!(!is_volume_file(Path::new("case-1.npz")));
        assert!(!is_volume_file(Path::new("patch-berry.toml")));
    }

    #[test]
    fn test_volume_files_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join("t0")).unwrap();
        for name in ["b.npy", "a.nii.gz", "notes.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let files = volume_files(dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.nii.gz", "b.npy"]);
        assert_eq!(sub_dirs(dir).unwrap(), vec![dir.join("t0")]);
        assert!(optional_store(dir, "missing", false).unwrap().is_none());

        let store = store_from_dir(dir, false).unwrap();
        assert_eq!(patch_berry::VolumeProvider::len(&store), 2);
    }
}
