use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ndarray::{IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;

use super::VolumeProvider;
use crate::{OpenArchiveError, Volume, VolumeError, VolumeResult};

/// Npz 文件归档.
///
/// 该结构可用于建模硬盘上以单个 npz 压缩文件保存的一组体数据 (例如全部病例的掩码).
/// 条目在每次访问时才解压读取, 作为 [`VolumeProvider`] 时始终是惰性的.
pub struct NpzArchive {
    entries: Vec<Mutex<NpzReader<File>>>,
    names: Vec<String>,
    turn: AtomicUsize,
}

impl NpzArchive {
    /// 初始化. 条目顺序即归档内的存储顺序.
    ///
    /// `workers` 指定了底层工作通道的个数, 最大为 64. 系统会从路径 `p` 打开文件
    /// `workers` 次, 并为每个打开通道指定一个排他入口点 (以期获得更高的并行度).
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> Result<Self, OpenArchiveError> {
        let entries = Self::open_entries(workers, p.as_ref())?;
        let names = entries[0].lock().unwrap().names()?;
        Ok(Self {
            entries,
            names,
            turn: AtomicUsize::new(0),
        })
    }

    /// 初始化, 并以 `names` 指定条目顺序 (例如与病例列表对齐).
    ///
    /// 名字不会在此处校验, 不存在的条目在访问时返回错误.
    pub fn with_names<P: AsRef<Path>>(
        workers: NonZeroUsize,
        p: P,
        names: Vec<String>,
    ) -> Result<Self, OpenArchiveError> {
        Ok(Self {
            entries: Self::open_entries(workers, p.as_ref())?,
            names,
            turn: AtomicUsize::new(0),
        })
    }

    fn open_entries(
        workers: NonZeroUsize,
        p: &Path,
    ) -> Result<Vec<Mutex<NpzReader<File>>>, OpenArchiveError> {
        let workers = workers.get();
        if workers > 64 {
            return Err(OpenArchiveError::TooManyWorkers(64));
        }
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            let file = OpenOptions::new().read(true).open(p)?;
            v.push(Mutex::new(NpzReader::new(file)?));
        }
        Ok(v)
    }

    /// 通过 npz 条目名 `name` 获取体数据.
    pub fn volume_by_name(&self, name: &str) -> VolumeResult<Volume> {
        if !self.names.iter().any(|n| n == name) {
            return Err(VolumeError::MissingEntry(name.to_owned()));
        }
        let slot = self.next_slot();
        let mut file = self.entries[slot].lock().unwrap();
        Ok(file.by_name::<OwnedRepr<f32>, IxDyn>(name)?)
    }

    /// 条目名, 按访问顺序排列.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    fn next_slot(&self) -> usize {
        self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len()
    }
}

impl VolumeProvider for NpzArchive {
    #[inline]
    fn len(&self) -> usize {
        self.names.len()
    }

    fn resolve(&self, index: usize) -> VolumeResult<Cow<'_, Volume>> {
        self.volume_by_name(&self.names[index]).map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use ndarray_npy::NpzWriter;
    use tempfile::{tempdir, TempDir};

    fn write_archive() -> (TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let p = dir.path().join("masks.npz");
        let mut npz = NpzWriter::new(File::create(&p).unwrap());
        let a = ArrayD::<f32>::zeros(IxDyn(&[2, 3]));
        let b = ArrayD::<f32>::ones(IxDyn(&[4]));
        npz.add_array("a", &a).unwrap();
        npz.add_array("b", &b).unwrap();
        npz.finish().unwrap();
        (dir, p)
    }

    #[test]
    fn test_too_many_workers() {
        let n = NonZeroUsize::new(65).unwrap();
        let err = NpzArchive::new(n, "no-such-file.npz").err().unwrap();
        assert!(matches!(err, OpenArchiveError::TooManyWorkers(64)));
    }

    #[test]
    fn test_archive_provider() {
        let (_dir, p) = write_archive();
        let n = NonZeroUsize::new(2).unwrap();
        let archive = NpzArchive::new(n, &p).unwrap();
        assert_eq!(archive.worker_len(), 2);
        assert_eq!(VolumeProvider::len(&archive), 2);

        let shapes: Vec<_> = (0..2).map(|i| archive.shape(i).unwrap()).collect();
        let mut shapes_sorted = shapes.clone();
        shapes_sorted.sort();
        assert_eq!(shapes_sorted, vec![vec![2, 3], vec![4]]);

        let missing = archive.volume_by_name("c.npy");
        assert!(matches!(missing, Err(VolumeError::MissingEntry(_))));
    }

    #[test]
    fn test_archive_with_names() {
        let (_dir, p) = write_archive();
        let n = NonZeroUsize::new(1).unwrap();
        let mut names = NpzArchive::new(n, &p).unwrap().names().to_vec();
        names.reverse();
        names.push("c.npy".to_owned());
        let archive = NpzArchive::with_names(n, &p, names).unwrap();
        assert_eq!(VolumeProvider::len(&archive), 3);

        // 条目顺序与给定名字一致, 而不是归档内的存储顺序.
        assert_eq!(archive.shape(0).unwrap(), vec![4]);
        assert_eq!(archive.shape(1).unwrap(), vec![2, 3]);
        assert!(matches!(archive.resolve(2), Err(VolumeError::MissingEntry(_))));
    }
}
