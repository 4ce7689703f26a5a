//! 统计结果.

use std::io::{self, Write};

use patch_berry::{DatasetConfig, FlatIndex};

/// 单个数据集的统计.
pub struct DatasetStats {
    name: &'static str,
    counts: Vec<usize>,
    len: usize,
}

impl DatasetStats {
    /// 从数据集的寻址表收集统计.
    pub fn from_index(name: &'static str, index: &FlatIndex) -> Self {
        Self {
            name,
            counts: (0..index.cases()).map(|c| index.count(c)).collect(),
            len: index.len(),
        }
    }

    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(w, "Dataset `{}`:", self.name)?;
        writeln!(w, "{S4}Cases: {}", self.counts.len())?;
        writeln!(w, "{S4}Flat length: {}", self.len)?;
        let empty = self.counts.iter().filter(|c| **c == 0).count();
        writeln!(w, "{S4}Cases without samples: {empty}")?;
        match (self.counts.iter().min(), self.counts.iter().max()) {
            (Some(lo), Some(hi)) => write!(w, "{S4}Samples per case: {lo} ..= {hi}")?,
            _ => write!(w, "{S4}Samples per case: /")?,
        }
        Ok(())
    }
}

/// 全部数据集的统计结果.
pub struct StatsResult {
    config: DatasetConfig,
    data: Vec<DatasetStats>,
}

impl StatsResult {
    pub fn new<I: IntoIterator<Item = DatasetStats>>(config: DatasetConfig, it: I) -> Self {
        Self {
            config,
            data: it.into_iter().collect(),
        }
    }

    /// 打印统计结果.
    pub fn analyze(&self) {
        utils::sep();
        println!("{:?}", self.config);
        utils::sep();
        if self.data.is_empty() {
            println!("No dataset found.");
            utils::sep();
            return;
        }

        let mut buf = Vec::with_capacity(512);
        for stats in self.data.iter() {
            stats.describe_into(&mut buf).unwrap();
            println!("{}", std::str::from_utf8(&buf).unwrap());
            buf.clear();

            utils::sep();
        }
    }
}
