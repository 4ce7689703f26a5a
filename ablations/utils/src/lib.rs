//! 消融实验依赖的通用组件.

use std::fs;
use std::path::Path;

use patch_berry::DatasetConfig;
use thiserror::Error;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 实验配置文件名. 位于数据根目录下.
pub const CONFIG_FILE: &str = "patch-berry.toml";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 读取实验配置错误.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取文件错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML 格式错误.
    #[error("invalid experiment config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// 从 TOML 文本解析数据集配置. 缺省的字段取默认值.
pub fn parse_config(text: &str) -> Result<DatasetConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// 从 TOML 文件读取数据集配置.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<DatasetConfig, ConfigError> {
    parse_config(&fs::read_to_string(path)?)
}

/// 读取 `dir` 下的 [`CONFIG_FILE`]. 文件不存在时返回默认配置.
pub fn config_in_dir_or_default<P: AsRef<Path>>(dir: P) -> Result<DatasetConfig, ConfigError> {
    let p = dir.as_ref().join(CONFIG_FILE);
    if p.is_file() {
        log::info!("using config {}", p.display());
        read_config(p)
    } else {
        log::info!("no {CONFIG_FILE} found, using defaults");
        Ok(DatasetConfig::default())
    }
}
