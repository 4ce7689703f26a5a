//! 通用常量.

/// 默认 patch 边长 (各向同性).
pub const DEFAULT_PATCH_SIZE: usize = 32;

/// 通用裁剪数据集与多时间点裁剪数据集的默认重叠体素数.
pub const DEFAULT_OVERLAP: usize = 16;

/// 纵向 (source/target) 裁剪数据集的默认重叠体素数.
pub const DEFAULT_LONGITUDINAL_OVERLAP: usize = 32;

/// 损失函数相关默认值.
pub mod loss {
    /// 区间自适应 MSE 的默认区间边界. 最后一个边界为正无穷.
    pub const DEFAULT_INTERVALS: [f64; 4] = [0.0, 300.0, 450.0, f64::INFINITY];

    /// 区间自适应 MSE 的默认容差缩放系数.
    pub const DEFAULT_ALPHA: f64 = 3.0;

    /// 归一化 MSE 的默认归一化系数.
    pub const DEFAULT_NORM_RATE: f64 = 1.0;

    /// 多类 Dice 损失的默认平滑项.
    pub const DEFAULT_SMOOTH: f64 = 1.0;
}

/// nifti 文件扩展名.
pub const NIFTI_EXTENSIONS: [&str; 2] = [".nii", ".nii.gz"];

/// numpy 单数组文件扩展名.
pub const NPY_EXTENSION: &str = ".npy";
