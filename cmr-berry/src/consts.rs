//! 通用常量.

use crate::{Idx2d, Idx3d};

/// 分割标签取值. 与上游分割网络的输出保持一致.
pub mod label {
    /// 背景的体素值.
    pub const BACKGROUND: u8 = 0;

    /// 右心室 (RV) 腔的默认体素值.
    pub const RV: u8 = 1;

    /// 心肌 (myocardium) 的默认体素值.
    pub const MYO: u8 = 2;

    /// 左心室 (LV) 腔的默认体素值.
    pub const LV: u8 = 3;

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }
}

/// AHA 模型的节段个数.
pub const AHA_SEGMENTS: usize = 17;

/// 应变曲线的行数: 17 个节段再加一行全局曲线.
pub const STRAIN_ROWS: usize = AHA_SEGMENTS + 1;

/// 全局应变曲线所在的行.
pub const GLOBAL_ROW: usize = AHA_SEGMENTS;

/// 心尖帽 (apical cap) 的节段编号.
pub const APICAL_CAP: u8 = 17;

/// 规范化网格的默认形状 `(z, h, w)`.
pub const CANONICAL_SHAPE: Idx3d = (16, 256, 256);

/// 平面 ROI 的默认大小 `(h, w)`.
pub const ROI_SIZE: Idx2d = (128, 128);

/// 位移场层间分量的默认放大系数 (层厚与层内像素间距之比).
pub const ANISOTROPY: f64 = 4.0;

/// 时间方向滑动平均的默认窗口长度.
pub const SMOOTHING_WINDOW: usize = 4;

/// 位移场层内高斯平滑的默认标准差 (体素). `0` 表示关闭.
pub const MOTION_SIGMA: f64 = 2.0;

/// 高斯核截断半径, 以标准差为单位.
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// 基底段所占切片比例 (自基底向心尖).
pub const BASE_FRACTION: f64 = 0.35;

/// 基底段与中间段合计所占切片比例.
pub const MID_FRACTION: f64 = 0.70;

/// 体素与切片质心重合时, 在层内两个分量上施加的偏移.
pub const DEGENERATE_OFFSET: f64 = 0.1;

/// z-score 归一化分母中的平滑项.
pub const NORMALIZE_EPS: f64 = 1e-8;

/// 应变比例到百分比的换算系数.
pub const PERCENT: f64 = 100.0;
