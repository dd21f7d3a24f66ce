//! 流水线配置.

use crate::consts::{self, label};
use crate::error::{StrainError, StrainResult};
use crate::{Idx2d, Idx3d};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 应变流水线的全部可调参数.
///
/// 默认值与上游工具保持一致. 通过 `with_*` 方法链式修改:
///
/// ```
/// use cmr_berry::config::StrainConfig;
///
/// let config = StrainConfig::default()
///     .with_roi_size((64, 64))
///     .with_motion_sigma(0.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrainConfig {
    myo_label: u8,
    rv_label: u8,
    canonical_shape: Idx3d,
    roi_size: Idx2d,
    anisotropy: f64,
    smoothing_window: usize,
    motion_sigma: f64,
    base_fraction: f64,
    mid_fraction: f64,
}

impl Default for StrainConfig {
    fn default() -> Self {
        Self {
            myo_label: label::MYO,
            rv_label: label::RV,
            canonical_shape: consts::CANONICAL_SHAPE,
            roi_size: consts::ROI_SIZE,
            anisotropy: consts::ANISOTROPY,
            smoothing_window: consts::SMOOTHING_WINDOW,
            motion_sigma: consts::MOTION_SIGMA,
            base_fraction: consts::BASE_FRACTION,
            mid_fraction: consts::MID_FRACTION,
        }
    }
}

impl StrainConfig {
    /// 设置心肌标签值.
    #[inline]
    pub fn with_myo_label(mut self, v: u8) -> Self {
        self.myo_label = v;
        self
    }

    /// 设置右心室标签值.
    #[inline]
    pub fn with_rv_label(mut self, v: u8) -> Self {
        self.rv_label = v;
        self
    }

    /// 设置规范化网格形状 `(z, h, w)`.
    #[inline]
    pub fn with_canonical_shape(mut self, v: Idx3d) -> Self {
        self.canonical_shape = v;
        self
    }

    /// 设置平面 ROI 大小 `(h, w)`.
    #[inline]
    pub fn with_roi_size(mut self, v: Idx2d) -> Self {
        self.roi_size = v;
        self
    }

    /// 设置层间位移分量的放大系数.
    #[inline]
    pub fn with_anisotropy(mut self, v: f64) -> Self {
        self.anisotropy = v;
        self
    }

    /// 设置时间方向滑动平均窗口.
    #[inline]
    pub fn with_smoothing_window(mut self, v: usize) -> Self {
        self.smoothing_window = v;
        self
    }

    /// 设置位移场层内高斯平滑标准差. `0` 表示关闭平滑.
    #[inline]
    pub fn with_motion_sigma(mut self, v: f64) -> Self {
        self.motion_sigma = v;
        self
    }

    /// 设置基底段与中间段的切片比例分界.
    #[inline]
    pub fn with_level_fractions(mut self, base: f64, mid: f64) -> Self {
        self.base_fraction = base;
        self.mid_fraction = mid;
        self
    }

    /// 心肌标签值.
    #[inline]
    pub fn myo_label(&self) -> u8 {
        self.myo_label
    }

    /// 右心室标签值.
    #[inline]
    pub fn rv_label(&self) -> u8 {
        self.rv_label
    }

    /// 规范化网格形状.
    #[inline]
    pub fn canonical_shape(&self) -> Idx3d {
        self.canonical_shape
    }

    /// 平面 ROI 大小.
    #[inline]
    pub fn roi_size(&self) -> Idx2d {
        self.roi_size
    }

    /// 层间位移分量放大系数.
    #[inline]
    pub fn anisotropy(&self) -> f64 {
        self.anisotropy
    }

    /// 滑动平均窗口.
    #[inline]
    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    /// 位移场高斯平滑标准差.
    #[inline]
    pub fn motion_sigma(&self) -> f64 {
        self.motion_sigma
    }

    /// 基底段切片比例.
    #[inline]
    pub fn base_fraction(&self) -> f64 {
        self.base_fraction
    }

    /// 基底段与中间段合计切片比例.
    #[inline]
    pub fn mid_fraction(&self) -> f64 {
        self.mid_fraction
    }

    /// 检查配置是否合法.
    pub fn validate(&self) -> StrainResult<()> {
        macro_rules! ensure {
            ($cond: expr, $($msg: tt)+) => {
                if !$cond {
                    return Err(StrainError::InvalidConfig(format!($($msg)+)));
                }
            };
        }

        let (z, h, w) = self.canonical_shape;
        ensure!(z > 0 && h > 0 && w > 0, "empty canonical shape {:?}", self.canonical_shape);
        let (rh, rw) = self.roi_size;
        ensure!(rh > 0 && rw > 0, "empty roi size {:?}", self.roi_size);
        ensure!(
            self.myo_label != self.rv_label,
            "myocardium and right ventricle share label {}",
            self.myo_label
        );
        ensure!(
            !label::is_background(self.myo_label),
            "myocardium label must not be background"
        );
        ensure!(
            self.anisotropy.is_finite() && self.anisotropy > 0.0,
            "anisotropy must be positive, got {}",
            self.anisotropy
        );
        ensure!(self.smoothing_window > 0, "smoothing window must be positive");
        ensure!(
            self.motion_sigma.is_finite() && self.motion_sigma >= 0.0,
            "motion sigma must be non-negative, got {}",
            self.motion_sigma
        );
        ensure!(
            0.0 <= self.base_fraction
                && self.base_fraction <= self.mid_fraction
                && self.mid_fraction <= 1.0,
            "level fractions must satisfy 0 <= base <= mid <= 1, got ({}, {})",
            self.base_fraction,
            self.mid_fraction
        );
        Ok(())
    }
}
