//! AHA 17 节段划分.
//!
//! 含心肌切片自基底向心尖三等分: 基底段 (节段 1-6), 中间段 (节段 7-12),
//! 心尖段 (节段 13-16). 角度参考为基底切片质心指向 RV 标志点的方向,
//! 扇区表见 [`crate::sector`]. 没有心腔的心尖切片整体标为节段 17.

use log::{debug, info, warn};
use ndarray::{Array3, ArrayView3};

use crate::config::StrainConfig;
use crate::consts::{AHA_SEGMENTS, APICAL_CAP};
use crate::morph_3d::OrientedRoi;
use crate::sector::{apical_segment, ring_segment, Rotation2d};
use crate::{Idx2d, Idx3d, MyoLabel};

/// 心肌切片所属的纵向水平.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// 基底段.
    Basal,
    /// 中间段.
    Mid,
    /// 心尖段.
    Apical,
}

/// 银行家舍入: `.5` 时取偶数.
fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

/// 长度为 `n` 的 (基底 -> 心尖) 质心列表上的水平分界 `(b, m)`.
///
/// 列表索引 `i < b` 属于基底段, `b <= i < m` 属于中间段, 其余属于心尖段.
pub fn level_boundaries(n: usize, base_fraction: f64, mid_fraction: f64) -> (usize, usize) {
    let b = round_half_even(base_fraction * n as f64) as usize;
    let m = round_half_even(mid_fraction * n as f64) as usize;
    (b.min(n), m.clamp(b.min(n), n))
}

/// 列表索引 `i` 所属的水平.
#[inline]
pub fn level_of(i: usize, (b, m): (usize, usize)) -> Level {
    if i < b {
        Level::Basal
    } else if i < m {
        Level::Mid
    } else {
        Level::Apical
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        fn cavities_of(label: &MyoLabel, wall: u8) -> Vec<Vec<Idx2d>> {
            label.par_cavities(wall)
        }
    } else {
        fn cavities_of(label: &MyoLabel, wall: u8) -> Vec<Vec<Idx2d>> {
            label.cavities(wall)
        }
    }
}

/// 与 ROI 同形状的节段标签. `0` 表示非心肌, 心肌体素取 `1..=17`.
#[derive(Debug, Clone, PartialEq)]
pub struct AhaSegmentMap {
    data: Array3<u8>,
}

impl AhaSegmentMap {
    /// 对 ROI 内所有心肌体素进行节段划分.
    pub fn classify(roi: &OrientedRoi, config: &StrainConfig) -> Self {
        let myo = roi.myo_label();
        let mut data = Array3::zeros(roi.shape());
        let rotation = reference_rotation(roi);

        let centroids = roi.centroids();
        let bounds = level_boundaries(
            centroids.len(),
            config.base_fraction(),
            config.mid_fraction(),
        );
        debug!("level boundaries {bounds:?} over {} slice(s)", centroids.len());

        for (i, c) in centroids.iter().enumerate() {
            let level = level_of(i, bounds);
            let sli = roi.label().slice_at(c.z);
            for ((h, w), _) in sli.indexed_iter().filter(|(_, p)| **p == myo) {
                let angle = rotation.angle_of((h as f64 - c.h, w as f64 - c.w));
                let seg = match level {
                    Level::Basal => ring_segment(angle),
                    Level::Mid => ring_segment(angle).map(|s| s + 6),
                    Level::Apical => apical_segment(angle),
                };
                if let Some(seg) = seg {
                    data[(c.z, h, w)] = seg;
                }
            }
        }

        let mut ans = Self { data };
        ans.mark_apical_cap(roi);
        for (k, cnt) in ans.counts().iter().enumerate() {
            if *cnt == 0 {
                debug!("AHA segment {} is empty", k + 1);
            }
        }
        info!("AHA segment map built with {} myocardial voxel(s)", ans.counts().iter().sum::<usize>());
        ans
    }

    /// 心尖方向上没有心腔的切片整体标为节段 17.
    fn mark_apical_cap(&mut self, roi: &OrientedRoi) {
        let myo = roi.myo_label();
        let cavities = cavities_of(roi.label(), myo);
        if cavities.iter().all(Vec::is_empty) {
            warn!("no cavity found on any slice, apical cap is not assigned");
            return;
        }
        for c in roi.centroids().iter().rev() {
            if !cavities[c.z].is_empty() {
                break;
            }
            debug!("slice {} has no cavity, assigned to apical cap", c.z);
            let sli = roi.label().slice_at(c.z);
            for ((h, w), _) in sli.indexed_iter().filter(|(_, p)| **p == myo) {
                self.data[(c.z, h, w)] = APICAL_CAP;
            }
        }
    }

    /// 直接由标签数组创建.
    #[inline]
    pub fn from_raw(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// 体素 `pos` 所属节段. `0` 表示非心肌.
    #[inline]
    pub fn segment_at(&self, pos: Idx3d) -> u8 {
        self.data[pos]
    }

    /// 标签形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 各节段的体素个数, 第 `k` 项对应节段 `k + 1`.
    pub fn counts(&self) -> [usize; AHA_SEGMENTS] {
        let mut ans = [0; AHA_SEGMENTS];
        for &s in self.data.iter().filter(|s| (1..=AHA_SEGMENTS as u8).contains(*s)) {
            ans[s as usize - 1] += 1;
        }
        ans
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }
}

/// 基底切片质心指向 RV 标志点的参考旋转. 无法确定参考方向时不旋转.
fn reference_rotation(roi: &OrientedRoi) -> Rotation2d {
    let base = roi.base_centroid();
    let Some((_, lh, lw)) = roi.rv_landmark() else {
        warn!("RV landmark is missing, angular reference falls back to identity");
        return Rotation2d::identity();
    };
    Rotation2d::from_reference((lh - base.h, lw - base.w)).unwrap_or_else(|| {
        warn!("RV landmark coincides with base centroid, angular reference falls back to identity");
        Rotation2d::identity()
    })
}
