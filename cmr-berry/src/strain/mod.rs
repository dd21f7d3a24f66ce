//! 应变计算: 位移场 -> 小应变张量 -> 局部投影 -> 节段平均 -> 时间后处理.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use ndarray::{Array2, Array3, ArrayView2, ArrayView4, Axis};

use crate::aha::AhaSegmentMap;
use crate::config::StrainConfig;
use crate::consts::STRAIN_ROWS;
use crate::error::{StrainError, StrainResult};
use crate::frame::LocalFrameField;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod smooth;
pub mod temporal;
pub mod tensor;

pub use tensor::FrameStrain;

/// 反射延拓 `(d c b a | a b c d | d c b a)` 下, 索引 `i` 在长度为 `n` 的序列上的位置.
#[inline]
pub(crate) fn reflect_index(i: isize, n: usize) -> usize {
    debug_assert!(n > 0);
    let period = 2 * n as isize;
    let m = i.rem_euclid(period) as usize;
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        /// 借助 `rayon`, 并行地计算每一帧. 结果顺序与帧顺序一致.
        fn map_frames<F>(n: usize, op: F) -> Vec<FrameStrain>
        where
            F: Fn(usize) -> FrameStrain + Sync + Send,
        {
            use rayon::iter::{IntoParallelIterator, ParallelIterator};
            (0..n).into_par_iter().map(op).collect()
        }
    } else {
        fn map_frames<F: Fn(usize) -> FrameStrain>(n: usize, op: F) -> Vec<FrameStrain> {
            (0..n).map(op).collect()
        }
    }
}

/// 应变方向.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// 径向: 由心腔穿过心肌向外.
    Radial,
    /// 周向: 绕心腔.
    Circumferential,
    /// 纵向: 心尖 - 基底方向.
    Longitudinal,
}

impl Direction {
    /// 全部方向, 顺序与落盘数组的第一维一致.
    pub const ALL: [Direction; 3] = [
        Direction::Radial,
        Direction::Circumferential,
        Direction::Longitudinal,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Radial => "radial",
            Direction::Circumferential => "circumferential",
            Direction::Longitudinal => "longitudinal",
        })
    }
}

impl FromStr for Direction {
    type Err = StrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "radial" => Ok(Direction::Radial),
            "c" | "circ" | "circumferential" => Ok(Direction::Circumferential),
            "l" | "long" | "longitudinal" => Ok(Direction::Longitudinal),
            _ => Err(StrainError::ParseSelector(s.to_string())),
        }
    }
}

/// 一个心动周期的节段应变曲线 (百分比).
///
/// 每个方向一个 `[18, T + 1]` 矩阵: 第 `k` 行对应节段 `k + 1`, 第 17 行为全局曲线.
/// 第 0 个样本恒为零.
#[derive(Clone, Debug, PartialEq)]
pub struct StrainCurve {
    /// 按 [`Direction::ALL`] 顺序排列.
    curves: [Array2<f64>; 3],
    counts: [usize; STRAIN_ROWS],
}

impl StrainCurve {
    /// 由逐帧位移场计算应变曲线. `fields[t]` 为第 `t` 帧相对参考帧的位移场,
    /// 第 0 帧的应变按定义为零.
    ///
    /// # 返回值
    ///
    /// - `fields` 为空时, 返回 `Err(StrainError::EmptySequence)`;
    /// - 位移场形状与节段标签不一致时, 返回 `Err(StrainError::ShapeMismatch)`.
    pub fn compute(
        fields: &[ArrayView4<f32>],
        aha: &AhaSegmentMap,
        frames: &LocalFrameField,
        config: &StrainConfig,
    ) -> StrainResult<Self> {
        if fields.is_empty() {
            return Err(StrainError::EmptySequence);
        }
        let (z, h, w) = aha.shape();
        for f in fields {
            if f.dim() != (z, h, w, 3) {
                return Err(StrainError::ShapeMismatch {
                    expected: vec![z, h, w, 3],
                    found: f.shape().to_vec(),
                });
            }
        }
        if frames.shape() != aha.shape() {
            let (fz, fh, fw) = frames.shape();
            return Err(StrainError::ShapeMismatch {
                expected: vec![z, h, w],
                found: vec![fz, fh, fw],
            });
        }

        let counts = FrameStrain::row_counts(aha);
        let anisotropy = config.anisotropy();
        let per_frame = |t: usize| -> FrameStrain {
            if t == 0 {
                FrameStrain::zeros(counts)
            } else {
                let fs = FrameStrain::compute(fields[t], aha, frames, anisotropy);
                debug!("frame {t}: global strain {:?}", fs.values.map(|d| d[STRAIN_ROWS - 1]));
                fs
            }
        };

        let raw = map_frames(fields.len(), per_frame);
        let curves = Self::assemble(&raw, config.smoothing_window());
        info!(
            "strain computed over {} frame(s), {} myocardial voxel(s)",
            fields.len(),
            counts[STRAIN_ROWS - 1]
        );
        Ok(Self { curves, counts })
    }

    /// 由 `(3, 18, T + 1)` 的堆叠数组与每行体素个数重建曲线, 例如读回落盘结果.
    ///
    /// # 返回值
    ///
    /// 数组前两维不是 `(3, 18)` 或不含任何样本时, 返回 `Err(StrainError::ShapeMismatch)`.
    pub fn from_stacked(stacked: Array3<f64>, counts: [usize; STRAIN_ROWS]) -> StrainResult<Self> {
        let (d, rows, n) = stacked.dim();
        if d != 3 || rows != STRAIN_ROWS || n == 0 {
            return Err(StrainError::ShapeMismatch {
                expected: vec![3, STRAIN_ROWS, n.max(1)],
                found: vec![d, rows, n],
            });
        }
        let curves = [0, 1, 2].map(|i| stacked.index_axis(Axis(0), i).to_owned());
        Ok(Self { curves, counts })
    }

    /// 按方向组装 `[行, 时间]` 矩阵并执行时间后处理.
    fn assemble(raw: &[FrameStrain], window: usize) -> [Array2<f64>; 3] {
        Direction::ALL.map(|d| {
            let mut m = Array2::from_shape_fn((STRAIN_ROWS, raw.len()), |(row, t)| {
                raw[t].values[d.index()][row]
            });
            temporal::post_process(&mut m, window);
            m
        })
    }

    /// 径向应变矩阵.
    #[inline]
    pub fn radial(&self) -> ArrayView2<'_, f64> {
        self.direction(Direction::Radial)
    }

    /// 周向应变矩阵.
    #[inline]
    pub fn circumferential(&self) -> ArrayView2<'_, f64> {
        self.direction(Direction::Circumferential)
    }

    /// 纵向应变矩阵.
    #[inline]
    pub fn longitudinal(&self) -> ArrayView2<'_, f64> {
        self.direction(Direction::Longitudinal)
    }

    /// 给定方向的应变矩阵.
    #[inline]
    pub fn direction(&self, d: Direction) -> ArrayView2<'_, f64> {
        self.curves[d.index()].view()
    }

    /// 每行参与平均的体素个数. 空节段为零.
    #[inline]
    pub fn counts(&self) -> &[usize; STRAIN_ROWS] {
        &self.counts
    }

    /// 时间样本个数 `T + 1`.
    #[inline]
    pub fn samples(&self) -> usize {
        self.curves[0].len_of(Axis(1))
    }

    /// 堆叠为 `(3, 18, T + 1)` 数组, 第一维按 [`Direction::ALL`] 排列.
    pub fn to_stacked(&self) -> Array3<f64> {
        Array3::from_shape_fn((3, STRAIN_ROWS, self.samples()), |(d, row, t)| {
            self.curves[d][(row, t)]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{label, GLOBAL_ROW};
    use crate::morph_3d::{CylinderPhantom, OrientedRoi};
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;

    #[test]
    fn test_reflect_index() {
        let got: Vec<_> = (-4..8).map(|i| reflect_index(i, 3)).collect();
        assert_eq!(got, vec![2, 2, 1, 0, 0, 1, 2, 2, 1, 0, 0, 1]);
        assert_eq!(reflect_index(-1, 1), 0);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("R".parse::<Direction>().unwrap(), Direction::Radial);
        assert_eq!(
            " Circumferential ".parse::<Direction>().unwrap(),
            Direction::Circumferential
        );
        assert_eq!("long".parse::<Direction>().unwrap(), Direction::Longitudinal);
        assert!(matches!(
            "axial".parse::<Direction>(),
            Err(StrainError::ParseSelector(_))
        ));
        assert_eq!(Direction::Radial.to_string(), "radial");
    }

    fn setup() -> (AhaSegmentMap, LocalFrameField) {
        let p = CylinderPhantom::new((16, 40, 40), (20.5, 20.5));
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        (
            AhaSegmentMap::classify(&roi, &StrainConfig::default()),
            LocalFrameField::build(&roi),
        )
    }

    #[test]
    fn test_first_sample_is_zero() {
        let (aha, frames) = setup();
        let fields: Vec<Array4<f32>> = (0..6)
            .map(|t| {
                Array4::from_shape_fn((16, 40, 40, 3), |(z, h, w, c)| {
                    0.01 * (t as f32) * (z + 2 * h + 3 * w + c) as f32
                })
            })
            .collect();
        let views: Vec<_> = fields.iter().map(|f| f.view()).collect();
        let curve = StrainCurve::compute(&views, &aha, &frames, &StrainConfig::default()).unwrap();
        assert_eq!(curve.samples(), 6);
        for d in Direction::ALL {
            assert!(curve.direction(d).column(0).iter().all(|v| *v == 0.0));
        }
        let stacked = curve.to_stacked();
        assert_eq!(stacked.dim(), (3, 18, 6));
        assert_eq!(stacked[(2, GLOBAL_ROW, 3)], curve.longitudinal()[(GLOBAL_ROW, 3)]);
    }

    #[test]
    fn test_uniform_radial_stretch() {
        // u_h = a h, u_w = a w: 径向与周向应变均为 a, 纵向为零.
        let a = 0.03f32;
        let (aha, frames) = setup();
        let field = Array4::from_shape_fn((16, 40, 40, 3), |(_, h, w, c)| match c {
            1 => a * h as f32,
            2 => a * w as f32,
            _ => 0.0,
        });
        let zero = Array4::zeros((16, 40, 40, 3));
        let views = [zero.view(), field.view()];
        let config = StrainConfig::default().with_smoothing_window(1);
        let curve = StrainCurve::compute(&views, &aha, &frames, &config).unwrap();
        // 只有两个样本时, 斜坡校正使末样本为零. 检查原始帧结果.
        let fs = FrameStrain::compute(field.view(), &aha, &frames, 4.0);
        for k in 0..16 {
            assert_abs_diff_eq!(fs.values[0][k], 3.0, epsilon = 1e-3);
            assert_abs_diff_eq!(fs.values[1][k], 3.0, epsilon = 1e-3);
            assert_abs_diff_eq!(fs.values[2][k], 0.0, epsilon = 1e-9);
        }
        assert!(curve.radial().iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_shape_checks() {
        let (aha, frames) = setup();
        let bad = Array4::zeros((16, 40, 41, 3));
        let e = StrainCurve::compute(&[bad.view()], &aha, &frames, &StrainConfig::default())
            .unwrap_err();
        assert!(matches!(e, StrainError::ShapeMismatch { .. }));
        let e = StrainCurve::compute(&[], &aha, &frames, &StrainConfig::default()).unwrap_err();
        assert!(matches!(e, StrainError::EmptySequence));
    }
}
