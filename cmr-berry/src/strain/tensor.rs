//! 位移梯度, 小应变张量与局部投影.

use ndarray::ArrayView4;

use crate::consts::{AHA_SEGMENTS, GLOBAL_ROW, PERCENT, STRAIN_ROWS};
use crate::frame::LocalFrameField;
use crate::aha::AhaSegmentMap;
use crate::{Idx3d, Vec3};

/// 3x3 矩阵, 行优先.
pub type Mat3 = [[f64; 3]; 3];

/// 一维数值导数, 规则与 `numpy.gradient` 一致: 内部为中心差分,
/// 两端为一阶单侧差分, 长度为 1 时导数为零.
#[inline]
fn derivative<F: Fn(usize) -> f64>(i: usize, n: usize, f: F) -> f64 {
    match n {
        0 | 1 => 0.0,
        _ if i == 0 => f(1) - f(0),
        _ if i == n - 1 => f(n - 1) - f(n - 2),
        _ => (f(i + 1) - f(i - 1)) * 0.5,
    }
}

/// 体素 `pos` 处的位移梯度 `G[i][j] = ∂u_i / ∂x_j`.
///
/// 位移分量 `0` (层间方向) 在求导前乘以 `anisotropy`.
pub fn displacement_gradient(field: ArrayView4<f32>, (z, h, w): Idx3d, anisotropy: f64) -> Mat3 {
    let (nz, nh, nw, _) = field.dim();
    let scale = [anisotropy, 1.0, 1.0];
    let mut g = [[0.0; 3]; 3];
    for (i, row) in g.iter_mut().enumerate() {
        let u = |p: Idx3d| field[(p.0, p.1, p.2, i)] as f64 * scale[i];
        row[0] = derivative(z, nz, |k| u((k, h, w)));
        row[1] = derivative(h, nh, |k| u((z, k, w)));
        row[2] = derivative(w, nw, |k| u((z, h, k)));
    }
    g
}

/// 小应变张量 `E = (G + G^T) / 2`.
#[inline]
pub fn small_strain(g: &Mat3) -> Mat3 {
    let mut e = [[0.0; 3]; 3];
    for (i, row) in e.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = 0.5 * (g[i][j] + g[j][i]);
        }
    }
    e
}

/// 二次型 `v^T E v`.
#[inline]
pub fn project(e: &Mat3, v: &Vec3) -> f64 {
    let mut ans = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            ans += v[i] * e[i][j] * v[j];
        }
    }
    ans
}

/// 单帧的节段平均应变 (百分比), 按 (径向, 周向, 纵向) 排列.
///
/// 第 `k` 行对应节段 `k + 1`, 最后一行为全部心肌体素的平均.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameStrain {
    /// `[径向, 周向, 纵向][行]`.
    pub values: [[f64; STRAIN_ROWS]; 3],
    /// 每行参与平均的体素个数.
    pub counts: [usize; STRAIN_ROWS],
}

impl FrameStrain {
    /// 全零结果, 用于参考帧.
    pub fn zeros(counts: [usize; STRAIN_ROWS]) -> Self {
        Self {
            values: [[0.0; STRAIN_ROWS]; 3],
            counts,
        }
    }

    /// 统计每行的体素个数.
    pub fn row_counts(aha: &AhaSegmentMap) -> [usize; STRAIN_ROWS] {
        let mut counts = [0; STRAIN_ROWS];
        counts[..AHA_SEGMENTS].copy_from_slice(&aha.counts());
        counts[GLOBAL_ROW] = counts[..AHA_SEGMENTS].iter().sum();
        counts
    }

    /// 计算单帧位移场在各节段上的平均应变.
    ///
    /// `field` 形状须为 `(z, h, w, 3)` 且与 `aha`, `frames` 一致, 由调用方保证.
    pub fn compute(
        field: ArrayView4<f32>,
        aha: &AhaSegmentMap,
        frames: &LocalFrameField,
        anisotropy: f64,
    ) -> Self {
        let mut sums = [[0.0; STRAIN_ROWS]; 3];
        let counts = Self::row_counts(aha);

        for (pos, &seg) in aha.data().indexed_iter().filter(|(_, s)| **s != 0) {
            let e = small_strain(&displacement_gradient(field, pos, anisotropy));
            let axes = frames.axes_at(pos);
            let proj = [
                project(&e, &axes.radial),
                project(&e, &axes.circumferential),
                project(&e, &axes.longitudinal),
            ];
            for (d, p) in proj.iter().enumerate() {
                sums[d][seg as usize - 1] += p;
                sums[d][GLOBAL_ROW] += p;
            }
        }

        for row in sums.iter_mut() {
            for (v, &n) in row.iter_mut().zip(counts.iter()) {
                *v = if n == 0 { 0.0 } else { *v / n as f64 * PERCENT };
            }
        }
        Self {
            values: sums,
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrainConfig;
    use crate::consts::label;
    use crate::morph_3d::{CylinderPhantom, OrientedRoi};
    use approx::assert_abs_diff_eq;
    use ndarray::{Array3, Array4};

    #[test]
    fn test_derivative_rules() {
        let f = [1.0, 4.0, 9.0, 16.0];
        let d: Vec<f64> = (0..4).map(|i| derivative(i, 4, |k| f[k])).collect();
        assert_eq!(d, vec![3.0, 4.0, 6.0, 7.0]);
        assert_eq!(derivative(0, 1, |_| 5.0), 0.0);
    }

    #[test]
    fn test_gradient_of_linear_field() {
        // u = (0.1 z, 0.2 w, 0.3 h)
        let field = Array4::from_shape_fn((4, 5, 6, 3), |(z, h, w, c)| match c {
            0 => 0.1 * z as f32,
            1 => 0.2 * w as f32,
            _ => 0.3 * h as f32,
        });
        for pos in [(0, 0, 0), (2, 3, 4), (3, 4, 5)] {
            let g = displacement_gradient(field.view(), pos, 4.0);
            assert_abs_diff_eq!(g[0][0], 0.4, epsilon = 1e-6);
            assert_abs_diff_eq!(g[1][2], 0.2, epsilon = 1e-6);
            assert_abs_diff_eq!(g[2][1], 0.3, epsilon = 1e-6);
            assert_abs_diff_eq!(g[0][1], 0.0, epsilon = 1e-6);
        }
        let e = small_strain(&displacement_gradient(field.view(), (1, 1, 1), 1.0));
        assert_abs_diff_eq!(e[1][2], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(e[2][1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(project(&e, &[0.0, 1.0, 0.0]), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(project(&e, &[1.0, 0.0, 0.0]), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_global_row_is_voxel_weighted_mean() {
        // 层内均匀拉伸 u_h = a h, u_w = b w.
        let (a, b) = (0.02f32, 0.05f32);
        let p = CylinderPhantom::new((16, 40, 40), (20.5, 20.5));
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        let aha = AhaSegmentMap::classify(&roi, &StrainConfig::default());
        let frames = LocalFrameField::build(&roi);
        let field = Array4::from_shape_fn((16, 40, 40, 3), |(_, h, w, c)| match c {
            1 => a * h as f32,
            2 => b * w as f32,
            _ => 0.0,
        });
        let fs = FrameStrain::compute(field.view(), &aha, &frames, 4.0);

        for d in 0..3 {
            let weighted: f64 = (0..AHA_SEGMENTS)
                .map(|k| fs.values[d][k] * fs.counts[k] as f64)
                .sum::<f64>()
                / fs.counts[GLOBAL_ROW] as f64;
            assert_abs_diff_eq!(fs.values[d][GLOBAL_ROW], weighted, epsilon = 1e-9);
        }

        // 直接在所有心肌体素上计算.
        let positions = roi.myo_positions();
        let direct: f64 = positions
            .iter()
            .map(|&pos| {
                let r = frames.axes_at(pos).radial;
                (a as f64) * r[1] * r[1] + (b as f64) * r[2] * r[2]
            })
            .sum::<f64>()
            / positions.len() as f64
            * PERCENT;
        assert_eq!(fs.counts[GLOBAL_ROW], positions.len());
        assert_abs_diff_eq!(fs.values[0][GLOBAL_ROW], direct, epsilon = 1e-4);
        // 层内变形不产生纵向应变.
        assert!(fs.values[2].iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_empty_segment_is_zero() {
        let mut data = Array3::zeros((3, 4, 4));
        data[(1, 1, 1)] = 5u8;
        let aha = AhaSegmentMap::from_raw(data);
        let p = CylinderPhantom::new((3, 4, 4), (1.5, 1.5))
            .with_radii(0.0, 3.0)
            .with_myo_slices(1..2);
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        let frames = LocalFrameField::build(&roi);
        let field = Array4::from_elem((3, 4, 4, 3), 1.0f32);
        let fs = FrameStrain::compute(field.view(), &aha, &frames, 4.0);
        assert_eq!(fs.counts[4], 1);
        assert_eq!(fs.counts[0], 0);
        assert_eq!(fs.values[0][0], 0.0);
        assert_eq!(fs.counts[GLOBAL_ROW], 1);
    }
}
