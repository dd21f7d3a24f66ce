//! 心肌局部坐标系: 每个心肌体素上的 (纵向, 周向, 径向) 右手正交基.
//!
//! 所有向量按 `(z, h, w)` 顺序存储. 纵向轴沿切片方向, 倒置时反向;
//! 径向轴由切片质心指向体素; 周向轴由径向轴在层内旋转 90° 得到,
//! 并满足 `l × c = r`.

use log::debug;
use ndarray::{Array5, ArrayView5};

use crate::consts::DEGENERATE_OFFSET;
use crate::morph_3d::OrientedRoi;
use crate::{Idx3d, Point2d, Vec3};

/// 列向量在 3x3 基矩阵中的位置.
pub mod column {
    /// 纵向轴.
    pub const LONGITUDINAL: usize = 0;
    /// 周向轴.
    pub const CIRCUMFERENTIAL: usize = 1;
    /// 径向轴.
    pub const RADIAL: usize = 2;
}

#[inline]
pub(crate) fn dot3(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross3(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 单个体素上的局部正交基.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalAxes {
    /// 纵向轴.
    pub longitudinal: Vec3,
    /// 周向轴.
    pub circumferential: Vec3,
    /// 径向轴.
    pub radial: Vec3,
}

impl LocalAxes {
    /// 以纵向符号 `sign`, 切片质心 `centroid` 计算层内位置 `(h, w)` 处的基.
    ///
    /// 位置与质心重合时, 层内两个分量各加 [`DEGENERATE_OFFSET`] 后再归一化.
    pub fn at(sign: f64, (ch, cw): Point2d, (h, w): Point2d) -> Self {
        let (mut dh, mut dw) = (h - ch, w - cw);
        if dh == 0.0 && dw == 0.0 {
            debug!("voxel ({h}, {w}) coincides with slice centroid, using offset direction");
            dh += DEGENERATE_OFFSET;
            dw += DEGENERATE_OFFSET;
        }
        let n = dh.hypot(dw);
        let (rh, rw) = (dh / n, dw / n);
        Self {
            longitudinal: [sign, 0.0, 0.0],
            circumferential: [0.0, sign * rw, -sign * rh],
            radial: [0.0, rh, rw],
        }
    }

    /// 按 (纵向, 周向, 径向) 顺序的三个轴.
    #[inline]
    pub fn columns(&self) -> [Vec3; 3] {
        [self.longitudinal, self.circumferential, self.radial]
    }
}

/// 覆盖整个 ROI 的局部坐标场, 形状为 `(z, h, w, 3, 3)`.
///
/// 最后一维为列索引, 见 [`column`]. 非心肌体素全部为零.
#[derive(Debug, Clone)]
pub struct LocalFrameField {
    data: Array5<f64>,
}

impl LocalFrameField {
    /// 由 ROI 构建局部坐标场.
    pub fn build(roi: &OrientedRoi) -> Self {
        let (z, h, w) = roi.shape();
        let mut data = Array5::zeros((z, h, w, 3, 3));
        let sign = roi.sign();
        for c in roi.centroids() {
            let sli = roi.label().slice_at(c.z);
            for ((vh, vw), _) in sli.indexed_iter().filter(|(_, p)| **p == roi.myo_label()) {
                let axes = LocalAxes::at(sign, c.point(), (vh as f64, vw as f64));
                for (col, v) in axes.columns().iter().enumerate() {
                    for (row, x) in v.iter().enumerate() {
                        data[(c.z, vh, vw, row, col)] = *x;
                    }
                }
            }
        }
        Self { data }
    }

    /// 体素 `pos` 处的基. 非心肌体素上三个轴均为零向量.
    pub fn axes_at(&self, (z, h, w): Idx3d) -> LocalAxes {
        let col = |j: usize| -> Vec3 { [0, 1, 2].map(|i| self.data[(z, h, w, i, j)]) };
        LocalAxes {
            longitudinal: col(column::LONGITUDINAL),
            circumferential: col(column::CIRCUMFERENTIAL),
            radial: col(column::RADIAL),
        }
    }

    /// 场的空间形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let (z, h, w, _, _) = self.data.dim();
        (z, h, w)
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView5<'_, f64> {
        self.data.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::label;
    use crate::morph_3d::CylinderPhantom;
    use approx::assert_abs_diff_eq;

    fn assert_orthonormal_right_handed(a: &LocalAxes) {
        let [l, c, r] = a.columns();
        for v in [&l, &c, &r] {
            assert_abs_diff_eq!(dot3(v, v), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(dot3(&l, &c), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dot3(&l, &r), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dot3(&c, &r), 0.0, epsilon = 1e-12);
        let lc = cross3(&l, &c);
        for i in 0..3 {
            assert_abs_diff_eq!(lc[i], r[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_axes_right_handed() {
        for sign in [1.0, -1.0] {
            for pos in [(3.0, 7.0), (-2.0, 0.5), (10.0, 10.0), (0.0, -4.0)] {
                assert_orthonormal_right_handed(&LocalAxes::at(sign, (1.0, 2.0), pos));
            }
        }
    }

    #[test]
    fn test_radial_points_outward() {
        let a = LocalAxes::at(1.0, (5.0, 5.0), (9.0, 5.0));
        assert_eq!(a.radial, [0.0, 1.0, 0.0]);
        assert_eq!(a.longitudinal, [1.0, 0.0, 0.0]);
        assert_eq!(a.circumferential, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_degenerate_offset() {
        let a = LocalAxes::at(1.0, (4.0, 4.0), (4.0, 4.0));
        let k = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(a.radial[1], k, epsilon = 1e-12);
        assert_abs_diff_eq!(a.radial[2], k, epsilon = 1e-12);
        assert_orthonormal_right_handed(&a);
    }

    #[test]
    fn test_field_over_phantom() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0));
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        let field = LocalFrameField::build(&roi);
        assert_eq!(field.shape(), (16, 40, 40));

        for pos in roi.myo_positions() {
            assert_orthonormal_right_handed(&field.axes_at(pos));
        }
        let outside = field.axes_at((6, 20, 20));
        assert_eq!(outside.radial, [0.0; 3]);
        assert_eq!(outside.longitudinal, [0.0; 3]);

        // 质心正下方的体素径向轴指向 h 增加的方向.
        let below = field.axes_at((6, 28, 20));
        assert_abs_diff_eq!(below.radial[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_field_inverted_flips_longitudinal() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0)).with_rv_slices(4..6);
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        assert!(roi.inverted());
        let a = LocalFrameField::build(&roi).axes_at((6, 28, 20));
        assert_eq!(a.longitudinal, [-1.0, 0.0, 0.0]);
        assert_orthonormal_right_handed(&a);
    }
}
