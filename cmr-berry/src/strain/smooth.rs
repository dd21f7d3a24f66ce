//! 位移场的层内高斯平滑.
//!
//! 使用可分离的一维核, 依次沿 h, w 两个轴卷积, z 方向与分量方向不做平滑.
//! 边界采用反射延拓 `(d c b a | a b c d | d c b a)`.

use ndarray::{Array4, Axis};

use super::reflect_index;
use crate::consts::GAUSSIAN_TRUNCATE;

/// 归一化的对称一维高斯核.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    taps: Vec<f64>,
}

impl GaussianKernel {
    /// 标准差为 `sigma` (体素) 的核, 半径为 `int(truncate * sigma + 0.5)`.
    /// `sigma` 非正或非有限时返回 `None`.
    pub fn new(sigma: f64, truncate: f64) -> Option<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return None;
        }
        let radius = (truncate * sigma + 0.5) as isize;
        let mut taps: Vec<f64> = (-radius..=radius)
            .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
            .collect();
        let sum: f64 = taps.iter().sum();
        taps.iter_mut().for_each(|t| *t /= sum);
        Some(Self { taps })
    }

    /// 核半径.
    #[inline]
    pub fn radius(&self) -> usize {
        self.taps.len() / 2
    }

    /// 核系数, 由左到右.
    #[inline]
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// 对一条线做卷积, 结果写回 `line`.
    pub fn filter_line(&self, line: &mut [f64]) {
        let n = line.len();
        if n == 0 {
            return;
        }
        let r = self.radius() as isize;
        let src = line.to_vec();
        for (i, out) in line.iter_mut().enumerate() {
            *out = self
                .taps
                .iter()
                .zip(-r..=r)
                .map(|(t, k)| t * src[reflect_index(i as isize + k, n)])
                .sum();
        }
    }
}

/// 沿 h, w 两个轴对形状为 `(z, h, w, 3)` 的位移场做高斯平滑.
/// `sigma` 为零时不做任何处理.
pub fn smooth_in_plane(field: &mut Array4<f32>, sigma: f64) {
    let Some(kernel) = GaussianKernel::new(sigma, GAUSSIAN_TRUNCATE) else {
        return;
    };
    let mut buf = Vec::new();
    for ax in [Axis(1), Axis(2)] {
        for mut lane in field.lanes_mut(ax) {
            buf.clear();
            buf.extend(lane.iter().map(|v| *v as f64));
            kernel.filter_line(&mut buf);
            lane.iter_mut().zip(&buf).for_each(|(v, s)| *v = *s as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kernel() {
        let k = GaussianKernel::new(2.0, 4.0).unwrap();
        assert_eq!(k.radius(), 8);
        assert_abs_diff_eq!(k.taps().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(k.taps()[0], k.taps()[16], epsilon = 1e-15);
        assert!(k.taps()[8] > k.taps()[7]);
        assert!(GaussianKernel::new(0.0, 4.0).is_none());
    }

    #[test]
    fn test_constant_is_preserved() {
        let k = GaussianKernel::new(1.0, 4.0).unwrap();
        let mut line = vec![3.0; 5];
        k.filter_line(&mut line);
        line.iter().for_each(|v| assert_abs_diff_eq!(*v, 3.0, epsilon = 1e-12));
    }

    #[test]
    fn test_reflect_boundary() {
        // 半径为 1 的核, 手动验证边界.
        let k = GaussianKernel {
            taps: vec![0.25, 0.5, 0.25],
        };
        let mut line = vec![4.0, 0.0, 0.0];
        k.filter_line(&mut line);
        // 左边界反射为 4 | 4 0 0 | 0.
        assert_abs_diff_eq!(line[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(line[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(line[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_in_plane_keeps_z_and_components() {
        let mut field = Array4::<f32>::zeros((3, 9, 9, 3));
        field[(1, 4, 4, 2)] = 1.0;
        let before_sum: f32 = field.sum();
        smooth_in_plane(&mut field, 1.0);
        // 其他层与其他分量保持为零.
        assert!(field.index_axis(Axis(0), 0).iter().all(|v| *v == 0.0));
        assert!(field.index_axis(Axis(3), 0).iter().all(|v| *v == 0.0));
        // 远离边界时总量守恒.
        assert_abs_diff_eq!(field.sum(), before_sum, epsilon = 1e-4);
        assert!(field[(1, 4, 4, 2)] < 1.0 && field[(1, 4, 5, 2)] > 0.0);

        let mut unchanged = Array4::<f32>::ones((1, 2, 2, 3));
        smooth_in_plane(&mut unchanged, 0.0);
        assert!(unchanged.iter().all(|v| *v == 1.0));
    }
}
