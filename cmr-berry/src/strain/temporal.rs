//! 应变曲线的时间后处理.
//!
//! 依次执行: 尾随滑动平均, 首样本置零, 端点斜坡校正.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis};

use super::reflect_index;

/// 尾随滑动平均: 第 `t` 个样本取 `[t - window + 1, t]` 的平均,
/// 起始处以反射方式延拓. 因此第 `k` 帧的形变不会影响 `k` 之前的样本.
pub fn trailing_moving_average(row: ArrayView1<f64>, window: usize) -> Array1<f64> {
    let n = row.len();
    if n == 0 || window <= 1 {
        return row.to_owned();
    }
    Array1::from_shape_fn(n, |t| {
        let lo = t as isize - window as isize + 1;
        (lo..=t as isize)
            .map(|i| row[reflect_index(i, n)])
            .sum::<f64>()
            / window as f64
    })
}

/// 将第 0 个样本强制置零.
#[inline]
pub fn zero_first_sample(mut row: ArrayViewMut1<f64>) {
    if let Some(v) = row.first_mut() {
        *v = 0.0;
    }
}

/// 端点斜坡校正: 第 `t` 个样本减去 `(last / T) * t`, 其中 `T` 为最后一个样本的索引.
///
/// 校正后最后一个样本为零. 该公式以曲线自身的终点值作为漂移估计,
/// 可能掩盖真实的舒张末期残余应变, 因此单独保留在这里. 只有一个样本时不做处理.
pub fn rebase_with_endpoint_ramp(mut row: ArrayViewMut1<f64>) {
    let n = row.len();
    if n < 2 {
        return;
    }
    let slope = row[n - 1] / (n - 1) as f64;
    row.indexed_iter_mut()
        .for_each(|(t, v)| *v -= slope * t as f64);
}

/// 对 `[行, 时间]` 矩阵的每一行依次执行全部时间后处理.
pub fn post_process(m: &mut Array2<f64>, window: usize) {
    for mut row in m.axis_iter_mut(Axis(0)) {
        let smoothed = trailing_moving_average(row.view(), window);
        row.assign(&smoothed);
        zero_first_sample(row.view_mut());
        rebase_with_endpoint_ramp(row.view_mut());
    }
}

/// 时间方向一阶导数, 规则与 `numpy.gradient` 一致.
pub fn time_gradient(series: ArrayView1<f64>) -> Array1<f64> {
    let n = series.len();
    Array1::from_shape_fn(n, |i| match n {
        0 | 1 => 0.0,
        _ if i == 0 => series[1] - series[0],
        _ if i == n - 1 => series[n - 1] - series[n - 2],
        _ => (series[i + 1] - series[i - 1]) * 0.5,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_moving_average_of_constant() {
        let row = Array1::from_elem(10, 2.5);
        let avg = trailing_moving_average(row.view(), 4);
        avg.iter().for_each(|v| assert_abs_diff_eq!(*v, 2.5, epsilon = 1e-12));
    }

    #[test]
    fn test_moving_average_is_causal() {
        let mut row = Array1::zeros(10);
        row[5] = 4.0;
        let avg = trailing_moving_average(row.view(), 4);
        assert_eq!(avg, arr1(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_moving_average_reflects_start() {
        let row = arr1(&[4.0, 0.0, 0.0, 0.0, 0.0]);
        let avg = trailing_moving_average(row.view(), 4);
        // [x2 x1 x0 | x0] = (0 + 0 + 4 + 4) / 4
        assert_abs_diff_eq!(avg[0], 2.0, epsilon = 1e-12);
        // [x1 x0 | x0 x1]
        assert_abs_diff_eq!(avg[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(avg[3], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(avg[4], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rebase() {
        let mut row = arr1(&[0.0, 1.0, 2.0, 3.0]);
        rebase_with_endpoint_ramp(row.view_mut());
        row.iter().for_each(|v| assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12));

        let mut single = arr1(&[7.0]);
        rebase_with_endpoint_ramp(single.view_mut());
        assert_eq!(single[0], 7.0);
    }

    #[test]
    fn test_post_process_first_sample_zero() {
        let mut m = arr2(&[[3.0, 3.0, 3.0, 3.0, 3.0], [1.0, -2.0, 5.0, 0.5, 2.0]]);
        post_process(&mut m, 4);
        for row in m.axis_iter(Axis(0)) {
            assert_eq!(row[0], 0.0);
        }
        // 常数行: 平滑后首样本置零, 末样本 3, 斜坡 3/4.
        assert_abs_diff_eq!(m[(0, 2)], 3.0 - 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m[(0, 4)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_time_gradient() {
        let g = time_gradient(arr1(&[0.0, 1.0, 4.0, 9.0]).view());
        assert_eq!(g, arr1(&[1.0, 2.0, 4.0, 5.0]));
        assert_eq!(time_gradient(arr1(&[3.0]).view()), arr1(&[0.0]));
    }
}
