//! 规范化网格重采样与平面 ROI 裁剪.
//!
//! 重采样保持物理范围不变: 新间距 = 旧尺寸 / 新尺寸 × 旧间距.
//! 目标体素 `i` 的物理位置与源体素 `i * from / to` 重合, 取最近邻.

use ndarray::{s, Array3, ArrayView3};
use num::Zero;

use crate::data::{CardiacVolume, MyoLabel, VolumeAttr};
use crate::{Idx2d, Idx3d, Point2d};

/// 目标索引 `i` 在长度为 `from` 的源轴上的最近邻索引. 结果被限制在源轴范围内.
#[inline]
pub fn nearest_index(i: usize, from: usize, to: usize) -> usize {
    debug_assert!(from > 0 && to > 0);
    let src = (i as f64 * from as f64 / to as f64).round() as usize;
    src.min(from - 1)
}

/// 重采样后的体素间距 `[z, h, w]`.
#[inline]
pub fn resampled_spacing(spacing: [f64; 3], from: Idx3d, to: Idx3d) -> [f64; 3] {
    let from = [from.0, from.1, from.2];
    let to = [to.0, to.1, to.2];
    [0, 1, 2].map(|i| spacing[i] * from[i] as f64 / to[i] as f64)
}

/// 将 `data` 按最近邻规则重采样到 `shape`.
///
/// 源数据或目标形状为空时, 返回目标形状的默认值数组.
pub fn resample_nearest<T: Copy + Default>(data: ArrayView3<T>, shape: Idx3d) -> Array3<T> {
    let (fz, fh, fw) = data.dim();
    let (tz, th, tw) = shape;
    if fz * fh * fw == 0 || tz * th * tw == 0 {
        return Array3::from_elem(shape, T::default());
    }
    let zs: Vec<usize> = (0..tz).map(|i| nearest_index(i, fz, tz)).collect();
    let hs: Vec<usize> = (0..th).map(|i| nearest_index(i, fh, th)).collect();
    let ws: Vec<usize> = (0..tw).map(|i| nearest_index(i, fw, tw)).collect();
    Array3::from_shape_fn(shape, |(z, h, w)| data[(zs[z], hs[h], ws[w])])
}

/// ROI 左上角在源切片上的 (可能为负的) 位置: `floor(center) - size / 2`.
#[inline]
pub fn roi_origin((ch, cw): Point2d, (sh, sw): Idx2d) -> (isize, isize) {
    (
        ch.floor() as isize - (sh / 2) as isize,
        cw.floor() as isize - (sw / 2) as isize,
    )
}

/// 保留全部切片, 从 `origin` 开始裁剪大小为 `size` 的平面区域.
/// 超出源数据的部分以零填充.
pub fn crop_in_plane<T: Copy + Zero>(
    data: ArrayView3<T>,
    (oh, ow): (isize, isize),
    (sh, sw): Idx2d,
) -> Array3<T> {
    let (z, h, w) = data.dim();
    let mut ans = Array3::from_elem((z, sh, sw), T::zero());

    // 源与目标在两个平面轴上的重叠区间.
    let overlap = |origin: isize, size: usize, len: usize| -> Option<(usize, usize, usize)> {
        let src_lo = origin.max(0);
        let src_hi = (origin + size as isize).min(len as isize);
        (src_lo < src_hi).then(|| {
            (
                src_lo as usize,
                src_hi as usize,
                (src_lo - origin) as usize,
            )
        })
    };

    let (Some((h0, h1, dh)), Some((w0, w1, dw))) = (overlap(oh, sh, h), overlap(ow, sw, w)) else {
        return ans;
    };
    ans.slice_mut(s![.., dh..dh + (h1 - h0), dw..dw + (w1 - w0)])
        .assign(&data.slice(s![.., h0..h1, w0..w1]));
    ans
}

impl CardiacVolume {
    /// 最近邻重采样到 `shape`, 保持物理范围.
    pub fn resampled(&self, shape: Idx3d) -> Self {
        let spacing = resampled_spacing(self.spacing(), self.shape(), shape);
        Self::from_array(resample_nearest(self.data(), shape), spacing)
    }
}

impl MyoLabel {
    /// 最近邻重采样到 `shape`, 保持物理范围.
    pub fn resampled(&self, shape: Idx3d) -> Self {
        let spacing = resampled_spacing(self.spacing(), self.shape(), shape);
        Self::from_array(resample_nearest(self.data(), shape), spacing)
    }
}
