use std::ops::Range;

use ndarray::Array3;

use crate::consts::label;
use crate::{CardiacVolume, Idx3d, MyoLabel, Point2d};

/// RV 圆盘中心到左心室轴的距离超出心外膜半径的部分.
const RV_GAP: f64 = 4.0;
/// RV 圆盘半径.
const RV_RADIUS: f64 = 3.0;

/// 合成的左心室模体: 空心圆柱 (心肌) 加一个位于固定角度的 RV 圆盘.
///
/// 默认内半径 5, 外半径 10, 心肌占据 `4..12` 层, RV 位于 `8..12` 层的 `0°` 方向
/// (h 增加的方向), 因此切片顺序非倒置, 心尖位于 z 较小的一端.
#[derive(Debug, Clone)]
pub struct CylinderPhantom {
    shape: Idx3d,
    center: Point2d,
    inner: f64,
    outer: f64,
    myo_slices: Range<usize>,
    rv_slices: Option<Range<usize>>,
    /// RV 方向的角度.
    rv_angle: f64,
    /// 心尖端被填实的切片数.
    apex_cap: usize,
}

impl CylinderPhantom {
    /// 以 `center` 为圆柱轴心, 在形状为 `shape` 的网格上创建默认模体.
    pub fn new(shape: Idx3d, center: Point2d) -> Self {
        Self {
            shape,
            center,
            inner: 5.0,
            outer: 10.0,
            myo_slices: 4..12,
            rv_slices: Some(8..12),
            rv_angle: 0.0,
            apex_cap: 0,
        }
    }

    /// 设置心内膜与心外膜半径.
    pub fn with_radii(mut self, inner: f64, outer: f64) -> Self {
        self.inner = inner;
        self.outer = outer;
        self
    }

    /// 设置心肌所在切片.
    pub fn with_myo_slices(mut self, slices: Range<usize>) -> Self {
        self.myo_slices = slices;
        self
    }

    /// 设置 RV 所在切片.
    pub fn with_rv_slices(mut self, slices: Range<usize>) -> Self {
        self.rv_slices = Some(slices);
        self
    }

    /// 移除 RV.
    pub fn without_rv(mut self) -> Self {
        self.rv_slices = None;
        self
    }

    /// 设置 RV 方向角度. h 增加的方向为 `0°`, w 增加的方向为 `90°`.
    pub fn with_rv_angle(mut self, angle: f64) -> Self {
        self.rv_angle = angle;
        self
    }

    /// 将 z 最小的 `n` 层心肌切片填实, 模拟没有心腔的心尖帽.
    pub fn with_apex_cap(mut self, n: usize) -> Self {
        self.apex_cap = n;
        self
    }

    /// 网格形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 圆柱轴心.
    #[inline]
    pub fn center(&self) -> Point2d {
        self.center
    }

    /// 心肌所在切片.
    #[inline]
    pub fn myo_slices(&self) -> Range<usize> {
        self.myo_slices.clone()
    }

    #[inline]
    fn radius_at(&self, h: usize, w: usize) -> f64 {
        (h as f64 - self.center.0).hypot(w as f64 - self.center.1)
    }

    fn rv_center(&self) -> Point2d {
        let arc = self.rv_angle.to_radians();
        let d = self.outer + RV_GAP;
        (self.center.0 + d * arc.cos(), self.center.1 + d * arc.sin())
    }

    /// 体素 `(z, h, w)` 处的标签值.
    pub fn label_at(&self, (z, h, w): Idx3d) -> u8 {
        if self.myo_slices.contains(&z) {
            let r = self.radius_at(h, w);
            let capped = z < self.myo_slices.start + self.apex_cap;
            if r <= self.outer && (capped || r >= self.inner) {
                return label::MYO;
            }
            if r < self.inner {
                return label::LV;
            }
        }
        if let Some(rv) = &self.rv_slices {
            let (rh, rw) = self.rv_center();
            if rv.contains(&z) && (h as f64 - rh).hypot(w as f64 - rw) <= RV_RADIUS {
                return label::RV;
            }
        }
        label::BACKGROUND
    }

    /// 体素 `(z, h, w)` 是否为心肌.
    #[inline]
    pub fn is_myo(&self, pos: Idx3d) -> bool {
        self.label_at(pos) == label::MYO
    }

    /// 生成分割标签. 体素间距为 1 毫米.
    pub fn label(&self) -> MyoLabel {
        MyoLabel::from_array(Array3::from_shape_fn(self.shape, |p| self.label_at(p)), [1.0; 3])
    }

    /// 生成一帧灰度图像. 不同组织取不同灰度.
    pub fn volume(&self) -> CardiacVolume {
        let data = Array3::from_shape_fn(self.shape, |p| match self.label_at(p) {
            label::MYO => 1.0,
            label::RV => 0.6,
            label::LV => 0.3,
            _ => 0.0,
        });
        CardiacVolume::from_array(data, [1.0; 3])
    }
}

#[cfg(test)]
mod tests {
    use super::CylinderPhantom;
    use crate::consts::label;
    use crate::VolumeAttr;

    #[test]
    fn test_default_layout() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0));
        let l = p.label();
        assert_eq!(l.shape(), (16, 40, 40));
        assert_eq!(p.label_at((6, 20, 20)), label::LV);
        assert_eq!(p.label_at((6, 27, 20)), label::MYO);
        assert_eq!(p.label_at((6, 34, 20)), label::BACKGROUND);
        assert_eq!(p.label_at((9, 34, 20)), label::RV);
        assert_eq!(p.label_at((2, 27, 20)), label::BACKGROUND);
        assert_eq!(l.slices_containing(label::MYO), (4..12).collect::<Vec<_>>());
        assert_eq!(l.slices_containing(label::RV), (8..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_apex_cap_and_rotation() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0))
            .with_apex_cap(2)
            .with_rv_angle(90.0);
        assert!(p.is_myo((4, 20, 20)));
        assert!(p.is_myo((5, 20, 20)));
        assert!(!p.is_myo((6, 20, 20)));
        assert_eq!(p.label_at((9, 20, 34)), label::RV);
        assert_eq!(p.label_at((9, 34, 20)), label::BACKGROUND);
    }
}
