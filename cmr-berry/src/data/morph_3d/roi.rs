use log::{debug, info, warn};
use ndarray::Array3;

use crate::config::StrainConfig;
use crate::data::resample::{crop_in_plane, resample_nearest, roi_origin};
use crate::data::z_score;
use crate::error::{StrainError, StrainResult};
use crate::{CardiacVolume, Idx2d, Idx3d, MyoLabel, Point2d, Point3d, VolumeAttr};

/// 一层含心肌切片的左心室质心.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SliceCentroid {
    /// 切片索引.
    pub z: usize,
    /// 质心高度坐标.
    pub h: f64,
    /// 质心宽度坐标.
    pub w: f64,
}

impl SliceCentroid {
    /// 平面坐标 `(h, w)`.
    #[inline]
    pub fn point(&self) -> Point2d {
        (self.h, self.w)
    }
}

/// 规范化并裁剪后的心肌 ROI, 附带方向信息.
///
/// ROI 内的标签保留原分割的全部标签值, 以便之后定位 RV 与心腔.
#[derive(Debug, Clone)]
pub struct OrientedRoi {
    label: MyoLabel,
    myo_label: u8,
    rv_label: u8,
    /// 规范化网格形状. 图像帧先重采样到该形状, 再按 `origin` 裁剪.
    canonical_shape: Idx3d,
    /// ROI 左上角在规范化网格上的位置.
    origin: (isize, isize),
    /// 从基底到心尖排列.
    centroids: Vec<SliceCentroid>,
    rv_landmark: Option<Point3d>,
    inverted: bool,
}

impl OrientedRoi {
    /// 直接以 (已经规范化并裁剪的) 标签构建 ROI. 图像帧应当与 `label` 形状一致.
    ///
    /// # 返回值
    ///
    /// 标签中不存在心肌时, 返回 `Err(StrainError::NoMyocardium)`.
    pub fn from_mask(label: MyoLabel, myo_label: u8, rv_label: u8) -> StrainResult<Self> {
        let shape = label.shape();
        Self::with_geometry(label, myo_label, rv_label, shape, (0, 0))
    }

    fn with_geometry(
        label: MyoLabel,
        myo_label: u8,
        rv_label: u8,
        canonical_shape: Idx3d,
        origin: (isize, isize),
    ) -> StrainResult<Self> {
        let inverted = match label.largest_slice(rv_label) {
            Some(z) => {
                debug!("RV cross section is largest at slice {z}");
                z < label.len_z() / 2
            }
            None => {
                warn!("no RV voxel (label {rv_label}) inside ROI, assuming non-inverted stack");
                false
            }
        };

        let mut centroids: Vec<SliceCentroid> = label
            .slices_containing(myo_label)
            .into_iter()
            .filter_map(|z| {
                let (h, w) = label.slice_center_of_mass(z, myo_label)?;
                Some(SliceCentroid { z, h, w })
            })
            .collect();
        if centroids.is_empty() {
            return Err(StrainError::NoMyocardium(myo_label));
        }
        // 非倒置时基底为最高层.
        if !inverted {
            centroids.reverse();
        }

        let rv_landmark = label.center_of_mass(rv_label);
        info!(
            "oriented ROI: shape {:?}, {} myocardial slice(s), inverted: {inverted}",
            label.shape(),
            centroids.len()
        );
        Ok(Self {
            label,
            myo_label,
            rv_label,
            canonical_shape,
            origin,
            centroids,
            rv_landmark,
            inverted,
        })
    }

    /// 替换 RV 标志点.
    #[inline]
    pub fn with_rv_landmark(mut self, landmark: Option<Point3d>) -> Self {
        self.rv_landmark = landmark;
        self
    }

    /// ROI 内的标签.
    #[inline]
    pub fn label(&self) -> &MyoLabel {
        &self.label
    }

    /// ROI 形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.label.shape()
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

    /// ROI 左上角在规范化网格上的位置.
    #[inline]
    pub fn origin(&self) -> (isize, isize) {
        self.origin
    }

    /// 从基底到心尖排列的切片质心.
    #[inline]
    pub fn centroids(&self) -> &[SliceCentroid] {
        &self.centroids
    }

    /// 最靠近基底的切片质心.
    #[inline]
    pub fn base_centroid(&self) -> &SliceCentroid {
        // 构造时保证非空.
        &self.centroids[0]
    }

    /// 第 `z` 层切片的质心. 该层不含心肌时返回 `None`.
    pub fn centroid_at(&self, z: usize) -> Option<&SliceCentroid> {
        self.centroids.iter().find(|c| c.z == z)
    }

    /// RV 标志点 `(z, h, w)`.
    #[inline]
    pub fn rv_landmark(&self) -> Option<Point3d> {
        self.rv_landmark
    }

    /// 切片顺序是否倒置 (基底位于第 0 层).
    #[inline]
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// 纵向轴的符号: 倒置时为 `-1`.
    #[inline]
    pub fn sign(&self) -> f64 {
        if self.inverted {
            -1.0
        } else {
            1.0
        }
    }

    /// 所有心肌体素索引, 按行优先存储.
    #[inline]
    pub fn myo_positions(&self) -> Vec<Idx3d> {
        self.label.positions_of(self.myo_label)
    }

    /// 将一帧图像映射到 ROI 几何: 重采样, 裁剪, 整帧 z-score 归一化.
    pub fn canonicalize_frame(&self, frame: &CardiacVolume) -> Array3<f32> {
        let resampled = if frame.shape() == self.canonical_shape {
            frame.data().to_owned()
        } else {
            resample_nearest(frame.data(), self.canonical_shape)
        };
        let roi_size: Idx2d = self.label.slice_shape();
        let cropped = crop_in_plane(resampled.view(), self.origin, roi_size);
        z_score(cropped.view())
    }
}

/// 由参考帧分割构建 [`OrientedRoi`].
#[derive(Debug, Clone)]
pub struct RoiBuilder<'a> {
    config: &'a StrainConfig,
}

impl<'a> RoiBuilder<'a> {
    /// 以配置创建.
    pub fn new(config: &'a StrainConfig) -> Self {
        Self { config }
    }

    /// 重采样到规范化网格, 以心肌质心为中心裁剪 ROI, 再确定方向与质心.
    ///
    /// # 返回值
    ///
    /// 分割中不存在心肌时, 返回 `Err(StrainError::NoMyocardium)`.
    pub fn build(&self, segmentation: &MyoLabel) -> StrainResult<OrientedRoi> {
        let c = self.config;
        let canonical = segmentation.resampled(c.canonical_shape());
        let (_, ch, cw) = canonical
            .center_of_mass(c.myo_label())
            .ok_or(StrainError::NoMyocardium(c.myo_label()))?;
        let origin = roi_origin((ch, cw), c.roi_size());
        debug!("myocardial centroid ({ch:.2}, {cw:.2}), ROI origin {origin:?}");

        let cropped = crop_in_plane(canonical.data(), origin, c.roi_size());
        let label = MyoLabel::from_array(cropped, canonical.spacing());
        OrientedRoi::with_geometry(
            label,
            c.myo_label(),
            c.rv_label(),
            c.canonical_shape(),
            origin,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::label;
    use crate::morph_3d::CylinderPhantom;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_no_myocardium() {
        let label = MyoLabel::from_array(Array3::zeros((4, 8, 8)), [1.0; 3]);
        let e = OrientedRoi::from_mask(label, label::MYO, label::RV).unwrap_err();
        assert!(matches!(e, StrainError::NoMyocardium(2)));
    }

    #[test]
    fn test_orientation_from_rv() {
        // RV 在上半部分: 非倒置, 基底为最高层.
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0)).with_rv_slices(8..12);
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        assert!(!roi.inverted());
        let zs: Vec<_> = roi.centroids().iter().map(|c| c.z).collect();
        assert_eq!(zs, (4..12).rev().collect::<Vec<_>>());
        assert!(roi.rv_landmark().is_some());

        // RV 在下半部分: 倒置, 基底为第一个含心肌切片.
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0)).with_rv_slices(4..7);
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        assert!(roi.inverted());
        assert_eq!(roi.sign(), -1.0);
        assert_eq!(roi.base_centroid().z, 4);
    }

    #[test]
    fn test_missing_rv_defaults_to_non_inverted() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0)).without_rv();
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        assert!(!roi.inverted());
        assert!(roi.rv_landmark().is_none());
        assert_eq!(roi.base_centroid().z, 11);
    }

    #[test]
    fn test_centroids_follow_ring() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 17.0));
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV).unwrap();
        for c in roi.centroids() {
            assert!(f64_eq(c.h, 20.0) && f64_eq(c.w, 17.0), "{c:?}");
        }
        assert!(roi.centroid_at(0).is_none());
        assert!(roi.centroid_at(5).is_some());
    }

    #[test]
    fn test_builder_centers_roi() {
        let p = CylinderPhantom::new((16, 64, 64), (40.0, 24.0));
        let config = StrainConfig::default()
            .with_canonical_shape((16, 64, 64))
            .with_roi_size((32, 32));
        let roi = RoiBuilder::new(&config).build(&p.label()).unwrap();
        assert_eq!(roi.shape(), (16, 32, 32));
        assert_eq!(roi.origin(), (24, 8));
        let base = roi.base_centroid();
        assert!(f64_eq(base.h, 16.0) && f64_eq(base.w, 16.0));
        assert_eq!(roi.myo_positions().len(), p.label().count(label::MYO));

        // 图像帧经过同样的裁剪.
        let frame = p.volume();
        let v = roi.canonicalize_frame(&frame);
        assert_eq!(v.dim(), (16, 32, 32));
        let myo_pos = roi.myo_positions()[0];
        assert!(v[myo_pos] > 0.0);
        assert!(v[(0, 0, 0)] < 0.0);
    }

    #[test]
    fn test_builder_resamples() {
        // 第 5-7 层的 RV 放大到 16 层后落在第 9-15 层, 仍在上半部分.
        let p = CylinderPhantom::new((8, 32, 32), (16.0, 16.0)).with_rv_slices(5..8);
        let config = StrainConfig::default()
            .with_canonical_shape((16, 64, 64))
            .with_roi_size((48, 48));
        let roi = RoiBuilder::new(&config).build(&p.label()).unwrap();
        assert_eq!(roi.shape(), (16, 48, 48));
        let sp = roi.label().spacing();
        assert!(f64_eq(sp[0], 0.5) && f64_eq(sp[1], 0.5));
        assert_eq!(roi.label().largest_slice(label::RV), Some(9));
        assert!(!roi.inverted());
        assert_eq!(p.volume().shape(), (8, 32, 32));
        assert_eq!(roi.canonicalize_frame(&p.volume()).dim(), (16, 48, 48));
    }

    #[test]
    fn test_resampled_rv_tie_takes_first() {
        // 第 4-5 层的 RV 放大后落在第 7-10 层, 各层面积相同.
        // 并列时取最小索引 7, 位于下半部分, 因此判为倒置.
        let p = CylinderPhantom::new((8, 32, 32), (16.0, 16.0)).with_rv_slices(4..6);
        let config = StrainConfig::default()
            .with_canonical_shape((16, 64, 64))
            .with_roi_size((48, 48));
        let roi = RoiBuilder::new(&config).build(&p.label()).unwrap();
        let rv = roi.label().slices_containing(label::RV);
        assert_eq!(rv, (7..=10).collect::<Vec<_>>());
        let areas = roi.label().slice_areas(label::RV);
        assert!(rv.iter().all(|z| areas[*z] == areas[7]));
        assert_eq!(roi.label().largest_slice(label::RV), Some(7));
        assert!(roi.inverted());
    }

    #[test]
    fn test_landmark_override() {
        let p = CylinderPhantom::new((16, 40, 40), (20.0, 20.0));
        let roi = OrientedRoi::from_mask(p.label(), label::MYO, label::RV)
            .unwrap()
            .with_rv_landmark(None);
        assert!(roi.rv_landmark().is_none());
    }
}
