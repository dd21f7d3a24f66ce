//! 3D 形态学操作: 质心, 切片面积与心腔检测.

use ndarray::Axis;

use crate::{Idx2d, MyoLabel, Point2d, Point3d, VolumeAttr};

mod phantom;
mod roi;

pub use phantom::CylinderPhantom;
pub use roi::{OrientedRoi, RoiBuilder, SliceCentroid};

/// 质心与面积统计
impl MyoLabel {
    /// 值为 `label` 的体素的质心 `(z, h, w)`, 以体素为单位.
    /// 不存在该体素时返回 `None`.
    pub fn center_of_mass(&self, label: u8) -> Option<Point3d> {
        let (mut cnt, mut sz, mut sh, mut sw) = (0usize, 0.0, 0.0, 0.0);
        for ((z, h, w), _) in self.data().indexed_iter().filter(|(_, p)| **p == label) {
            cnt += 1;
            sz += z as f64;
            sh += h as f64;
            sw += w as f64;
        }
        (cnt != 0).then(|| {
            let n = cnt as f64;
            (sz / n, sh / n, sw / n)
        })
    }

    /// 第 `z` 层切片上值为 `label` 的像素质心 `(h, w)`.
    ///
    /// 当 `z` 越界时 panic.
    #[inline]
    pub fn slice_center_of_mass(&self, z: usize, label: u8) -> Option<Point2d> {
        self.slice_at(z).center_of_mass(label)
    }

    /// 每层切片上值为 `label` 的像素个数.
    pub fn slice_areas(&self, label: u8) -> Vec<usize> {
        self.slice_iter().map(|s| s.count(label)).collect()
    }

    /// 值为 `label` 的像素最多的切片索引. 并列时取索引最小者.
    /// 不存在该像素时返回 `None`.
    pub fn largest_slice(&self, label: u8) -> Option<usize> {
        let areas = self.slice_areas(label);
        let (idx, &area) = areas
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, a)| **a)?;
        (area != 0).then_some(idx)
    }

    /// 每层切片上被 `wall` 像素完全包围的心腔像素. 结果长度等于切片个数.
    pub fn cavities(&self, wall: u8) -> Vec<Vec<Idx2d>> {
        self.slice_iter().map(|s| s.holes(|p| p == wall)).collect()
    }

    /// 含有 `label` 像素的切片索引 (升序).
    pub fn slices_containing(&self, label: u8) -> Vec<usize> {
        (0..self.len_z())
            .filter(|z| self.data().index_axis(Axis(0), *z).iter().any(|p| *p == label))
            .collect()
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl MyoLabel {
    /// 借助 `rayon`, 并行地运行 [`Self::cavities`].
    pub fn par_cavities(&self, wall: u8) -> Vec<Vec<Idx2d>> {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        self.data()
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|v| crate::LabelSlice::new(v).holes(|p| p == wall))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::MyoLabel;
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    /// 3 层, 第 1 层为 3x3 的心肌方环.
    fn boxed() -> MyoLabel {
        let mut data = Array3::zeros((3, 5, 5));
        for h in 1..4 {
            for w in 1..4 {
                if (h, w) != (2, 2) {
                    data[(1, h, w)] = 2u8;
                }
            }
        }
        data[(0, 0, 0)] = 1;
        data[(2, 0, 0)] = 1;
        data[(2, 0, 1)] = 1;
        MyoLabel::from_array(data, [1.0; 3])
    }

    #[test]
    fn test_center_of_mass() {
        let label = boxed();
        let (z, h, w) = label.center_of_mass(2).unwrap();
        assert!(f64_eq(z, 1.0) && f64_eq(h, 2.0) && f64_eq(w, 2.0));
        assert!(label.center_of_mass(9).is_none());
        assert!(label.slice_center_of_mass(0, 2).is_none());
    }

    #[test]
    fn test_largest_slice() {
        let label = boxed();
        assert_eq!(label.slice_areas(1), vec![1, 0, 2]);
        assert_eq!(label.largest_slice(1), Some(2));
        assert_eq!(label.largest_slice(2), Some(1));
        assert_eq!(label.largest_slice(3), None);
        assert_eq!(label.slices_containing(1), vec![0, 2]);
    }

    #[test]
    fn test_largest_slice_tie_takes_first() {
        let mut data = Array3::zeros((3, 2, 2));
        data[(1, 0, 0)] = 1u8;
        data[(2, 1, 1)] = 1u8;
        let label = MyoLabel::from_array(data, [1.0; 3]);
        assert_eq!(label.largest_slice(1), Some(1));
    }

    #[test]
    fn test_cavities() {
        let label = boxed();
        let cav = label.cavities(2);
        assert_eq!(cav, vec![vec![], vec![(2, 2)], vec![]]);
        #[cfg(feature = "rayon")]
        assert_eq!(label.par_cavities(2), cav);
    }
}
