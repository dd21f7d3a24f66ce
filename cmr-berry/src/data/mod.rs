use std::fmt;
use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::NORMALIZE_EPS;
use crate::error::{StrainError, StrainResult};
use crate::{Idx2d, Idx3d};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod morph_3d;
pub mod resample;
pub mod sector;
pub mod slice;

pub use slice::LabelSlice;

/// 将 header 中的 `[_, W, H, z]` 体素间距转换成 `[z, H, W]`.
///
/// 非正或非有限的间距 (常见于手工拼接的文件) 被视为 1 毫米.
#[inline]
fn spacing_from_header(h: &NiftiHeader) -> [f64; 3] {
    let [_, w, h, z, ..] = h.pixdim;
    [z, h, w].map(|v| {
        let v = v as f64;
        if v.is_finite() && v > 0.0 {
            v
        } else {
            1.0
        }
    })
}

/// 读取 nifti 文件, 返回 `(z, H, W)` 顺序的标准布局数据和体素间距.
macro_rules! read_nifti_volume {
    ($path: expr, $t: ty) => {{
        let obj = ReaderOptions::new().read_file($path)?;
        let spacing = spacing_from_header(obj.header());
        let data = obj.into_volume().into_ndarray::<$t>()?;
        if data.ndim() != 3 {
            return Err(StrainError::NotVolume(data.ndim()));
        }
        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = data
            .permuted_axes([2, 1, 0].as_slice())
            .into_dimensionality::<Ix3>()?;
        (data.as_standard_layout().into_owned(), spacing)
    }};
}

/// 三维体数据的共用属性和部分通用操作.
pub trait VolumeAttr {
    /// 获取数据形状大小 `(z, h, w)`.
    fn shape(&self) -> Idx3d;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    fn spacing(&self) -> [f64; 3];

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }
}

/// 单帧心脏 MR 体数据. 灰度以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct CardiacVolume {
    data: Array3<f32>,
    spacing: [f64; 3],
}

impl VolumeAttr for CardiacVolume {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    #[inline]
    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }
}

impl Index<Idx3d> for CardiacVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl CardiacVolume {
    /// 打开 nii 文件格式的单帧体数据. `path` 为 nii 文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> StrainResult<Self> {
        let (data, spacing) = read_nifti_volume!(path.as_ref(), f32);
        Ok(Self { data, spacing })
    }

    /// 由 `(z, h, w)` 顺序的裸数据与体素间距直接创建.
    #[inline]
    pub fn from_array(data: Array3<f32>, spacing: [f64; 3]) -> Self {
        Self { data, spacing }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }
}

/// 整体 z-score 归一化: `(x - mean) / (std + eps)`. 统计量以 `f64` 累加.
pub fn z_score(data: ArrayView3<f32>) -> Array3<f32> {
    let n = data.len().max(1) as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = data
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let denom = var.sqrt() + NORMALIZE_EPS;
    data.mapv(|v| ((v as f64 - mean) / denom) as f32)
}

/// 参考帧的心肌分割标签. 标签值以 `u8` 保存.
#[derive(Debug, Clone)]
pub struct MyoLabel {
    data: Array3<u8>,
    spacing: [f64; 3],
}

impl VolumeAttr for MyoLabel {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    #[inline]
    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }
}

impl Index<Idx3d> for MyoLabel {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MyoLabel {
    /// 打开 nii 文件格式的分割标签. `path` 为 nii 文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> StrainResult<Self> {
        let (data, spacing) = read_nifti_volume!(path.as_ref(), u8);
        Ok(Self { data, spacing })
    }

    /// 由 `(z, h, w)` 顺序的裸标签与体素间距直接创建.
    #[inline]
    pub fn from_array(data: Array3<u8>, spacing: [f64; 3]) -> Self {
        Self { data, spacing }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 获取 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> LabelSlice<'_> {
        LabelSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = LabelSlice<'_>> {
        self.data.axis_iter(Axis(0)).map(LabelSlice::new)
    }

    /// 获取值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 收集值为 `label` 的所有体素对应的下标, 结果按行优先存储.
    pub fn positions_of(&self, label: u8) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, pixel)| (*pixel == label).then_some(pos))
            .collect()
    }
}

/// 图像序列标识. 计算缓存以此为键.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SequenceId(String);

impl SequenceId {
    /// 创建序列标识.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// 获取标识字符串.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceId {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SequenceId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 一个心动周期的图像序列. 第 0 帧为参考帧 (舒张末期).
///
/// 创建后不可变, 所有帧形状一致.
#[derive(Debug, Clone)]
pub struct CardiacCycleSequence {
    id: SequenceId,
    frames: Vec<CardiacVolume>,
}

impl CardiacCycleSequence {
    /// 由已加载的帧创建序列.
    ///
    /// # 返回值
    ///
    /// - `frames` 为空时, 返回 `Err(StrainError::EmptySequence)`;
    /// - 各帧形状不一致时, 返回 `Err(StrainError::ShapeMismatch)`.
    pub fn new<I: Into<SequenceId>>(id: I, frames: Vec<CardiacVolume>) -> StrainResult<Self> {
        let first = frames.first().ok_or(StrainError::EmptySequence)?.shape();
        if let Some(bad) = frames.iter().map(VolumeAttr::shape).find(|s| *s != first) {
            return Err(StrainError::ShapeMismatch {
                expected: vec![first.0, first.1, first.2],
                found: vec![bad.0, bad.1, bad.2],
            });
        }
        Ok(Self {
            id: id.into(),
            frames,
        })
    }

    /// 依次打开 `paths` 中的 nii 文件作为序列的各帧.
    pub fn open<I, P, It>(id: I, paths: It) -> StrainResult<Self>
    where
        I: Into<SequenceId>,
        P: AsRef<Path>,
        It: IntoIterator<Item = P>,
    {
        let frames = paths
            .into_iter()
            .map(CardiacVolume::open)
            .collect::<StrainResult<Vec<_>>>()?;
        Self::new(id, frames)
    }

    /// 序列标识.
    #[inline]
    pub fn id(&self) -> &SequenceId {
        &self.id
    }

    /// 所有帧.
    #[inline]
    pub fn frames(&self) -> &[CardiacVolume] {
        &self.frames
    }

    /// 帧数 `T + 1`.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// 序列是否为空. 合法构造的序列总是返回 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 参考帧 (第 0 帧).
    #[inline]
    pub fn reference(&self) -> &CardiacVolume {
        &self.frames[0]
    }

    /// 单帧形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.reference().shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_sequence_rejects_empty() {
        let e = CardiacCycleSequence::new("empty", vec![]).unwrap_err();
        assert!(matches!(e, StrainError::EmptySequence));
    }

    #[test]
    fn test_sequence_rejects_mixed_shapes() {
        let a = CardiacVolume::from_array(Array3::zeros((2, 4, 4)), [1.0; 3]);
        let b = CardiacVolume::from_array(Array3::zeros((2, 4, 5)), [1.0; 3]);
        let e = CardiacCycleSequence::new("mixed", vec![a, b]).unwrap_err();
        match e {
            StrainError::ShapeMismatch { expected, found } => {
                assert_eq!(expected, vec![2, 4, 4]);
                assert_eq!(found, vec![2, 4, 5]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_z_score() {
        let data = Array3::from_shape_fn((2, 3, 4), |(z, h, w)| (z * 12 + h * 4 + w) as f32);
        let n = z_score(data.view());
        let mean = n.iter().map(|&v| v as f64).sum::<f64>() / n.len() as f64;
        let var = n.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n.len() as f64;
        assert!(f64_eq(mean, 0.0));
        assert!(f64_eq(var, 1.0));
    }

    #[test]
    fn test_z_score_constant() {
        let data = Array3::from_elem((2, 2, 2), 7.0f32);
        assert!(z_score(data.view()).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_label_positions() {
        let mut data = Array3::zeros((2, 3, 3));
        data[(1, 2, 0)] = 2u8;
        data[(0, 0, 1)] = 2u8;
        let label = MyoLabel::from_array(data, [8.0, 1.5, 1.5]);
        assert_eq!(label.count(2), 2);
        assert_eq!(label.positions_of(2), vec![(0, 0, 1), (1, 2, 0)]);
    }
}
