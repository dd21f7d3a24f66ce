//! 错误类型.

use ndarray_npy::{ReadNpyError, ReadNpzError, WriteNpyError, WriteNpzError};
use thiserror::Error;

use crate::session::Zone;
use crate::SequenceId;

/// 本 crate 的通用 `Result`.
pub type StrainResult<T> = Result<T, StrainError>;

/// 应变计算流水线中的所有错误.
///
/// 退化几何 (缺失 RV 标志点, 缺失心腔等) 不属于错误, 它们只会被记录到日志中.
#[derive(Debug, Error)]
pub enum StrainError {
    /// 图像序列不含任何帧.
    #[error("image sequence contains no frame")]
    EmptySequence,

    /// 数据形状不一致.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// 期望形状.
        expected: Vec<usize>,
        /// 实际形状.
        found: Vec<usize>,
    },

    /// 读入的 nifti 数据不是三维体.
    #[error("expected a 3D volume, found {0} dimension(s)")]
    NotVolume(usize),

    /// 分割标签中不存在心肌体素.
    #[error("segmentation has no myocardium voxel (label {0})")]
    NoMyocardium(u8),

    /// 配置项取值非法.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// 运动估计模型加载失败. 下次运行时会重新尝试加载.
    #[error("failed to load motion model: {0}")]
    ModelLoad(#[source] MotionError),

    /// 运动估计在某一帧失败, 整个周期的计算被中止.
    #[error("motion estimation failed for sequence `{sequence}` at frame {frame}: {source}")]
    MotionEstimation {
        /// 序列标识.
        sequence: SequenceId,
        /// 出错的帧索引.
        frame: usize,
        /// 底层错误.
        source: MotionError,
    },

    /// 运动估计返回的位移场形状不符合 `(z, h, w, 3)`.
    #[error(
        "displacement of sequence `{sequence}` at frame {frame} has shape {found:?}, expected {expected:?}"
    )]
    DisplacementShape {
        /// 序列标识.
        sequence: SequenceId,
        /// 出错的帧索引.
        frame: usize,
        /// 期望形状.
        expected: Vec<usize>,
        /// 实际形状.
        found: Vec<usize>,
    },

    /// 查询的序列尚未完成计算.
    #[error("strain of sequence `{0}` is not yet available")]
    NotYetAvailable(SequenceId),

    /// 查询区域内没有任何非空节段.
    #[error("zone `{0}` has no populated segment")]
    EmptyZone(Zone),

    /// 无法识别的查询选择子.
    #[error("unknown selector `{0}`")]
    ParseSelector(String),

    /// nifti 读取错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// ndarray 形状错误.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 写 `.npy` 错误.
    #[error(transparent)]
    WriteNpy(#[from] WriteNpyError),

    /// 写 `.npz` 错误.
    #[error(transparent)]
    WriteNpz(#[from] WriteNpzError),

    /// 读 `.npy` 错误.
    #[error(transparent)]
    ReadNpy(#[from] ReadNpyError),

    /// 读 `.npz` 错误.
    #[error(transparent)]
    ReadNpz(#[from] ReadNpzError),
}

/// 外部运动估计能力 (模型加载或推理) 的错误.
///
/// 内部包装任意错误, 以便注入各种推理后端.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MotionError(Box<dyn std::error::Error + Send + Sync>);

impl MotionError {
    /// 包装任意错误或错误信息.
    pub fn new<E: Into<Box<dyn std::error::Error + Send + Sync>>>(err: E) -> Self {
        Self(err.into())
    }

    /// 获取底层错误.
    #[inline]
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{MotionError, StrainError};
    use crate::SequenceId;
    use std::error::Error;

    #[test]
    fn test_motion_estimation_message() {
        let e = StrainError::MotionEstimation {
            sequence: SequenceId::from("cine-01"),
            frame: 3,
            source: MotionError::new("out of memory"),
        };
        let msg = e.to_string();
        assert!(msg.contains("cine-01"));
        assert!(msg.contains("frame 3"));
        assert!(msg.contains("out of memory"));
        assert!(e.source().is_some());
    }

    #[test]
    fn test_model_load_source() {
        let e = StrainError::ModelLoad(MotionError::new("missing weights"));
        assert_eq!(
            e.source().map(|s| s.to_string()),
            Some("missing weights".to_string())
        );
    }
}
