//! 外部运动估计能力的接口.
//!
//! 运动估计网络不在本 crate 中实现. 调用方实现 [`MotionModel`] 提供位移场,
//! 并通过 [`ModelLoader`] 延迟加载模型.

use std::cell::Cell;

use ndarray::{Array4, ArrayView3};

use crate::error::MotionError;

/// 运动估计模型: 输入参考帧与当前帧 (均为 ROI 形状, 已归一化),
/// 返回形状为 `(z, h, w, 3)` 的位移场, 分量顺序为 `(dz, dh, dw)`.
pub trait MotionModel {
    /// 估计 `moving` 相对 `fixed` 的位移场.
    fn displacement(
        &self,
        fixed: ArrayView3<f32>,
        moving: ArrayView3<f32>,
    ) -> Result<Array4<f32>, MotionError>;
}

impl<M: MotionModel + ?Sized> MotionModel for Box<M> {
    fn displacement(
        &self,
        fixed: ArrayView3<f32>,
        moving: ArrayView3<f32>,
    ) -> Result<Array4<f32>, MotionError> {
        (**self).displacement(fixed, moving)
    }
}

/// 运动估计模型加载器. 会话在第一次需要时调用, 之后复用加载结果.
pub trait ModelLoader {
    /// 加载得到的模型.
    type Model: MotionModel;

    /// 加载模型. 失败时下次运行会重新尝试.
    fn load(&self) -> Result<Self::Model, MotionError>;
}

impl<M, F> ModelLoader for F
where
    M: MotionModel,
    F: Fn() -> Result<M, MotionError>,
{
    type Model = M;

    #[inline]
    fn load(&self) -> Result<M, MotionError> {
        self()
    }
}

/// 按调用次序回放预先给定的位移场. 第 `k` 次调用返回 `fields[k]`.
///
/// 同时记录调用次数, 用于验证每帧恰好调用一次.
#[derive(Debug, Default)]
pub struct ScriptedMotion {
    fields: Vec<Array4<f32>>,
    calls: Cell<usize>,
    /// 在第几次调用时返回错误.
    fail_at: Option<usize>,
}

impl ScriptedMotion {
    /// 以逐帧位移场创建.
    pub fn new(fields: Vec<Array4<f32>>) -> Self {
        Self {
            fields,
            calls: Cell::new(0),
            fail_at: None,
        }
    }

    /// 第 `k` 次调用 (从 0 开始) 时返回错误.
    pub fn failing_at(mut self, k: usize) -> Self {
        self.fail_at = Some(k);
        self
    }

    /// 累计调用次数.
    #[inline]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MotionModel for ScriptedMotion {
    fn displacement(
        &self,
        _fixed: ArrayView3<f32>,
        _moving: ArrayView3<f32>,
    ) -> Result<Array4<f32>, MotionError> {
        let k = self.calls.get();
        self.calls.set(k + 1);
        if self.fail_at == Some(k) {
            return Err(MotionError::new(format!("scripted failure at call {k}")));
        }
        // 超出脚本长度时按周期回放, 以便同一模型服务多个序列.
        let n = self.fields.len();
        if n == 0 {
            return Err(MotionError::new("no scripted displacement field"));
        }
        Ok(self.fields[k % n].clone())
    }
}

/// 固定返回零位移的模型.
#[derive(Copy, Clone, Debug, Default)]
pub struct ZeroMotion;

impl MotionModel for ZeroMotion {
    fn displacement(
        &self,
        fixed: ArrayView3<f32>,
        _moving: ArrayView3<f32>,
    ) -> Result<Array4<f32>, MotionError> {
        let (z, h, w) = fixed.dim();
        Ok(Array4::zeros((z, h, w, 3)))
    }
}
