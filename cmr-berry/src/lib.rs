#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 基于心脏 MR 电影序列 (cine) 与一份参考帧心肌分割标签,
//! 按 AHA 17 节段模型计算区域心肌应变 (strain) 曲线.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 运动估计网络不在本 crate 中实现. 调用方通过 [`session::MotionModel`]
//!   与 [`session::ModelLoader`] 注入位移场来源.
//! 2. 所有体数据按照 `(z, h, w)` 顺序访问; 位移场分量按 `(dz, dh, dw)` 排列.
//! 3. 退化几何 (缺失 RV, 缺失心腔, 体素与切片质心重合) 不会报错,
//!   而是记录日志后采用固定的回退策略.
//!
//! # 开发计划
//!
//! ### 规范化网格与 ROI 裁剪 ✅
//!
//! 最近邻重采样到固定网格 (保持物理范围), 以心肌质心为中心裁剪平面 ROI.
//!
//! 实现位于 `cmr-berry/src/data/resample.rs` 与 `cmr-berry/src/data/morph_3d/roi.rs`.
//!
//! ### 心肌局部坐标系 ✅
//!
//! 为每个心肌体素构建 (纵向, 周向, 径向) 右手正交基.
//!
//! 实现位于 `cmr-berry/src/frame.rs`.
//!
//! ### AHA 17 节段划分 ✅
//!
//! 基底/中间/心尖三等分, 以 RV 标志点为角度参考的扇区划分, 以及心尖帽 (节段 17).
//!
//! 实现位于 `cmr-berry/src/aha.rs` 与 `cmr-berry/src/data/sector.rs`.
//!
//! ### 应变张量与时间后处理 ✅
//!
//! 小应变张量投影, 节段平均, 滑动平均, 首样本置零与端点漂移校正.
//!
//! 实现位于 `cmr-berry/src/strain/*`.
//!
//! ### 计算缓存与查询 ✅
//!
//! 以序列标识为键的计算缓存, 模型懒加载, 状态回调, 以及按方向/类型/区域的曲线查询.
//!
//! 实现位于 `cmr-berry/src/session/*`.
//!
//! ### 结果落盘 ✅
//!
//! 基于 `ndarray-npy` 的 `.npy` / `.npz` 输出.
//!
//! 实现位于 `cmr-berry/src/dump.rs`.
//!
//! ### 漂移校正策略 ⌛️
//!
//! 端点斜坡校正会掩盖真实的舒张末期残余应变, 是否保留有待临床确认.
//! 目前完整保留并隔离在 `strain::temporal::rebase_with_endpoint_ramp`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 高精度平面坐标 `(h, w)`.
pub type Point2d = (f64, f64);

/// 高精度空间坐标 `(z, h, w)`.
pub type Point3d = (f64, f64, f64);

/// 三维向量, 分量顺序为 `(z, h, w)`.
pub type Vec3 = [f64; 3];

/// 心脏 MR 体数据与分割标签基础数据结构.
mod data;

pub use data::{
    CardiacCycleSequence, CardiacVolume, LabelSlice, MyoLabel, SequenceId, VolumeAttr,
};

pub use data::{morph_3d, resample, sector};

pub mod aha;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod dump;
pub mod error;
pub mod frame;
pub mod prelude;
pub mod session;
pub mod strain;

pub use config::StrainConfig;
pub use error::{MotionError, StrainError, StrainResult};
pub use session::StrainSession;
