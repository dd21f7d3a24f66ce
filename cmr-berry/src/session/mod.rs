//! 分析会话: 计算缓存, 模型懒加载, 状态通知与查询.
//!
//! 会话以 [`SequenceId`] 为键, 对同一序列至多运行一次完整流水线.
//! 任意一帧失败都会中止整个周期的计算, 缓存中不会留下部分结果.

use std::fmt;

use log::{debug, info, warn};
use ndarray::{Array1, Array4};
use once_cell::unsync::OnceCell;

use crate::aha::AhaSegmentMap;
use crate::config::StrainConfig;
use crate::error::{StrainError, StrainResult};
use crate::frame::LocalFrameField;
use crate::morph_3d::RoiBuilder;
use crate::strain::smooth::smooth_in_plane;
use crate::strain::StrainCurve;
use crate::{CardiacCycleSequence, MyoLabel, SequenceId, VolumeAttr};

mod cache;
mod motion;
mod query;

pub use cache::{ComputationCache, CycleResult};
pub use motion::{ModelLoader, MotionModel, ScriptedMotion, ZeroMotion};
pub use query::{
    strain_series, CalculatedKey, CalculatedResult, Direction, SeriesKind, Zone,
};

/// 会话状态. 每个主要阶段结束后更新.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// 空闲, 或上一次运行失败.
    Idle,
    /// 已完成 ROI 与节段划分, 正在估计逐帧运动.
    MeasuringMotion,
    /// 正在计算应变.
    AnalyzingStrain,
    /// 结果已写入缓存.
    Ready,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Idle => "idle",
            Status::MeasuringMotion => "measuring motion",
            Status::AnalyzingStrain => "analyzing strain",
            Status::Ready => "ready",
        })
    }
}

/// 状态回调.
pub type StatusObserver = Box<dyn FnMut(Status)>;

/// 应变分析会话.
pub struct StrainSession<L: ModelLoader> {
    config: StrainConfig,
    loader: L,
    model: OnceCell<L::Model>,
    cache: ComputationCache,
    status: Status,
    observer: Option<StatusObserver>,
}

impl<L: ModelLoader> fmt::Debug for StrainSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrainSession")
            .field("config", &self.config)
            .field("model_loaded", &self.model.get().is_some())
            .field("cached", &self.cache.len())
            .field("status", &self.status)
            .finish()
    }
}

impl<L: ModelLoader> StrainSession<L> {
    /// 创建会话. 模型在第一次运行时才会加载.
    ///
    /// # 返回值
    ///
    /// 配置非法时, 返回 `Err(StrainError::InvalidConfig)`.
    pub fn new(config: StrainConfig, loader: L) -> StrainResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            loader,
            model: OnceCell::new(),
            cache: ComputationCache::new(),
            status: Status::Idle,
            observer: None,
        })
    }

    /// 设置状态回调.
    pub fn with_observer<F: FnMut(Status) + 'static>(mut self, observer: F) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// 会话配置.
    #[inline]
    pub fn config(&self) -> &StrainConfig {
        &self.config
    }

    /// 当前状态.
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// 已加载的模型. 尚未加载时返回 `None`.
    #[inline]
    pub fn model(&self) -> Option<&L::Model> {
        self.model.get()
    }

    /// 计算缓存.
    #[inline]
    pub fn cache(&self) -> &ComputationCache {
        &self.cache
    }

    /// 序列是否已有完整结果.
    #[inline]
    pub fn is_computed(&self, id: &SequenceId) -> bool {
        self.cache.contains(id)
    }

    /// 计算或取回序列 `sequence` 的应变曲线. `segmentation` 为参考帧的分割标签.
    ///
    /// 同一序列标识只会计算一次, 之后直接返回缓存结果.
    ///
    /// # 返回值
    ///
    /// - 模型加载失败时, 返回 `Err(StrainError::ModelLoad)`, 下次运行会重新加载;
    /// - 运动估计失败时, 返回 `Err(StrainError::MotionEstimation)`, 携带序列标识与帧索引;
    /// - 其他输入错误见 [`StrainError`].
    pub fn run(
        &mut self,
        sequence: &CardiacCycleSequence,
        segmentation: &MyoLabel,
    ) -> StrainResult<&StrainCurve> {
        let id = sequence.id().clone();
        if self.cache.contains(&id) {
            debug!("sequence `{id}` is cached, skipping computation");
        } else {
            let Self {
                config,
                loader,
                model,
                cache,
                status,
                observer,
            } = self;
            let mut notify = |s: Status| {
                *status = s;
                info!("sequence `{id}`: {s}");
                if let Some(f) = observer.as_mut() {
                    f(s);
                }
            };

            let outcome = model
                .get_or_try_init(|| {
                    info!("loading motion model");
                    loader.load()
                })
                .map_err(StrainError::ModelLoad)
                .and_then(|m| compute_cycle(config, m, sequence, segmentation, &mut notify));
            match outcome {
                Ok(result) => {
                    cache.insert(id.clone(), result);
                    notify(Status::Ready);
                }
                Err(e) => {
                    warn!("strain computation for `{id}` aborted: {e}");
                    notify(Status::Idle);
                    return Err(e);
                }
            }
        }
        self.cache
            .get(&id)
            .map(|r| &r.strain)
            .ok_or(StrainError::NotYetAvailable(id))
    }

    /// 查询序列 `id` 在给定方向, 类型与区域上的时间序列.
    ///
    /// # 返回值
    ///
    /// - 序列尚未计算时, 返回 `Err(StrainError::NotYetAvailable)`;
    /// - 区域内没有非空节段时, 返回 `Err(StrainError::EmptyZone)`.
    pub fn strain_series(
        &self,
        id: &SequenceId,
        direction: Direction,
        kind: SeriesKind,
        zone: Zone,
    ) -> StrainResult<Array1<f64>> {
        let result = self
            .cache
            .get(id)
            .ok_or_else(|| StrainError::NotYetAvailable(id.clone()))?;
        strain_series(&result.strain, direction, kind, zone)
    }

    /// 取回缓存中的中间结果. 尚未计算时返回 `None`.
    pub fn calculated_result(
        &self,
        id: &SequenceId,
        key: CalculatedKey,
    ) -> Option<CalculatedResult<'_>> {
        let r = self.cache.get(id)?;
        Some(match key {
            CalculatedKey::Motion => CalculatedResult::Motion(&r.motion),
            CalculatedKey::Aha => CalculatedResult::Aha(&r.aha, &r.frames),
            CalculatedKey::Strain => CalculatedResult::Strain(&r.strain),
        })
    }

    /// 取回序列的完整结果.
    #[inline]
    pub fn result(&self, id: &SequenceId) -> Option<&CycleResult> {
        self.cache.get(id)
    }

    /// 移除单个序列的结果. 返回是否确实移除了结果.
    pub fn forget(&mut self, id: &SequenceId) -> bool {
        let removed = self.cache.remove(id).is_some();
        if removed {
            info!("sequence `{id}` removed from cache");
        }
        removed
    }

    /// 清空全部缓存结果. 已加载的模型保留.
    pub fn reset(&mut self) {
        info!("computation cache reset ({} entries)", self.cache.len());
        self.cache.clear();
        self.status = Status::Idle;
    }
}

/// 对单个序列运行完整流水线.
fn compute_cycle<M: MotionModel>(
    config: &StrainConfig,
    model: &M,
    sequence: &CardiacCycleSequence,
    segmentation: &MyoLabel,
    notify: &mut dyn FnMut(Status),
) -> StrainResult<CycleResult> {
    if segmentation.shape() != sequence.shape() {
        let (a, b, c) = sequence.shape();
        let (x, y, z) = segmentation.shape();
        return Err(StrainError::ShapeMismatch {
            expected: vec![a, b, c],
            found: vec![x, y, z],
        });
    }

    let roi = RoiBuilder::new(config).build(segmentation)?;
    let aha = AhaSegmentMap::classify(&roi, config);
    let frames = LocalFrameField::build(&roi);
    notify(Status::MeasuringMotion);

    let (z, h, w) = roi.shape();
    let fixed = roi.canonicalize_frame(sequence.reference());
    let mut motion: Vec<Array4<f32>> = Vec::with_capacity(sequence.len());
    for (t, frame) in sequence.frames().iter().enumerate() {
        let moving = roi.canonicalize_frame(frame);
        let mut field = model
            .displacement(fixed.view(), moving.view())
            .map_err(|source| StrainError::MotionEstimation {
                sequence: sequence.id().clone(),
                frame: t,
                source,
            })?;
        if field.dim() != (z, h, w, 3) {
            return Err(StrainError::DisplacementShape {
                sequence: sequence.id().clone(),
                frame: t,
                expected: vec![z, h, w, 3],
                found: field.shape().to_vec(),
            });
        }
        smooth_in_plane(&mut field, config.motion_sigma());
        debug!("frame {t}: displacement estimated");
        motion.push(field);
    }
    notify(Status::AnalyzingStrain);

    let views: Vec<_> = motion.iter().map(|f| f.view()).collect();
    let strain = StrainCurve::compute(&views, &aha, &frames, config)?;
    Ok(CycleResult {
        roi,
        motion,
        aha,
        frames,
        strain,
    })
}
