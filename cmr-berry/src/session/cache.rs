//! 以序列标识为键的计算缓存.

use std::collections::HashMap;

use ndarray::Array4;

use crate::aha::AhaSegmentMap;
use crate::frame::LocalFrameField;
use crate::morph_3d::OrientedRoi;
use crate::strain::StrainCurve;
use crate::SequenceId;

/// 一次完整流水线运行的全部结果.
#[derive(Debug, Clone)]
pub struct CycleResult {
    /// 规范化后的 ROI.
    pub roi: OrientedRoi,
    /// 逐帧位移场 (已平滑), 第 0 帧为参考帧自身.
    pub motion: Vec<Array4<f32>>,
    /// AHA 节段标签.
    pub aha: AhaSegmentMap,
    /// 局部坐标场.
    pub frames: LocalFrameField,
    /// 应变曲线.
    pub strain: StrainCurve,
}

/// 计算缓存. 只保存完整完成的运行结果, 不会自动失效.
#[derive(Debug, Default)]
pub struct ComputationCache {
    entries: HashMap<SequenceId, CycleResult>,
}

impl ComputationCache {
    /// 创建空缓存.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询缓存.
    #[inline]
    pub fn get(&self, id: &SequenceId) -> Option<&CycleResult> {
        self.entries.get(id)
    }

    /// 是否已有结果.
    #[inline]
    pub fn contains(&self, id: &SequenceId) -> bool {
        self.entries.contains_key(id)
    }

    /// 写入一次完整运行的结果, 返回缓存中的引用.
    pub fn insert(&mut self, id: SequenceId, result: CycleResult) -> &CycleResult {
        use std::collections::hash_map::Entry;

        match self.entries.entry(id) {
            Entry::Occupied(mut e) => {
                e.insert(result);
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(result),
        }
    }

    /// 移除单个序列的结果.
    #[inline]
    pub fn remove(&mut self, id: &SequenceId) -> Option<CycleResult> {
        self.entries.remove(id)
    }

    /// 清空全部结果.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 缓存条目个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 缓存是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
