use std::fs::File;
use std::path::Path;

use ndarray::{Array3, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};

use crate::error::StrainResult;
use crate::{CardiacCycleSequence, CardiacVolume, SequenceId};

/// 保存在单个 npz 文件中的心动周期序列.
///
/// 每帧一个 `frame_{t}` 条目, 均为 `(z, h, w)` 的 `f32` 数组. npz 不保存体素分辨率,
/// 读取时统一使用构造时给定的 `spacing`.
pub struct NpzSequence {
    reader: NpzReader<File>,
    frames: Vec<(usize, String)>,
    spacing: [f64; 3],
}

impl NpzSequence {
    /// 打开 npz 文件并检索所有 `frame_{t}` 条目. 其他条目被忽略.
    pub fn open<P: AsRef<Path>>(path: P, spacing: [f64; 3]) -> StrainResult<Self> {
        let mut reader = NpzReader::new(File::open(path)?)?;
        let mut frames: Vec<(usize, String)> = reader
            .names()?
            .into_iter()
            .filter_map(|name| {
                let t = name
                    .trim_end_matches(".npy")
                    .strip_prefix("frame_")?
                    .parse()
                    .ok()?;
                Some((t, name))
            })
            .collect();
        frames.sort_unstable();
        Ok(Self {
            reader,
            frames,
            spacing,
        })
    }

    /// 帧数.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// 是否不含任何帧.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 按排序后的位置读取第 `index` 帧. 越界时返回 `None`.
    pub fn frame(&mut self, index: usize) -> Option<StrainResult<CardiacVolume>> {
        let (_, name) = self.frames.get(index)?;
        let data = self
            .reader
            .by_name::<OwnedRepr<f32>, Ix3>(name)
            .map(|a| CardiacVolume::from_array(a, self.spacing))
            .map_err(Into::into);
        Some(data)
    }

    /// 读取全部帧并组装为序列.
    pub fn into_sequence<I: Into<SequenceId>>(mut self, id: I) -> StrainResult<CardiacCycleSequence> {
        let mut frames = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            if let Some(f) = self.frame(i) {
                frames.push(f?);
            }
        }
        CardiacCycleSequence::new(id, frames)
    }
}

/// 将序列写为 npz 文件, 每帧一个 `frame_{t}` 条目.
pub fn write_npz_sequence<P: AsRef<Path>>(path: P, sequence: &CardiacCycleSequence) -> StrainResult<()> {
    let mut npz = NpzWriter::new(File::create(path)?);
    for (t, frame) in sequence.frames().iter().enumerate() {
        let data: Array3<f32> = frame.data().to_owned();
        npz.add_array(format!("frame_{t}"), &data)?;
    }
    npz.finish()?;
    Ok(())
}
