//! 通用心脏 MR 数据加载器.
//!
//! 提供迭代器风格的数据集获取模式.

use std::path::{Path, PathBuf};

use crate::error::StrainResult;
use crate::{CardiacCycleSequence, CardiacVolume, MyoLabel, SequenceId};

/// 文件名构造器. 接受索引数, 获得文件名.
pub type FilenameBuilder = fn(u32) -> String;

/// 帧文件名构造器. 接受病例索引与帧索引, 获得文件名.
pub type FrameFilenameBuilder = fn(u32, u32) -> String;

/// 从目录、帧索引与文件名构造器创建单个序列的逐帧加载器.
///
/// # 注意
///
/// 1. `dir` 必须是目录, 否则程序 panic.
/// 2. `frames` 的所有取值 `t` 必须在 `dir` 下有形如 `builder(t)` 的 nifti
///   文件, 否则加载器在迭代时会返回 `Result::Err`.
pub fn sequence_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(
    dir: P,
    frames: I,
    builder: FilenameBuilder,
) -> FrameLoader {
    let dir = dir.as_ref().to_owned();
    assert!(dir.is_dir());

    let mut frames: Vec<u32> = frames.into_iter().collect();
    frames.reverse();

    FrameLoader {
        dir,
        frames_rev: frames,
        builder,
    }
}

/// 单个心动周期的逐帧加载器, 并在内部自动转换文件名.
#[derive(Debug)]
pub struct FrameLoader {
    dir: PathBuf,
    frames_rev: Vec<u32>,
    builder: FilenameBuilder,
}

impl FrameLoader {
    /// 加载全部剩余帧并组装为序列. 任意一帧出错即返回错误.
    pub fn into_sequence<I: Into<SequenceId>>(self, id: I) -> StrainResult<CardiacCycleSequence> {
        let frames = self
            .map(|(_, r)| r)
            .collect::<StrainResult<Vec<_>>>()?;
        CardiacCycleSequence::new(id, frames)
    }
}

impl Iterator for FrameLoader {
    type Item = (u32, StrainResult<CardiacVolume>);

    fn next(&mut self) -> Option<Self::Item> {
        let t = self.frames_rev.pop()?;

        self.dir.push((self.builder)(t));
        let data = CardiacVolume::open(self.dir.as_path());
        self.dir.pop();

        Some((t, data))
    }
}

impl ExactSizeIterator for FrameLoader {
    #[inline]
    fn len(&self) -> usize {
        self.frames_rev.len()
    }
}

/// 从病例索引、路径与文件名构造器创建 (序列, 参考帧分割) 数据集加载器.
///
/// 病例 `c` 的序列由 `frame_builder(c, 0..n_frames)` 组成, 标识为 `id_builder(c)`;
/// 分割标签为 `label_builder(c)`.
///
/// # 注意
///
/// 1. `dir` 必须是目录, 否则程序 panic.
/// 2. 任一文件缺失或损坏时, 加载器在迭代到该病例时返回 `Result::Err`.
pub fn case_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(
    cases: I,
    dir: P,
    n_frames: u32,
    frame_builder: FrameFilenameBuilder,
    label_builder: FilenameBuilder,
    id_builder: FilenameBuilder,
) -> CaseLoader {
    let dir = dir.as_ref().to_owned();
    assert!(dir.is_dir());

    let mut cases: Vec<u32> = cases.into_iter().collect();
    cases.reverse();

    CaseLoader {
        dir,
        cases_rev: cases,
        n_frames,
        frame_builder,
        label_builder,
        id_builder,
    }
}

/// 心脏 MR 数据集 (序列 + 分割) 加载器, 并在内部自动转换文件名.
#[derive(Debug)]
pub struct CaseLoader {
    dir: PathBuf,
    cases_rev: Vec<u32>,
    n_frames: u32,
    frame_builder: FrameFilenameBuilder,
    label_builder: FilenameBuilder,
    id_builder: FilenameBuilder,
}

impl CaseLoader {
    fn load(&mut self, case: u32) -> StrainResult<(CardiacCycleSequence, MyoLabel)> {
        let paths: Vec<PathBuf> = (0..self.n_frames)
            .map(|t| self.dir.join((self.frame_builder)(case, t)))
            .collect();
        let sequence = CardiacCycleSequence::open((self.id_builder)(case), paths)?;

        self.dir.push((self.label_builder)(case));
        let label = MyoLabel::open(self.dir.as_path());
        self.dir.pop();

        Ok((sequence, label?))
    }
}

impl Iterator for CaseLoader {
    type Item = (u32, StrainResult<(CardiacCycleSequence, MyoLabel)>);

    fn next(&mut self) -> Option<Self::Item> {
        let case = self.cases_rev.pop()?;
        let data = self.load(case);
        Some((case, data))
    }
}

impl ExactSizeIterator for CaseLoader {
    #[inline]
    fn len(&self) -> usize {
        self.cases_rev.len()
    }
}
