//! 实验结果.

use cmr_berry::prelude::*;
use std::io::{self, Write};

/// 单条曲线的峰值.
#[derive(Copy, Clone, Debug)]
pub struct Peak {
    /// 绝对值最大的样本 (保留符号).
    pub value: f64,
    /// 峰值所在帧.
    pub frame: usize,
}

impl Peak {
    fn of(series: &[f64]) -> Option<Self> {
        series
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map(|(frame, value)| Self { value, frame })
    }
}

/// 单个场景的汇总.
pub struct Profile {
    /// 每个方向, 每个区域的峰值. `None` 表示区域为空.
    pub peaks: Vec<(Direction, Zone, Option<Peak>)>,
    /// 节段 1-17 的体素个数.
    pub segment_voxels: [usize; AHA_SEGMENTS],
    /// 运动估计调用次数.
    pub motion_calls: usize,
    /// 落盘文件个数.
    pub dumped: usize,
}

impl Profile {
    /// 由应变曲线汇总峰值.
    pub fn summarize(curve: &StrainCurve) -> Vec<(Direction, Zone, Option<Peak>)> {
        let zones = [Zone::Global, Zone::Basal, Zone::Mid, Zone::Apical];
        let mut ans = Vec::with_capacity(Direction::ALL.len() * zones.len());
        for d in Direction::ALL {
            for z in zones {
                let peak = cmr_berry::session::strain_series(curve, d, SeriesKind::Strain, z)
                    .ok()
                    .and_then(|s| Peak::of(&s.to_vec()));
                ans.push((d, z, peak));
            }
        }
        ans
    }
}

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Scenario `{name}`:")?;
    writeln!(w, "{S4}Motion estimator calls: {}", p.motion_calls)?;
    writeln!(w, "{S4}Files dumped: {}", p.dumped)?;
    writeln!(w, "{S4}Segment voxels: {:?}", p.segment_voxels)?;
    for (d, z, peak) in p.peaks.iter() {
        let (d, z) = (d.to_string(), z.to_string());
        match peak {
            Some(Peak { value, frame }) => {
                writeln!(w, "{S4}{d:>15} {z:>7}: peak {value:>9.4}% at frame {frame}")?
            }
            None => writeln!(w, "{S4}{d:>15} {z:>7}: /")?,
        }
    }
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, StrainResult<Profile>)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, StrainResult<Profile>)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 成功完成的场景个数.
    pub fn succeeded(&self) -> usize {
        self.data.iter().filter(|(_, r)| r.is_ok()).count()
    }

    /// 打印运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        utils::sep_to(&mut out)?;
        for (key, profile) in self.data.iter() {
            match profile {
                Ok(p) => describe_into(key, p, &mut out)?,
                Err(e) => writeln!(out, "Scenario `{key}` failed: {e}")?,
            }
            utils::sep_to(&mut out)?;
        }
        Ok(())
    }
}
