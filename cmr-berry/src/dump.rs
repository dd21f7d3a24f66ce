//! 计算结果落盘.
//!
//! 所有输出以同一个基础路径加后缀命名, 例如基础路径 `out/cine-01` 对应
//! `out/cine-01.strain.npy`, `out/cine-01.motion.npz`, `out/cine-01.aha.npy`
//! 与 `out/cine-01.lc.npy`.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array3, Array4, Ix4, OwnedRepr};
use ndarray_npy::{read_npy, write_npy, NpzReader, NpzWriter};

use crate::aha::AhaSegmentMap;
use crate::error::StrainResult;
use crate::frame::LocalFrameField;
use crate::session::CycleResult;
use crate::strain::StrainCurve;

/// 应变曲线文件后缀.
pub const STRAIN_SUFFIX: &str = ".strain.npy";
/// 位移场文件后缀.
pub const MOTION_SUFFIX: &str = ".motion.npz";
/// AHA 节段标签文件后缀.
pub const AHA_SUFFIX: &str = ".aha.npy";
/// 局部坐标场文件后缀.
pub const LOCAL_FRAME_SUFFIX: &str = ".lc.npy";

/// 在 `base` 的文件名后追加 `suffix`.
pub fn with_suffix<P: AsRef<Path>>(base: P, suffix: &str) -> PathBuf {
    let mut s: OsString = base.as_ref().as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// `.npz` 中第 `t` 帧位移场的条目名.
#[inline]
pub fn frame_entry(t: usize) -> String {
    format!("frame_{t}")
}

/// 由条目名解析帧索引. 容忍 `.npy` 后缀.
fn parse_frame_entry(name: &str) -> Option<usize> {
    name.trim_end_matches(".npy")
        .strip_prefix("frame_")?
        .parse()
        .ok()
}

/// 写出形状为 `(3, 18, T + 1)` 的应变曲线, 第一维依次为径向, 周向, 纵向.
pub fn write_strain<P: AsRef<Path>>(base: P, curve: &StrainCurve) -> StrainResult<Vec<PathBuf>> {
    let path = with_suffix(base, STRAIN_SUFFIX);
    write_npy(&path, &curve.to_stacked())?;
    info!("strain curves written to {}", path.display());
    Ok(vec![path])
}

/// 读取 [`write_strain`] 写出的应变数组.
pub fn read_strain<P: AsRef<Path>>(path: P) -> StrainResult<Array3<f64>> {
    Ok(read_npy(path)?)
}

/// 写出逐帧位移场, 每帧一个 `frame_{t}` 条目.
pub fn write_motion<P: AsRef<Path>>(base: P, motion: &[Array4<f32>]) -> StrainResult<Vec<PathBuf>> {
    let path = with_suffix(base, MOTION_SUFFIX);
    let mut npz = NpzWriter::new(File::create(&path)?);
    for (t, field) in motion.iter().enumerate() {
        npz.add_array(frame_entry(t), field)?;
    }
    npz.finish()?;
    info!("{} displacement field(s) written to {}", motion.len(), path.display());
    Ok(vec![path])
}

/// 读取 [`write_motion`] 写出的位移场, 按帧索引排序. 无法解析的条目被忽略.
pub fn read_motion<P: AsRef<Path>>(path: P) -> StrainResult<Vec<Array4<f32>>> {
    let mut npz = NpzReader::new(File::open(path)?)?;
    let mut entries: Vec<(usize, String)> = npz
        .names()?
        .into_iter()
        .filter_map(|name| parse_frame_entry(&name).map(|t| (t, name)))
        .collect();
    entries.sort_unstable();

    let mut ans = Vec::with_capacity(entries.len());
    for (_, name) in entries {
        ans.push(npz.by_name::<OwnedRepr<f32>, Ix4>(&name)?);
    }
    Ok(ans)
}

/// 写出 AHA 节段标签 (`u8`, 形状为 ROI 形状).
pub fn write_aha<P: AsRef<Path>>(base: P, aha: &AhaSegmentMap) -> StrainResult<Vec<PathBuf>> {
    let path = with_suffix(base, AHA_SUFFIX);
    write_npy(&path, &aha.data())?;
    Ok(vec![path])
}

/// 写出局部坐标场 (`f64`, 形状为 `(z, h, w, 3, 3)`).
pub fn write_local_frames<P: AsRef<Path>>(
    base: P,
    frames: &LocalFrameField,
) -> StrainResult<Vec<PathBuf>> {
    let path = with_suffix(base, LOCAL_FRAME_SUFFIX);
    write_npy(&path, &frames.data())?;
    Ok(vec![path])
}

/// 写出一次完整运行的全部结果.
pub fn write_all<P: AsRef<Path>>(base: P, result: &CycleResult) -> StrainResult<Vec<PathBuf>> {
    let base = base.as_ref();
    let mut paths = write_strain(base, &result.strain)?;
    paths.extend(write_motion(base, &result.motion)?);
    paths.extend(write_aha(base, &result.aha)?);
    paths.extend(write_local_frames(base, &result.frames)?);
    Ok(paths)
}
