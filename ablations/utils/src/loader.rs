//! 对 `cmr-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use cmr_berry::dataset::generic::{self, CaseLoader};
use std::env;
use std::path::{Path, PathBuf};

/// 每个病例的帧数.
pub const FRAMES_PER_CASE: u32 = 25;

/// 获取心脏 MR 序列数据基本路径.
///
/// 1. 若环境变量 `$CMR_SEQUENCE_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/cmr/sequences`.
pub fn sequence_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("CMR_SEQUENCE_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => cmr_berry::dataset::home_dataset_dir_with(["cmr", "sequences"]),
    }
}

/// 获取结果输出路径.
///
/// 1. 若环境变量 `$CMR_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回系统临时目录下的 `cmr-berry`.
pub fn output_dir_from_env_or_temp() -> PathBuf {
    match env::var("CMR_OUTPUT_DIR") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => env::temp_dir().join("cmr-berry"),
    }
}

fn frame_name(case: u32, t: u32) -> String {
    format!("case{case:03}_frame{t:02}.nii.gz")
}

fn label_name(case: u32) -> String {
    format!("case{case:03}_seg.nii.gz")
}

fn case_id(case: u32) -> String {
    format!("case{case:03}")
}

/// 获取病例加载器. 文件命名为 `case{:03}_frame{:02}.nii.gz` 与 `case{:03}_seg.nii.gz`.
pub fn case_loader<P: AsRef<Path>, I: IntoIterator<Item = u32>>(path: P, cases: I) -> CaseLoader {
    generic::case_loader(
        cases,
        path,
        FRAMES_PER_CASE,
        frame_name,
        label_name,
        case_id,
    )
}
