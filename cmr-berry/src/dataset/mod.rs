//! 数据集操作.

use std::path::{Path, PathBuf};

pub mod generic;
mod npz_sequence;

pub use npz_sequence::{write_npz_sequence, NpzSequence};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_dataset_dir_with() {
        if let Some(base) = home_dataset_dir() {
            let p = home_dataset_dir_with(["cmr", "sequences"]).unwrap();
            assert_eq!(p, base.join("cmr").join("sequences"));
        }
    }
}
