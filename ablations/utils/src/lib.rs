//! 消融实验依赖的通用组件.

use cmr_berry::StrainConfig;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 合成体模实验使用的配置: 规范网格 `(16, 64, 64)`, ROI `32 x 32`.
#[inline]
pub fn phantom_config() -> StrainConfig {
    StrainConfig::default()
        .with_canonical_shape((16, 64, 64))
        .with_roi_size((32, 32))
}
