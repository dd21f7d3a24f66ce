//! 合成心动周期实验.
//!
//! 不带参数时, 并行运行全部合成体模场景并打印各方向, 各区域的应变峰值;
//! 带病例编号参数时, 在 `$CMR_SEQUENCE_DIR` 下的真实病例上检查节段划分.

mod result;
mod runner;
mod scenario;

use log::{error, LevelFilter};

fn main() {
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("logger initialization failed: {e}");
    }

    let cases: Vec<u32> = std::env::args()
        .skip(1)
        .filter_map(|a| a.parse().ok())
        .collect();
    if !cases.is_empty() {
        runner::run_cases(cases);
        return;
    }

    println!("Running phantom cycles ({} frames each)...", scenario::FRAMES);
    let result = runner::run();
    if let Err(e) = result.analyze() {
        error!("cannot print results: {e}");
    }
    println!("{} scenario(s) completed", result.succeeded());
}
