//! 程序运行函数.

use crate::result::{AblationResult, Profile};
use crate::scenario::Scenario;
use cmr_berry::prelude::*;
use cmr_berry::session::{ScriptedMotion, ZeroMotion};
use log::{info, warn};
use std::path::Path;
use std::thread;
use utils::loader;

/// 在单独的会话中运行一个场景, 并将结果落盘到 `out` 下.
fn run_scenario(scenario: &Scenario, out: &Path) -> StrainResult<Profile> {
    let config = utils::phantom_config();
    let fields = scenario.fields(&config)?;
    let loader = move || Ok::<_, MotionError>(ScriptedMotion::new(fields.clone()));
    let mut session = StrainSession::new(config, loader)?;
    let sequence = scenario.sequence()?;
    let curve = session.run(&sequence, &scenario.phantom.label())?;
    let peaks = Profile::summarize(curve);

    let result = session
        .result(sequence.id())
        .ok_or_else(|| StrainError::NotYetAvailable(sequence.id().clone()))?;
    let dumped = dump::write_all(out.join(scenario.name), result)?.len();
    Ok(Profile {
        peaks,
        segment_voxels: result.aha.counts(),
        motion_calls: session.model().map_or(0, |m| m.calls()),
        dumped,
    })
}

/// 并行运行全部合成场景.
pub fn run() -> AblationResult {
    let out = loader::output_dir_from_env_or_temp();
    if let Err(e) = std::fs::create_dir_all(&out) {
        warn!("cannot create output directory {}: {e}", out.display());
    }
    let out = out.as_path();
    let scenarios = Scenario::all();

    info!("running {} scenario(s) on {} core(s)", scenarios.len(), utils::cpus());
    thread::scope(|s| {
        let handles: Vec<_> = scenarios
            .iter()
            .map(|sc| (sc.name, s.spawn(move || run_scenario(sc, out))))
            .collect();

        AblationResult::from_iter(handles.into_iter().map(|(name, th)| {
            let r = th.join().unwrap_or_else(|_| {
                Err(StrainError::InvalidConfig(format!("scenario `{name}` panicked")))
            });
            (name, r)
        }))
    })
}

/// 在真实病例上以零运动运行流水线, 打印节段体素个数, 用于检查几何处理.
pub fn run_cases(cases: Vec<u32>) {
    let Some(dir) = loader::sequence_dir_from_env_or_home().filter(|d| d.is_dir()) else {
        warn!("sequence directory not found, set `CMR_SEQUENCE_DIR`");
        return;
    };
    let session = StrainSession::new(StrainConfig::default(), || Ok::<_, MotionError>(ZeroMotion));
    let mut session = match session {
        Ok(s) => s,
        Err(e) => {
            warn!("{e}");
            return;
        }
    };

    utils::sep();
    for (case, data) in loader::case_loader(&dir, cases) {
        let outcome = data.and_then(|(sequence, label)| {
            session.run(&sequence, &label)?;
            session
                .result(sequence.id())
                .map(|r| r.aha.counts())
                .ok_or(StrainError::NotYetAvailable(sequence.id().clone()))
        });
        match outcome {
            Ok(counts) => println!("case {case}: segment voxels {counts:?}"),
            Err(e) => println!("case {case}: {e}"),
        }
        utils::sep();
    }
}
