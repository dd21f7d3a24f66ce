//! 合成心动周期场景.
//!
//! 每个场景由一个空心圆柱体模与一组逐帧位移场组成. 位移幅度按
//! `sin(pi * t / T)` 变化, 首尾两帧均为零位移.

use cmr_berry::prelude::*;
use ndarray::Array4;
use std::f64::consts::PI;

/// 每个周期的帧数 `T + 1`.
pub const FRAMES: usize = 20;

/// 位移模式.
#[derive(Copy, Clone, Debug)]
pub enum Pattern {
    /// 静止.
    Static,
    /// 沿长轴的均匀拉伸, `dz = k * (z - zc)`.
    LongitudinalStretch(f64),
    /// 平面内以切片质心为中心的均匀扩张.
    RadialThickening(f64),
}

/// 单个实验场景.
pub struct Scenario {
    pub name: &'static str,
    pub phantom: CylinderPhantom,
    pub pattern: Pattern,
}

impl Scenario {
    /// 全部场景: 静止, 纵向拉伸, 径向增厚, 以及 RV 旋转 60° 后的径向增厚.
    pub fn all() -> [Scenario; 4] {
        let base = || CylinderPhantom::new((16, 64, 64), (32.0, 32.0));
        [
            Scenario {
                name: "static",
                phantom: base(),
                pattern: Pattern::Static,
            },
            Scenario {
                name: "longitudinal-stretch",
                phantom: base(),
                pattern: Pattern::LongitudinalStretch(0.05),
            },
            Scenario {
                name: "radial-thickening",
                phantom: base(),
                pattern: Pattern::RadialThickening(0.08),
            },
            Scenario {
                name: "rotated",
                phantom: base().with_rv_angle(60.0),
                pattern: Pattern::RadialThickening(0.08),
            },
        ]
    }

    /// 心动周期图像序列. 图像本身在各帧之间不变, 运动全部由位移场给出.
    pub fn sequence(&self) -> StrainResult<CardiacCycleSequence> {
        let v = self.phantom.volume();
        CardiacCycleSequence::new(self.name, vec![v; FRAMES])
    }

    /// 生成 ROI 坐标下的逐帧位移场.
    pub fn fields(&self, config: &StrainConfig) -> StrainResult<Vec<Array4<f32>>> {
        let roi = RoiBuilder::new(config).build(&self.phantom.label())?;
        let (z, h, w) = roi.shape();
        let (zc, (hc, wc)) = {
            let c = roi.base_centroid();
            (z as f64 / 2.0, c.point())
        };

        let fields: Vec<Array4<f32>> = (0..FRAMES)
            .map(|t| {
                let a = (PI * t as f64 / (FRAMES - 1) as f64).sin();
                Array4::from_shape_fn((z, h, w, 3), |(pz, ph, pw, c)| {
                    let v = match (self.pattern, c) {
                        (Pattern::LongitudinalStretch(k), 0) => k * (pz as f64 - zc),
                        (Pattern::RadialThickening(k), 1) => k * (ph as f64 - hc),
                        (Pattern::RadialThickening(k), 2) => k * (pw as f64 - wc),
                        _ => 0.0,
                    };
                    (a * v) as f32
                })
            })
            .collect();
        Ok(fields)
    }
}
