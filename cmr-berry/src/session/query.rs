//! 应变曲线查询: 按方向, 类型与区域取时间序列.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use ndarray::{Array1, Array4, Axis};

use crate::aha::AhaSegmentMap;
use crate::consts::GLOBAL_ROW;
use crate::error::{StrainError, StrainResult};
use crate::frame::LocalFrameField;
use crate::strain::temporal::time_gradient;
use crate::strain::StrainCurve;

pub use crate::strain::Direction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 曲线类型.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeriesKind {
    /// 应变.
    Strain,
    /// 应变率: 应变对时间样本的一阶导数.
    StrainRate,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeriesKind::Strain => "strain",
            SeriesKind::StrainRate => "strain-rate",
        })
    }
}

impl FromStr for SeriesKind {
    type Err = StrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "strain" => Ok(SeriesKind::Strain),
            "sr" | "rate" | "strain-rate" | "strain_rate" | "strain rate" => {
                Ok(SeriesKind::StrainRate)
            }
            _ => Err(StrainError::ParseSelector(s.to_string())),
        }
    }
}

/// 查询区域.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Zone {
    /// 全部心肌.
    Global,
    /// 基底段, 第 0-5 行 (节段 1-6).
    Basal,
    /// 中间段, 第 7-12 行 (节段 8-13).
    Mid,
    /// 心尖段, 第 13-16 行 (节段 14-17).
    Apical,
}

impl Zone {
    /// 区域在应变矩阵上对应的行.
    ///
    /// 第 6 行 (节段 7) 不属于任何局部区域, 只进入全局平均.
    pub fn rows(self) -> Range<usize> {
        match self {
            Zone::Global => GLOBAL_ROW..GLOBAL_ROW + 1,
            Zone::Basal => 0..6,
            Zone::Mid => 7..13,
            Zone::Apical => 13..17,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::Global => "global",
            Zone::Basal => "basal",
            Zone::Mid => "mid",
            Zone::Apical => "apical",
        })
    }
}

impl FromStr for Zone {
    type Err = StrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" | "global" => Ok(Zone::Global),
            "b" | "base" | "basal" => Ok(Zone::Basal),
            "m" | "mid" => Ok(Zone::Mid),
            "a" | "apex" | "apical" => Ok(Zone::Apical),
            _ => Err(StrainError::ParseSelector(s.to_string())),
        }
    }
}

/// 可查询的中间结果.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CalculatedKey {
    /// 逐帧位移场.
    Motion,
    /// AHA 节段标签与局部坐标场.
    Aha,
    /// 应变曲线.
    Strain,
}

impl FromStr for CalculatedKey {
    type Err = StrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "motion" => Ok(CalculatedKey::Motion),
            "aha" => Ok(CalculatedKey::Aha),
            "strain" => Ok(CalculatedKey::Strain),
            _ => Err(StrainError::ParseSelector(s.to_string())),
        }
    }
}

/// 缓存中的中间结果的借用.
#[derive(Copy, Clone, Debug)]
pub enum CalculatedResult<'a> {
    /// 逐帧位移场.
    Motion(&'a [Array4<f32>]),
    /// AHA 节段标签与局部坐标场.
    Aha(&'a AhaSegmentMap, &'a LocalFrameField),
    /// 应变曲线.
    Strain(&'a StrainCurve),
}

/// 在 `curve` 上取给定方向, 类型与区域的时间序列.
///
/// 区域平均忽略空节段 (体素个数为零的行).
///
/// # 返回值
///
/// 区域内所有节段都为空时, 返回 `Err(StrainError::EmptyZone)`.
pub fn strain_series(
    curve: &StrainCurve,
    direction: Direction,
    kind: SeriesKind,
    zone: Zone,
) -> StrainResult<Array1<f64>> {
    let m = curve.direction(direction);
    let rows: Vec<usize> = zone
        .rows()
        .filter(|r| curve.counts()[*r] != 0)
        .collect();
    if rows.is_empty() {
        return Err(StrainError::EmptyZone(zone));
    }
    let mean = m.select(Axis(0), &rows).mean_axis(Axis(0));
    let series = mean.ok_or(StrainError::EmptyZone(zone))?;
    Ok(match kind {
        SeriesKind::Strain => series,
        SeriesKind::StrainRate => time_gradient(series.view()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STRAIN_ROWS;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zone_rows() {
        assert_eq!(Zone::Global.rows(), 17..18);
        assert_eq!(Zone::Basal.rows(), 0..6);
        assert_eq!(Zone::Mid.rows(), 7..13);
        assert_eq!(Zone::Apical.rows(), 13..17);
        // 局部区域互不相交, 第 6 行不被覆盖.
        let mut all: Vec<usize> = [Zone::Basal, Zone::Mid, Zone::Apical]
            .into_iter()
            .flat_map(Zone::rows)
            .collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..17).filter(|r| *r != 6).collect();
        assert_eq!(all, expected);
    }

    /// 第 k 行的值恒为 k 时, 区域平均即行号的平均.
    fn row_index_curve() -> StrainCurve {
        let stacked = ndarray::Array3::from_shape_fn((3, STRAIN_ROWS, 4), |(_, r, _)| r as f64);
        StrainCurve::from_stacked(stacked, [1; STRAIN_ROWS]).unwrap()
    }

    #[test]
    fn test_zone_means_follow_rows() {
        let curve = row_index_curve();
        let expect = [
            (Zone::Global, 17.0),
            (Zone::Basal, 2.5),
            (Zone::Mid, 9.5),
            (Zone::Apical, 14.5),
        ];
        for d in Direction::ALL {
            for (zone, v) in expect {
                let s = strain_series(&curve, d, SeriesKind::Strain, zone).unwrap();
                assert_eq!(s.len(), 4);
                assert!(s.iter().all(|x| f64_eq(*x, v)), "{d} {zone}");
                let rate = strain_series(&curve, d, SeriesKind::StrainRate, zone).unwrap();
                assert!(rate.iter().all(|x| f64_eq(*x, 0.0)));
            }
        }
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let stacked = ndarray::Array3::from_shape_fn((3, STRAIN_ROWS, 2), |(_, r, _)| r as f64);
        let mut counts = [1; STRAIN_ROWS];
        // 节段 13 为空, 中间段只剩第 7-11 行.
        counts[12] = 0;
        counts[13..17].iter_mut().for_each(|c| *c = 0);
        let curve = StrainCurve::from_stacked(stacked, counts).unwrap();
        let mid = strain_series(&curve, Direction::Radial, SeriesKind::Strain, Zone::Mid).unwrap();
        assert!(f64_eq(mid[0], 9.0));
        assert!(matches!(
            strain_series(&curve, Direction::Radial, SeriesKind::Strain, Zone::Apical),
            Err(StrainError::EmptyZone(Zone::Apical))
        ));
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("G".parse::<Zone>().unwrap(), Zone::Global);
        assert_eq!("apical".parse::<Zone>().unwrap(), Zone::Apical);
        assert_eq!("Basal".parse::<Zone>().unwrap(), Zone::Basal);
        assert_eq!("strain-rate".parse::<SeriesKind>().unwrap(), SeriesKind::StrainRate);
        assert_eq!("SR".parse::<SeriesKind>().unwrap(), SeriesKind::StrainRate);
        assert_eq!("strain".parse::<SeriesKind>().unwrap(), SeriesKind::Strain);
        assert_eq!("AHA".parse::<CalculatedKey>().unwrap(), CalculatedKey::Aha);
        for bad in ["", "septal", "strainrate!"] {
            assert!(matches!(bad.parse::<Zone>(), Err(StrainError::ParseSelector(_))));
        }
        assert!("x".parse::<SeriesKind>().is_err());
        assert_eq!(Zone::Mid.to_string(), "mid");
        assert_eq!(SeriesKind::StrainRate.to_string(), "strain-rate");
    }
}
