//! 短轴切片上的扇区.
//!
//! 我们一般使用行优先编码存储二维图像. 其中行就是 "Height" (垂直方向), 列就是 "Width" (水平方向).
//! 然后将 "Height" 作为平面直角坐标系中的 x 轴, 将 "Width" 作为平面直角坐标系中的 y 轴,
//! 这样相当于将原先的平面直角坐标系按顺时针旋转了 90 度.
//!
//! 以切片质心为原点, 平面上任意点的方向就可以通过 `atan2` 确定下来了.
//! 与 CT 扇区不同, AHA 扇区以 **角度** 表示, 范围为 `[-180, 180]`.
//!
//! # 角度规范
//!
//! - 参考方向 (旋转后的 RV 标志点方向) 为 `0°`;
//! - 从参考方向出发, 向 w 增加一侧旋转为正角度;
//! - 未经旋转时, h 增加的方向为 `0°`, w 增加的方向为 `90°`.

use std::fmt::Formatter;

use crate::Point2d;

/// 弧度转换为角度.
#[inline]
fn arc_to_angle(arc: f64) -> f64 {
    arc * 180.0 * std::f64::consts::FRAC_1_PI
}

/// 获取平面向量 `(dh, dw)` 的角度, 范围为 `[-180, 180]`.
///
/// 零向量的角度为 `0`.
#[inline]
pub fn angle_of((dh, dw): Point2d) -> f64 {
    arc_to_angle(f64::atan2(dw, dh))
}

/// 角度轴上的一个扇区, 由下界和上界组成.
///
/// 下界总是闭合的; 上界默认开放, 只有触碰 `180°` 的扇区才会闭合上界.
#[derive(Copy, Clone, PartialEq)]
pub struct Sector {
    /// `[-180, 180]`
    lo: f64,
    /// `(lo, 180]`
    hi: f64,
    /// 上界是否闭合.
    hi_closed: bool,
}

/// 内部以角度显示区间. 另外压缩到一行.
impl std::fmt::Debug for Sector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let close = if self.hi_closed { ']' } else { ')' };
        f.write_fmt(format_args!(
            "Sector [{:.1}°, {:.1}°{close}",
            self.lo, self.hi
        ))
    }
}

impl Sector {
    /// 左闭右开扇区 `[lo, hi)`, 仅用于常量表.
    const fn half_open(lo: f64, hi: f64) -> Self {
        Self {
            lo,
            hi,
            hi_closed: false,
        }
    }

    /// 闭扇区 `[lo, hi]`, 仅用于常量表.
    const fn closed(lo: f64, hi: f64) -> Self {
        Self {
            lo,
            hi,
            hi_closed: true,
        }
    }

    /// 判断角度 `angle` 是否被包含在扇区中. 非有限值总是不被包含.
    #[inline]
    pub fn contains(&self, angle: f64) -> bool {
        if self.hi_closed {
            (self.lo..=self.hi).contains(&angle)
        } else {
            (self.lo..self.hi).contains(&angle)
        }
    }
}

/// 基底段与中间段的 60° 扇区表. 第 `i` 项对应基底段节段 `i + 1`,
/// 中间段节段号需再加 `6`.
const RING_SECTORS: [Sector; 6] = [
    Sector::half_open(-120.0, -60.0),
    Sector::half_open(-180.0, -120.0),
    Sector::closed(120.0, 180.0),
    Sector::half_open(60.0, 120.0),
    Sector::half_open(0.0, 60.0),
    Sector::half_open(-60.0, 0.0),
];

/// 心尖段的 90° 扇区表. 节段 14 跨越 `±180°`, 因此拆成两个扇区.
const APICAL_SECTORS: [(Sector, u8); 5] = [
    (Sector::half_open(-135.0, -45.0), 13),
    (Sector::closed(135.0, 180.0), 14),
    (Sector::half_open(-180.0, -135.0), 14),
    (Sector::half_open(45.0, 135.0), 15),
    (Sector::half_open(-45.0, 45.0), 16),
];

/// 基底/中间段扇区编号 `1..=6`. 角度非法时返回 `None`.
pub fn ring_segment(angle: f64) -> Option<u8> {
    RING_SECTORS
        .iter()
        .position(|s| s.contains(angle))
        .map(|i| i as u8 + 1)
}

/// 心尖段节段号 `13..=16`. 角度非法时返回 `None`.
pub fn apical_segment(angle: f64) -> Option<u8> {
    APICAL_SECTORS
        .iter()
        .find_map(|(s, seg)| s.contains(angle).then_some(*seg))
}

/// 平面旋转, 将参考方向映射到 `0°`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rotation2d {
    /// 参考方向的单位向量 `(h, w)`.
    u: Point2d,
}

impl Default for Rotation2d {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation2d {
    /// 不旋转: h 增加的方向为 `0°`.
    #[inline]
    pub const fn identity() -> Self {
        Self { u: (1.0, 0.0) }
    }

    /// 以 `(dh, dw)` 为参考方向构建旋转. 参考向量长度为零或非有限值时返回 `None`.
    pub fn from_reference((dh, dw): Point2d) -> Option<Self> {
        let norm = dh.hypot(dw);
        (norm.is_finite() && norm > 0.0).then(|| Self {
            u: (dh / norm, dw / norm),
        })
    }

    /// 参考方向的单位向量.
    #[inline]
    pub fn reference(&self) -> Point2d {
        self.u
    }

    /// 旋转平面向量 `(dh, dw)`.
    #[inline]
    pub fn apply(&self, (vh, vw): Point2d) -> Point2d {
        let (uh, uw) = self.u;
        (uh * vh + uw * vw, uh * vw - uw * vh)
    }

    /// 旋转后向量的角度, 范围为 `[-180, 180]`.
    #[inline]
    pub fn angle_of(&self, v: Point2d) -> f64 {
        angle_of(self.apply(v))
    }
}
