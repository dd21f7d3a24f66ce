//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d, Point2d, Point3d, Vec3};

pub use crate::data::{
    CardiacCycleSequence, CardiacVolume, LabelSlice, MyoLabel, SequenceId, VolumeAttr,
};

pub use crate::consts::label::{BACKGROUND, LV, MYO, RV};
pub use crate::consts::{AHA_SEGMENTS, STRAIN_ROWS};

pub use crate::aha::{AhaSegmentMap, Level};
pub use crate::config::StrainConfig;
pub use crate::error::{MotionError, StrainError, StrainResult};
pub use crate::frame::{LocalAxes, LocalFrameField};
pub use crate::morph_3d::{CylinderPhantom, OrientedRoi, RoiBuilder};
pub use crate::sector::Sector;
pub use crate::strain::StrainCurve;

pub use crate::session::{
    CalculatedKey, CalculatedResult, Direction, ModelLoader, MotionModel, SeriesKind, Status,
    StrainSession, Zone,
};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, generic};
pub use crate::dump;
