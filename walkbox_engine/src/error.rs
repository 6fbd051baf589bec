use thiserror::Error;

use walkbox_formats::BoxFormat;

/// Fatal scene-consistency violations. Unreachable routes and dropped mixer
/// voices are ordinary outcomes and never surface here.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("illegal box id {id} (scene has {count} boxes)")]
    IllegalBox { id: u8, count: usize },

    #[error("invalid scale slot {0}")]
    InvalidScaleSlot(u16),

    #[error("box matrix overflow")]
    MatrixOverflow,

    #[error("box matrix queried before construction")]
    MatrixNotBuilt,

    #[error("scale table {0} not defined")]
    MissingScaleTable(u16),

    #[error("{op} is not supported by {format:?} box data")]
    UnsupportedByFormat {
        op: &'static str,
        format: BoxFormat,
    },
}
