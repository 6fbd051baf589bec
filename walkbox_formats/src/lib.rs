pub mod boxes;
pub mod matrix;
pub mod scale;

pub use boxes::{
    BoxCoords, BoxDef, BoxFlags, BoxFormat, NO_BOX, Point, decode_box, decode_box_table,
    encode_box, encode_box_table, load_box_table,
};
pub use matrix::{BOX_MATRIX_SIZE, BoxMatrix, MATRIX_SENTINEL, MatrixRun, MatrixWriter};
pub use scale::{MAX_SCALE_SLOTS, ScaleSlot, decode_scale_slot_table, encode_scale_slot_table};
