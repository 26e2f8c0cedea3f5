pub(crate) mod builder;
pub(crate) mod frame_table;
pub(crate) mod index;
pub(crate) mod position;
pub(crate) mod progression;
