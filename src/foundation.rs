pub(crate) mod core;
pub(crate) mod diagnostic;
pub(crate) mod error;
