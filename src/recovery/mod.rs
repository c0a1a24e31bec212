//! Recovery log schema and the restorer that replays it.

pub mod log;
pub mod restorer;
