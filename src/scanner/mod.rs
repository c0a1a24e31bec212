//! Directory scanner: bottom-up walker, qualification rule, deletion.

pub mod deletion;
pub mod qualify;
pub mod walker;
