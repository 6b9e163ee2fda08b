//! File format codecs

pub mod lsf;
pub mod lsx;
