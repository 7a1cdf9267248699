pub mod notice;
pub mod stats;
