pub mod mirror;
pub mod record;
pub mod sink;
