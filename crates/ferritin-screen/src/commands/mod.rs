pub mod cross_validate;
pub mod predict;
