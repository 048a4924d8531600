pub mod entity;
pub mod geometry;
pub mod instances;
