pub mod entity;
pub mod relationship;
