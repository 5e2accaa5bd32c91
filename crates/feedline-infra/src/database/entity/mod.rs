//! SeaORM entities.

pub mod comment;
pub mod post;
