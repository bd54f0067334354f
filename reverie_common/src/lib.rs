//! Data types shared by every reverie crate.
//!
//! * [`ResourceVector`] and [`Category`] describe equipment and labour quantities. Requirements, offers and vendor
//!   inventories are all resource vectors.
//! * [`Secret`] wraps configuration values that must never show up in logs.
mod resources;
mod secret;

pub use resources::{Category, ResourceVector, ResourceVectorError};
pub use secret::Secret;
