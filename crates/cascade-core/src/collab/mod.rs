//! Collaborators the engines call out to, besides storage and rules

pub mod hashing;
pub mod input;

pub use hashing::{Argon2Hasher, Hasher};
pub use input::{InputSource, StaticInput};
