//! External service integrations.

pub mod extraction {
    pub use crate::extraction::*;
}

pub mod extraction_cache {
    pub use crate::extraction_cache::*;
}
