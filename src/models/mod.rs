pub mod generation;
pub mod image;
pub mod state;

pub use generation::*;
pub use image::*;
pub use state::*;
