mod analysis;
mod chess;

pub use analysis::*;
pub use chess::*;
