pub mod rest;
mod router;

pub use router::{ApiRouter, ApiState};
