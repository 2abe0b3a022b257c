pub mod config;
pub mod error;
pub mod limits;
pub mod types;

pub use config::Config;
pub use error::ClipsightError;
pub use limits::*;
pub use types::*;
