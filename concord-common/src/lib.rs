pub mod env;
pub mod error;
pub mod utils;

pub use error::{ConcordError, Result};
pub use utils::MemberId;
