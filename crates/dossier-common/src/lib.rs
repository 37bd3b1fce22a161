pub mod consts;
pub mod error;
pub mod time;

pub use error::{DossierError, Result};
