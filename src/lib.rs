mod error;
mod proxy;
mod registry;
mod teardown;
mod types;

pub use error::*;
pub use proxy::*;
pub use registry::*;
pub use teardown::*;
pub use types::*;
