mod error;
mod io;
mod logging;

pub use error::*;
pub use io::*;
pub use logging::*;
