//! Operation descriptor and the values derived from it.

mod descriptor;
pub use descriptor::*;

mod operation;
pub use operation::*;

mod validation;
pub use validation::*;
