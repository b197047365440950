mod batch;
mod change;
mod names;
mod scan;

pub use batch::*;
pub use change::*;
pub use names::*;
pub use scan::*;
