pub mod enrichment;
pub mod job;
pub mod result;
pub mod step;
pub mod supplier;

pub use enrichment::*;
pub use job::*;
pub use result::*;
pub use step::*;
pub use supplier::*;
