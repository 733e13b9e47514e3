mod locate;
mod metrics;
mod parse;
mod plot;
mod utils;

pub use locate::*;
pub use metrics::*;
pub use parse::*;
pub use plot::*;
pub use utils::*;
