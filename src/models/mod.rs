pub mod history;
pub mod listing;
pub mod settings;
pub mod stats;

pub use history::*;
pub use listing::*;
pub use settings::*;
pub use stats::*;
