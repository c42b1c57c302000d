pub mod format;
pub mod table;
pub mod view;

pub use table::*;
pub use view::*;
