pub mod bot;
pub mod market;
pub mod portfolio;

pub use bot::*;
pub use market::*;
pub use portfolio::*;
