pub mod http;
pub mod push;

pub use http::*;
pub use push::*;
