//! Wire types of the grid protocol: the request a grid sends and the
//! envelope it expects back.

mod request;
mod response;

pub use request::*;
pub use response::*;
