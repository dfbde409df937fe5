mod error;
mod header;
mod request;
mod response;

pub use error::{Error, ErrorKind, Outcome, Result};
pub use header::HeaderMap;
pub use request::Request;
pub use response::Response;
pub(crate) use response::ResponseBuffer;
