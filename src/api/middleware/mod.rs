pub mod logging;

pub use logging::{request_logger, REQUEST_ID_HEADER};
