pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod http;
pub mod request;
pub mod retry;
pub mod template;

pub use config::{EndpointConfig, RestSettings};
pub use error::RestError;
pub use generator::RestGenerator;
