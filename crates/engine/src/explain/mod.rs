mod client;
mod request;
pub mod schema;

pub use client::{parse_body, ExplanationClient, ExplanationError};
pub use request::ExplanationRequest;
pub use schema::Explanation;
