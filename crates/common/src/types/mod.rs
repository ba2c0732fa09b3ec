mod chat;
mod classification;
mod document;
mod report;

pub use chat::*;
pub use classification::*;
pub use document::*;
pub use report::*;
