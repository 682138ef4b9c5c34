//! HTTP Request domain types

mod descriptor;
mod method;

pub use descriptor::RequestDescriptor;
pub use method::HttpMethod;
