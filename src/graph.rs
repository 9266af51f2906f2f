pub mod api;
mod client;
pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use api::GraphApi;
pub use client::GraphClient;
pub use http::HttpGraph;
