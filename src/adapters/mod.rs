// Adapters layer: concrete implementations of the domain ports for external systems.
// Local storage still lives under config::cli.

pub mod http;

pub use http::HttpFetcher;
