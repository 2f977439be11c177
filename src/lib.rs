pub mod config;
pub mod error;
pub mod event;
pub mod normalize;
pub mod routes;
pub mod signing;
pub mod store;
