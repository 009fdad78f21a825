pub mod errors;
pub mod models;
pub mod payload;
pub mod ports;
pub mod router;
pub mod service;
