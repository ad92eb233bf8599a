pub mod campaign;
pub mod config;
pub mod crm;
pub mod errors;
pub mod gateway;
pub mod server;
