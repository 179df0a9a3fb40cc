pub mod config;
pub mod consistency;
pub mod data_uri;
pub mod export;
pub mod fetch;
pub mod gateway;
pub mod harvest;
pub mod metadata;
pub mod rank;
pub mod record;
pub mod store;
