pub mod assets;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod evolution;
pub mod importer;
pub mod normalize;
pub mod output;
pub mod pace;
pub mod progress;
pub mod query;
pub mod species;
pub mod store;
