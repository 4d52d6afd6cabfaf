pub mod batch;
pub mod browser;
pub mod config;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod record;
pub mod worklist;
