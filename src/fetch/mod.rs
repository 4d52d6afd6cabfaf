// src/fetch/mod.rs

pub mod urls;

pub use urls::{build_detail_url, LANDING_URL};
