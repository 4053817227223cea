pub mod compression_search;
pub mod quality_search;
pub mod service;
