// * scholar-flow: scholarly reference extraction and classification
// * URL or PDF in, classified bibliographic record out.

pub mod config;
pub mod engine;
pub mod network;
pub mod ops;
pub mod persistence;
pub mod refinery;
pub mod sources;
