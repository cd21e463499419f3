//! Media shelf library.
//!
//! A personal bookmark store for Twitter/X and Reddit posts. Saved links are
//! canonicalized, their media resolved with external extractors and stored
//! as HD/SD variants, and items are auto-tagged by where they came from.

pub mod config;
pub mod db;
pub mod extractor;
pub mod handlers;
pub mod library;
pub mod refresh;
pub mod resolver;
pub mod storage;
pub mod tags;
pub mod web;
