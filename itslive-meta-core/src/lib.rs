#![doc = "itslive-meta-core: publish/ingest orchestration for ITS_LIVE granule metadata."]

//! This crate holds the pipeline logic: resolving a granule, distributing its
//! generated metadata to archival and publish buckets, ingesting the STAC item
//! into a catalog, and the bulk manifest runner with NDJSON export.
//! CLI parsing and logging setup live in the `itslive-meta` binary crate.
//!
//! # Usage
//! Build a [`config::PipelineConfig`], pick implementations of the
//! [`contract`] traits (S3, HTTP catalog, command producer, or mocks) and call
//! [`pipeline::run_meta`] or [`batch::run_batch`].

pub mod batch;
pub mod catalog_http;
pub mod config;
pub mod contract;
pub mod distribute;
pub mod error;
pub mod granule;
pub mod manifest;
pub mod ndjson;
pub mod pipeline;
pub mod producer;
pub mod stac;
pub mod storage;

pub use error::{PublishError, Result};
