#![doc = "repodoc-core: core pipeline library for repodoc."]

//! This crate contains the pipeline, data models and capability traits for repodoc:
//! clone a Git repository, analyze its sources, enrich them, draw a class diagram and
//! assemble Markdown and PDF documentation. The CLI and HTTP front ends live in `repodoc`.
//!
//! # Usage
//! Build a [`pipeline::Pipeline`] with [`pipeline::Pipeline::from_config`] and call
//! `run` once per repository. Mocks of the capability traits in [`contract`] are exported
//! behind the default `test-export-mocks` feature.

pub mod acquire;
pub mod analyzer;
pub mod config;
pub mod contract;
pub mod diagram;
pub mod document;
pub mod enrich;
pub mod error;
pub mod model;
pub mod pdf;
pub mod pipeline;
pub mod process;
pub mod processor;
pub mod render;
pub mod store;
pub mod walker;
