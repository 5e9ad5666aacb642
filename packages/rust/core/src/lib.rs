//! Chunking pipelines for docprep.
//!
//! This crate ties together discovery, document preparation, heading
//! splitting and chunk assembly into the two end-to-end runs
//! ([`pipeline::run_docs`] and [`pipeline::run_api`]).

pub mod assembler;
pub mod output;
pub mod pipeline;
