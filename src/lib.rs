//! A rust library for planning parallel reads and writes of a shared region of a multidimensional dataset.
//!
//! Each cooperating process holds a contiguous partition of a logically global array.
//! Rather than computing per-process offsets by hand, processes describe the region of interest with a NumPy-like selection syntax (e.g. `+[0:10:2,4:20,5]`) on both the memory side and the file side.
//! A [`Plan`](plan::Plan) then resolves, independently on each process, the exact axis-aligned hyperslab blocks that pair the selected memory elements with the selected file elements in ordinal order.
//!
//! ## Getting Started
//! - Build selections with [`SelectionTerm`](selection::SelectionTerm) and [`SelectionExpression`](selection::SelectionExpression), either parsed from strings or composed with `+` and `-`.
//! - Describe how the global array is split with a [`ProcessGrid`](decomposition::ProcessGrid).
//! - Resolve a [`Plan`](plan::Plan) against a [`SelectionBackend`](backend::SelectionBackend), or compute a backend-free [`PlanLayout`](plan::PlanLayout).
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use hyperslabs::backend::MemoryBackend;
//! use hyperslabs::decomposition::ProcessGrid;
//! use hyperslabs::plan::PlanBuilder;
//! use hyperslabs::selection::SelectionExpression;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! // Process 1 of 2 writes its half of every other element of an 8 element array into a 4 element dataset.
//! let plan = PlanBuilder::new(vec![8], vec![4])
//!     .memory_selection("[0:7:2]".parse::<SelectionExpression>()?)
//!     .process_grid(ProcessGrid::new(vec![1], vec![2])?)
//!     .build(backend.clone())?;
//! assert_eq!(plan.num_elements(), 2);
//! assert_eq!(plan.file_windows(), &[2..4]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `hyperslabs` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod config;
pub mod decomposition;
pub mod element_type;
pub mod filter;
pub mod hyperslab;
pub mod plan;
pub mod selection;
