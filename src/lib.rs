// Copyright 2025-2026 The wingen contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![allow(dead_code)]

//! # wingen
//!
//! A source generator that reads a Windows metadata file (`.winmd`, an
//! ECMA-335 binary inside a PE container) and emits idiomatic, statically
//! typed Rust bindings for a caller selected subset of the Win32 API
//! surface: platform-invoke entry points, COM interfaces as vtable
//! structs, constants, enums, typedef'd handles, structures and unions,
//! function pointer types, and the safe-handle wrappers paired with
//! handle releasing APIs.
//!
//! # Architecture
//!
//! The crate is layered bottom up:
//!
//! - **File layer**: PE container access, memory mapped or in memory
//! - **Metadata layer**: ECMA-335 streams, tables, signatures and interop
//!   attributes, folded once per session into an owned model behind a
//!   name and token index
//! - **Projection**: metadata type signatures to Rust type expressions,
//!   context sensitive (fields stay ABI exact, friendly call boundaries
//!   substitute booleans and safe handles)
//! - **Emission**: one emitter per entity kind, driven by a deduplicating
//!   pending-key work loop that terminates on cyclic reference graphs
//! - **Facade**: [`Generator`] with by-name, by-module-pattern and
//!   generate-all requests, cooperative cancellation, and collision
//!   handling against the consuming compilation
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wingen::{CancellationToken, CompilationView, Generator, GeneratorOptions};
//!
//! let mut generator = Generator::from_file(
//!     Path::new("Windows.Win32.winmd"),
//!     GeneratorOptions::default(),
//!     CompilationView::new(),
//! )?;
//!
//! let token = CancellationToken::new();
//! if generator.generate("CreateFile", &token)? {
//!     for file in generator.files() {
//!         println!("==> {}\n{}", file.path, file.contents);
//!     }
//! }
//! # Ok::<(), wingen::Error>(())
//! ```
//!
//! The generator never writes anywhere; the host receives a map from
//! logical file path to source text and owns all I/O. A request for a
//! name absent from the metadata returns `Ok(false)`; malformed metadata
//! is a hard error; a direct request for `GetLastError` fails with
//! [`Error::NotSupported`].

#[macro_use]
pub(crate) mod error;

pub(crate) mod accumulator;
pub(crate) mod collision;
pub(crate) mod emit;
pub(crate) mod file;
pub(crate) mod generator;
pub(crate) mod handles;
pub(crate) mod project;

pub mod metadata;

pub use accumulator::SourceFile;
pub use collision::{CompilationView, SymbolKind};
pub use error::Error;
pub use file::File;
pub use generator::{CancellationToken, Generator, GeneratorOptions};
pub use handles::{ReleaseClassification, SafeHandleDescriptor};
pub use metadata::index::MetadataIndex;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
