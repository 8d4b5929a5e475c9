//! The VELD hierarchical elaboration core.
//!
//! Given parsed design units tagged with source libraries, this crate
//! resolves top-level instances and recursively instantiates a typed symbol
//! tree, honoring library search order, per-configuration cell and instance
//! overrides, parameter overrides, and bind directives.
//!
//! # Architecture
//!
//! - **[`Compilation`]** owns every arena (definitions, configs, override
//!   nodes, symbols) for one run; the parsed trees, interner, and
//!   diagnostic sink are borrowed for its lifetime.
//! - **[`LibraryRegistry`]** orders the named source libraries; the default
//!   library sorts last unless explicitly listed.
//! - **[`DefinitionRegistry`]** resolves `(name, library)` pairs and
//!   implements the effective-liblist search with configuration rules.
//! - **[`ConfigBlock`]** models a parsed configuration: top cells, default
//!   liblist, cell overrides, and the per-instance override trie.
//! - **[`HierarchyOverrideGraph`]** mirrors the instance hierarchy with
//!   defparam values and bind directives, dual-keyed by syntactic identity
//!   and by name.
//! - **[`ParameterBuilder`]** merges declaration defaults, instantiation
//!   assignments, config rule overrides, and hierarchy overrides.
//!
//! Elaboration is single-threaded and re-entrant: lazily computed
//! attributes (port lists, port connections, package bodies) may recurse
//! arbitrarily deep before returning, guarded by one-shot
//! [`Lazy`](veld_hier::Lazy) cells.

#![warn(missing_docs)]

pub mod compilation;
pub mod config;
pub mod definition;
pub mod errors;
pub mod eval;
pub mod library;
pub mod options;
pub mod overrides;
pub mod params;
pub mod registry;

mod body;
mod builder;
mod checker;
mod elaborator;
mod packages;
mod ports;

pub use compilation::Compilation;
pub use config::{ConfigBlock, ConfigRule, ResolvedConfig};
pub use definition::{DefKind, Definition};
pub use eval::ConstEnv;
pub use library::{LibraryRegistry, SourceLibrary};
pub use options::{CompilationOptions, OptionsError};
pub use overrides::HierarchyOverrideGraph;
pub use params::ParameterBuilder;
pub use registry::{DefOrConfig, DefinitionRegistry};
