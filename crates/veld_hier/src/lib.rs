//! The elaborated hierarchy model for the VELD elaboration core.
//!
//! This crate defines the arena-allocated symbol tree an elaboration
//! produces: [`Symbol`] is a tagged sum over instance, instance-array,
//! primitive, checker, and uninstantiated-placeholder variants, and
//! [`InstanceBody`] holds a body's parameters, members, and lazily resolved
//! port list.
//!
//! # Architecture
//!
//! - **[`Arena`]** provides dense, ID-indexed storage; items are appended and
//!   never removed, so IDs stay stable for the compilation's lifetime.
//! - **Opaque IDs** ([`SymbolId`], [`BodyId`], [`DefId`], ...) are `Copy` +
//!   `Hash` non-owning references between nodes; back-pointers
//!   (`InstanceBody::parent_instance`) are IDs too, so the graph stays free
//!   of shared-ownership cycles.
//! - **[`Lazy`]** models one-shot lazily computed attributes
//!   (`Unset | InProgress | Ready`); re-entrant observation during
//!   `InProgress` is how port-connection resolution tolerates cycles.
//!
//! Symbols borrow the parsed trees (`&'a` references into `veld_ast`
//! values); the arena's lifetime is dominated by the AST's.

#![warn(missing_docs)]

pub mod arena;
pub mod ids;
pub mod lazy;
pub mod symbols;
pub mod value;

pub use arena::{Arena, ArenaId};
pub use ids::{
    BodyId, ConfigId, DefId, LibraryId, OverrideNodeId, ResolvedConfigId, SymbolId,
};
pub use lazy::Lazy;
pub use symbols::{
    CheckerConnection, CheckerInstance, Connection, ConstantRange, Hierarchy, Instance,
    InstanceArray, InstanceBody, Member, ParamSym, PortSym, PortSymKind, PrimConnection, PrimRef,
    PrimitiveInstance, Symbol, UninstantiatedDef,
};
pub use value::ParamValue;
