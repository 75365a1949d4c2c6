//! The elaborated register-map tree consumed by the ferrite generator.
//!
//! A [`RegMap`] is an arena of [`Node`]s rooted at a top-level address map.
//! Nodes carry the closed, typed property sets (access modes, reset
//! specifications, side-effect behaviors, counter and interrupt machinery)
//! that the generation passes compile into RTL. The tree is produced by an
//! upstream front end through [`RegMapBuilder`] and is immutable once built.

#![warn(missing_docs)]

pub mod access;
pub mod arena;
pub mod builder;
pub mod ids;
pub mod node;
pub mod props;
pub mod regmap;

pub use access::{Access, OnRead, OnWrite, Precedence};
pub use arena::{Arena, ArenaId};
pub use builder::RegMapBuilder;
pub use ids::NodeId;
pub use node::{Node, NodeKind};
pub use props::{
    ControlProp, CounterProps, FieldProps, IntrKind, IntrProps, MemProps, RegProps, ResetProp,
    SignalProps, StepProp, Stickiness,
};
pub use regmap::RegMap;
