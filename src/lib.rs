//! Shader-graph compiler core.
//!
//! Takes a directed graph of typed computation nodes (textures, vectors,
//! constants) and emits GLSL source fragments, resolving per-node output
//! formats, coercing mismatched types, and scoping name/identity so
//! repeated sub-expressions are reused rather than recomputed.
//!
//! The [`builder::Builder`] threads the traversal context — stacked cache
//! and slot scopes, the format type system, color-encoding synthesis, and
//! the shared-uniform registry — through a recursive walk of nodes
//! implementing the [`nodes::ShaderNode`] contract.

pub mod builder;
pub mod encoding;
pub mod error;
pub mod format;
pub mod nodes;
pub mod resource;
pub mod validation;

pub use builder::{
    BiasFactory, Builder, CompileOptions, MaterialInclude, Require, Requires, Resolvable,
    ShaderStage, SharedInput,
};
pub use encoding::Encoding;
pub use error::ShadeError;
pub use format::Format;
pub use nodes::{MetaRegistry, NodeData, NodeRef, ShaderNode};
pub use resource::{TextureMapping, TextureResource};
