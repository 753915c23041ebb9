//! Graph node contract and shared node infrastructure.

pub mod attribute;
pub mod input_nodes;
pub mod texture_nodes;

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::builder::Builder;
use crate::format::Format;

/// Shared handle to a graph node.
///
/// Nodes are reference-counted so a sub-expression can appear at several
/// graph positions; compilation is single-threaded, so plain `Rc` suffices.
pub type NodeRef = Rc<dyn ShaderNode>;

/// The contract every node kind satisfies.
///
/// `build` is the public entry point a parent (or the builder) invokes with
/// the desired output format; it delegates to `generate`, which emits the
/// node's source fragment and coerces it to the requested format. The builder
/// never inspects node internals except through this trait.
pub trait ShaderNode {
    /// Stable identity, used for shared-uniform caching and serialization.
    fn uuid(&self) -> Uuid;

    /// Node kind tag recorded in serialized form.
    fn node_type(&self) -> &'static str;

    /// Emit this node's source fragment, coerced to `output`.
    fn generate(&self, builder: &mut Builder, output: Format) -> Result<String>;

    /// Build this node to a fragment of the given output format.
    fn build(&self, builder: &mut Builder, output: Format) -> Result<String> {
        self.generate(builder, output)
    }

    /// Record this node (and its children) in the registry, returning its
    /// representation. Must be idempotent per identity.
    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData>;
}

/// Serialized form of a single node: identity, kind, and kind-specific
/// parameters. Children are referenced by uuid, not nested.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeData {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

/// Registry threaded through `serialize` so shared subtrees serialize once
/// and reference cycles terminate.
#[derive(Default)]
pub struct MetaRegistry {
    nodes: HashMap<Uuid, NodeData>,
}

impl MetaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uuid: Uuid) -> Option<&NodeData> {
        self.nodes.get(&uuid)
    }

    pub fn put(&mut self, data: NodeData) {
        self.nodes.insert(data.uuid, data);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All recorded nodes, for embedding into a persisted graph document.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.values()
    }
}

/// Shared behavior for input-style nodes whose value lives in a uniform
/// rather than inline code: register the uniform under the builder's scoped
/// identity and return the reference fragment. Concrete node kinds call into
/// this instead of inheriting from a base kind.
pub fn input_reference(builder: &mut Builder, uuid: Uuid, format: Format) -> String {
    let key = builder.scoped_uuid(&uuid.to_string());
    builder.register_shared_input(&key, format)
}

/// Serialize a child and return its uuid for referencing from the parent's
/// params.
pub fn serialize_child(child: &NodeRef, meta: &mut MetaRegistry) -> Result<Uuid> {
    Ok(child.serialize(meta)?.uuid)
}
