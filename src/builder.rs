//! Compilation context threading scope stacks and type state through a
//! graph traversal.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;

use crate::encoding::{self, Encoding};
use crate::format::Format;
use crate::nodes::NodeRef;
use crate::nodes::input_nodes::{Vector2Node, Vector3Node, Vector4Node};
use crate::nodes::texture_nodes::{CubeTextureNode, CubeUvTextureNode, TextureNode};
use crate::resource::{TextureMapping, TextureResource};

/// Pipeline stage currently being emitted. Compared by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Compile-wide configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompileOptions {
    /// Backward-compatibility escalation of linear texture encodings to
    /// gamma when a subtree requires it. Kept behind this single option so
    /// it can be deprecated independently of encoding resolution.
    pub legacy_gamma_input: bool,
}

/// Factory for an implicit bias node, invoked with the resource of the
/// texture node it is being injected into.
pub type BiasFactory = Rc<dyn Fn(Rc<TextureResource>) -> NodeRef>;

/// Auxiliary registration a cache scope exposes to its subtree.
#[derive(Clone)]
pub enum Require {
    /// A node made visible to the subtree as-is.
    Node(NodeRef),
    /// A constructor for an implicit mip-bias node, instantiated by texture
    /// nodes that have no explicit bias child.
    Bias(BiasFactory),
}

/// Map of auxiliary registrations scoped to one cache entry.
pub type Requires = HashMap<String, Require>;

struct CacheScope {
    name: String,
    requires: Requires,
}

struct SlotScope {
    name: String,
}

/// A uniform allocated through the shared-input registry.
#[derive(Clone, Debug)]
pub struct SharedInput {
    /// Cache-scoped identity key the uniform is reused under.
    pub key: String,
    /// Allocated GLSL identifier.
    pub name: String,
    pub format: Format,
}

/// Material collaborator: receives `include` notifications so it can
/// register global declarations when a node is first referenced.
pub trait MaterialInclude {
    fn include(
        &mut self,
        builder: &mut Builder,
        node: &NodeRef,
        parent: Option<&NodeRef>,
        source: Option<&str>,
    );
}

/// A raw value a caller hands to [`Builder::resolve`] for wrapping into a
/// graph node.
#[derive(Clone)]
pub enum Resolvable {
    Node(NodeRef),
    Texture(Rc<TextureResource>),
    Vec2(glam::Vec2),
    Vec3(glam::Vec3),
    Vec4(glam::Vec4),
}

/// Per-compilation mutable context. One instance per job; concurrent
/// compilations each use their own.
///
/// Cache and slot scopes are strictly LIFO: a child's `build` observes the
/// scope state exactly as left by its parent's most recent push. The active
/// names and requires are derived from the stack tops at read time, so no
/// mutator can leave them stale.
pub struct Builder {
    caches: Vec<CacheScope>,
    slots: Vec<SlotScope>,
    keywords: HashMap<String, NodeRef>,
    stage: ShaderStage,
    options: CompileOptions,
    material: Option<Rc<RefCell<dyn MaterialInclude>>>,
    shared_inputs: Vec<SharedInput>,
    input_index_by_key: HashMap<String, usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            caches: Vec::new(),
            slots: Vec::new(),
            keywords: HashMap::new(),
            stage: ShaderStage::Fragment,
            options,
            material: None,
            shared_inputs: Vec::new(),
            input_index_by_key: HashMap::new(),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Attach the material collaborator `include` forwards to.
    pub fn set_material(&mut self, material: Rc<RefCell<dyn MaterialInclude>>) -> &mut Self {
        self.material = Some(material);
        self
    }

    // --- scope management ---------------------------------------------------

    pub fn push_cache(&mut self, name: &str, requires: Requires) -> &mut Self {
        log::trace!("push cache `{name}`");
        self.caches.push(CacheScope {
            name: name.to_string(),
            requires,
        });
        self
    }

    pub fn pop_cache(&mut self) -> &mut Self {
        if let Some(cache) = self.caches.pop() {
            log::trace!("pop cache `{}`", cache.name);
        }
        self
    }

    pub fn push_slot(&mut self, name: &str) -> &mut Self {
        log::trace!("push slot `{name}`");
        self.slots.push(SlotScope {
            name: name.to_string(),
        });
        self
    }

    pub fn pop_slot(&mut self) -> &mut Self {
        if let Some(slot) = self.slots.pop() {
            log::trace!("pop slot `{}`", slot.name);
        }
        self
    }

    /// Run `f` inside a cache scope, popping on every exit path so an error
    /// in a subtree cannot leak scope state into siblings.
    pub fn with_cache<T>(
        &mut self,
        name: &str,
        requires: Requires,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.push_cache(name, requires);
        let result = f(self);
        self.pop_cache();
        result
    }

    /// Run `f` inside a slot scope, popping on every exit path.
    pub fn with_slot<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.push_slot(name);
        let result = f(self);
        self.pop_slot();
        result
    }

    /// Active cache name, or empty when no cache is pushed.
    pub fn cache_name(&self) -> &str {
        self.caches.last().map(|c| c.name.as_str()).unwrap_or("")
    }

    /// Active slot name, or empty when no slot is pushed.
    pub fn slot_name(&self) -> &str {
        self.slots.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Search the cache stack most-recent-first for an exact name match.
    pub fn has_cache(&self, name: &str) -> bool {
        self.caches.iter().rev().any(|c| c.name == name)
    }

    /// Search the slot stack most-recent-first for an exact name match.
    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.iter().rev().any(|s| s.name == name)
    }

    /// Register an auxiliary node under the active cache, overwriting any
    /// prior entry with the same name. The unnamed top cache is a valid
    /// target; with no cache pushed at all the registration is dropped.
    pub fn register_requirement(&mut self, name: &str, require: Require) -> &mut Self {
        match self.caches.last_mut() {
            Some(cache) => {
                cache.requires.insert(name.to_string(), require);
            }
            None => log::debug!("requirement `{name}` registered with no active cache; dropped"),
        }
        self
    }

    /// Look up a requirement in the active cache only; entries of popped
    /// caches are invisible.
    pub fn requirement(&self, name: &str) -> Option<&Require> {
        self.caches.last().and_then(|c| c.requires.get(name))
    }

    pub fn has_requirement(&self, name: &str) -> bool {
        self.requirement(name).is_some()
    }

    // --- stage --------------------------------------------------------------

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn set_stage(&mut self, stage: ShaderStage) -> &mut Self {
        self.stage = stage;
        self
    }

    pub fn is_stage(&self, stage: ShaderStage) -> bool {
        self.stage == stage
    }

    // --- keywords -----------------------------------------------------------

    /// Replacement node for an identifier, consulted by identifier-resolving
    /// node kinds.
    pub fn keyword(&self, name: &str) -> Option<&NodeRef> {
        self.keywords.get(name)
    }

    pub fn set_keyword(&mut self, name: &str, node: NodeRef) -> &mut Self {
        self.keywords.insert(name.to_string(), node);
        self
    }

    // --- identity & shared inputs -------------------------------------------

    /// Scope a stable key under the active cache name, so identical
    /// sub-expressions built in different caches get distinct identities.
    pub fn scoped_uuid(&self, uuid: &str) -> String {
        let cache = self.cache_name();
        if cache.is_empty() {
            uuid.to_string()
        } else {
            format!("{cache}-{uuid}")
        }
    }

    /// Allocate (or reuse) a uniform for a scoped identity key, returning its
    /// GLSL identifier. Repeated registrations under one key return the same
    /// name, so repeated sub-expressions are reused rather than recomputed.
    pub fn register_shared_input(&mut self, key: &str, format: Format) -> String {
        if let Some(&idx) = self.input_index_by_key.get(key) {
            return self.shared_inputs[idx].name.clone();
        }
        let kind_count = self
            .shared_inputs
            .iter()
            .filter(|i| i.format.is_sampler() == format.is_sampler())
            .count();
        let name = if format.is_sampler() {
            format!("node_tex_{kind_count}")
        } else {
            format!("node_u{kind_count}")
        };
        log::debug!("shared input `{name}` allocated for key `{key}`");
        self.input_index_by_key
            .insert(key.to_string(), self.shared_inputs.len());
        self.shared_inputs.push(SharedInput {
            key: key.to_string(),
            name: name.clone(),
            format,
        });
        name
    }

    /// Uniforms allocated so far, in registration order.
    pub fn shared_inputs(&self) -> &[SharedInput] {
        &self.shared_inputs
    }

    /// GLSL declarations for every allocated uniform.
    pub fn uniform_declarations(&self) -> String {
        self.shared_inputs
            .iter()
            .map(|i| format!("uniform {} {};\n", i.format.glsl(), i.name))
            .collect()
    }

    // --- material forwarding ------------------------------------------------

    /// Forward a first-reference notification to the material collaborator.
    pub fn include(
        &mut self,
        node: &NodeRef,
        parent: Option<&NodeRef>,
        source: Option<&str>,
    ) -> &mut Self {
        if let Some(material) = self.material.clone() {
            material.borrow_mut().include(self, node, parent, source);
        }
        self
    }

    // --- resolution ---------------------------------------------------------

    /// Wrap the first defined candidate into a graph node: nodes pass
    /// through, textures wrap by mapping mode, vectors become constant
    /// nodes. All-undefined resolves to `None`, which is a valid outcome.
    pub fn resolve(
        &self,
        candidates: impl IntoIterator<Item = Option<Resolvable>>,
    ) -> Option<NodeRef> {
        for candidate in candidates.into_iter().flatten() {
            let node: NodeRef = match candidate {
                Resolvable::Node(node) => node,
                Resolvable::Texture(texture) => match texture.mapping {
                    TextureMapping::CubeReflection | TextureMapping::CubeRefraction => {
                        Rc::new(CubeTextureNode::new(texture))
                    }
                    TextureMapping::CubeUvReflection | TextureMapping::CubeUvRefraction => {
                        Rc::new(CubeUvTextureNode::new(TextureNode::new(texture)))
                    }
                    TextureMapping::Uv => Rc::new(TextureNode::new(texture)),
                },
                Resolvable::Vec2(v) => Rc::new(Vector2Node::new(v)),
                Resolvable::Vec3(v) => Rc::new(Vector3Node::new(v)),
                Resolvable::Vec4(v) => Rc::new(Vector4Node::new(v)),
            };
            return Some(node);
        }
        None
    }

    // --- color encoding -----------------------------------------------------

    /// Encoding a resource contributes: linear when there is none, the
    /// resource's own tag otherwise, escalated from linear to gamma when the
    /// override is set (backward-compatibility path).
    pub fn encoding_from_resource(
        resource: Option<&TextureResource>,
        gamma_override: bool,
    ) -> Encoding {
        let encoding = resource.map(|r| r.encoding).unwrap_or(Encoding::Linear);
        if encoding == Encoding::Linear && gamma_override {
            Encoding::Gamma
        } else {
            encoding
        }
    }

    /// Wrap a texel fragment in the decode call for a resource's encoding.
    /// The gamma override applies only when the active cache requires
    /// `gamma` and the legacy option is enabled.
    pub fn decoding_function_for_resource(
        &self,
        code: &str,
        resource: Option<&TextureResource>,
    ) -> String {
        let gamma_override = self.has_requirement("gamma") && self.options.legacy_gamma_input;
        let encoding = Self::encoding_from_resource(resource, gamma_override);
        encoding::decoding_function(code, encoding)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
