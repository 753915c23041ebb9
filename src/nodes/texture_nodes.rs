//! Texture sampling nodes (2D, cube, and cube-UV composition).

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use serde_json::json;
use uuid::Uuid;

use crate::builder::{Builder, Require};
use crate::format::{self, Format};
use crate::nodes::attribute::UvNode;
use crate::nodes::{self, MetaRegistry, NodeData, NodeRef, ShaderNode, serialize_child};
use crate::resource::TextureResource;

/// Samples a 2D texture at a coordinate, with optional mip bias and
/// projective sampling, decoding the texel to linear space.
///
/// A pure function of its children and the builder's context at build time;
/// the texture resource itself is owned by the surrounding material.
pub struct TextureNode {
    uuid: Uuid,
    pub value: Option<Rc<TextureResource>>,
    pub coord: NodeRef,
    pub bias: Option<NodeRef>,
    pub project: bool,
}

impl TextureNode {
    pub fn new(value: Rc<TextureResource>) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn with_coord(mut self, coord: NodeRef) -> Self {
        self.coord = coord;
        self
    }

    pub fn with_bias(mut self, bias: NodeRef) -> Self {
        self.bias = Some(bias);
        self
    }

    pub fn projective(mut self) -> Self {
        self.project = true;
        self
    }

    /// Sampler-reference fragment for this node's texture, allocated (or
    /// reused) through the builder's scoped identity convention.
    pub fn get_texture(&self, builder: &mut Builder) -> Result<String> {
        let value = self
            .value
            .as_ref()
            .ok_or_else(|| anyhow!("texture node {} has no resource bound", self.uuid))?;
        Ok(nodes::input_reference(builder, value.uuid, Format::Sampler2D))
    }

    /// Partial overwrite from another node: `coord` and `project` always,
    /// `value` and `bias` only when the source defines them.
    pub fn copy(&mut self, source: &TextureNode) {
        if source.value.is_some() {
            self.value = source.value.clone();
        }
        self.coord = Rc::clone(&source.coord);
        if source.bias.is_some() {
            self.bias = source.bias.clone();
        }
        self.project = source.project;
    }
}

impl Default for TextureNode {
    fn default() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            value: None,
            coord: Rc::new(UvNode::new()),
            bias: None,
            project: false,
        }
    }
}

impl ShaderNode for TextureNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "Texture"
    }

    fn generate(&self, builder: &mut Builder, output: Format) -> Result<String> {
        let tex = self.get_texture(builder)?;

        // The caller wants the sampler handle itself, not a sampled value.
        if output == Format::Sampler2D {
            return Ok(tex);
        }

        let coord_format = if self.project {
            Format::Vec4
        } else {
            Format::Vec2
        };
        let coord = self.coord.build(builder, coord_format)?;

        let mut bias = match &self.bias {
            Some(node) => Some(node.build(builder, Format::Float)?),
            None => None,
        };

        // An enclosing cache may inject an implicit bias (e.g. mip bias from
        // roughness) without this node knowing about it.
        if bias.is_none() {
            if let Some(Require::Bias(make)) = builder.requirement("bias").cloned() {
                if let Some(value) = self.value.as_ref() {
                    bias = Some(make(Rc::clone(value)).build(builder, Format::Float)?);
                }
            }
        }

        let method = if self.project {
            "texture2DProj"
        } else if bias.is_some() {
            "tex2DBias"
        } else {
            "tex2D"
        };

        let code = match &bias {
            Some(bias) => format!("{method}( {tex}, {coord}, {bias} )"),
            None => format!("{method}( {tex}, {coord} )"),
        };

        let code = builder.decoding_function_for_resource(&code, self.value.as_deref());

        Ok(format::convert(&code, Format::Vec4, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        if let Some(existing) = meta.get(self.uuid) {
            return Ok(existing.clone());
        }

        // Register the identity first so shared subtrees and reference
        // cycles terminate on the uuid.
        meta.put(NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params: HashMap::new(),
        });

        let mut params = HashMap::new();
        if let Some(value) = &self.value {
            params.insert("value".to_string(), json!(value.uuid));
        }
        params.insert("coord".to_string(), json!(serialize_child(&self.coord, meta)?));
        params.insert("project".to_string(), json!(self.project));
        if let Some(bias) = &self.bias {
            params.insert("bias".to_string(), json!(serialize_child(bias, meta)?));
        }

        let data = NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params,
        };
        meta.put(data.clone());
        Ok(data)
    }
}

/// Samples a cube texture along a direction vector. Produced by resolution
/// of resources with cube reflection/refraction mappings.
pub struct CubeTextureNode {
    uuid: Uuid,
    pub value: Rc<TextureResource>,
    /// Direction child; defaults to the reflection vector varying.
    pub coord: Option<NodeRef>,
    pub bias: Option<NodeRef>,
}

impl CubeTextureNode {
    pub fn new(value: Rc<TextureResource>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            value,
            coord: None,
            bias: None,
        }
    }

    pub fn get_texture(&self, builder: &mut Builder) -> String {
        nodes::input_reference(builder, self.value.uuid, Format::SamplerCube)
    }
}

impl ShaderNode for CubeTextureNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "CubeTexture"
    }

    fn generate(&self, builder: &mut Builder, output: Format) -> Result<String> {
        let tex = self.get_texture(builder);

        if output == Format::SamplerCube {
            return Ok(tex);
        }

        let coord = match &self.coord {
            Some(node) => node.build(builder, Format::Vec3)?,
            None => "vReflect".to_string(),
        };

        let mut bias = match &self.bias {
            Some(node) => Some(node.build(builder, Format::Float)?),
            None => None,
        };
        if bias.is_none() {
            if let Some(Require::Bias(make)) = builder.requirement("bias").cloned() {
                bias = Some(make(Rc::clone(&self.value)).build(builder, Format::Float)?);
            }
        }

        let code = match &bias {
            Some(bias) => format!("textureCubeBias( {tex}, {coord}, {bias} )"),
            None => format!("textureCube( {tex}, {coord} )"),
        };

        let code = builder.decoding_function_for_resource(&code, Some(&self.value));

        Ok(format::convert(&code, Format::Vec4, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        if let Some(existing) = meta.get(self.uuid) {
            return Ok(existing.clone());
        }
        meta.put(NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params: HashMap::new(),
        });

        let mut params = HashMap::new();
        params.insert("value".to_string(), json!(self.value.uuid));
        if let Some(coord) = &self.coord {
            params.insert("coord".to_string(), json!(serialize_child(coord, meta)?));
        }
        if let Some(bias) = &self.bias {
            params.insert("bias".to_string(), json!(serialize_child(bias, meta)?));
        }

        let data = NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params,
        };
        meta.put(data.clone());
        Ok(data)
    }
}

/// Cube sampling through a 2D texture laid out as a cube-UV atlas: composes
/// a plain [`TextureNode`] for the sampler with an atlas lookup call.
/// Produced by resolution of resources with cube-UV mappings.
pub struct CubeUvTextureNode {
    uuid: Uuid,
    pub texture: TextureNode,
    pub coord: Option<NodeRef>,
    pub bias: Option<NodeRef>,
}

impl CubeUvTextureNode {
    pub fn new(texture: TextureNode) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            texture,
            coord: None,
            bias: None,
        }
    }
}

impl ShaderNode for CubeUvTextureNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "CubeUvTexture"
    }

    fn generate(&self, builder: &mut Builder, output: Format) -> Result<String> {
        let tex = self.texture.get_texture(builder)?;

        if output == Format::Sampler2D {
            return Ok(tex);
        }

        let coord = match &self.coord {
            Some(node) => node.build(builder, Format::Vec3)?,
            None => "vReflect".to_string(),
        };

        let bias = match &self.bias {
            Some(node) => node.build(builder, Format::Float)?,
            None => "0.0".to_string(),
        };

        let code = format!("textureCubeUV( {tex}, {coord}, {bias} )");
        let code = builder.decoding_function_for_resource(&code, self.texture.value.as_deref());

        Ok(format::convert(&code, Format::Vec4, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        if let Some(existing) = meta.get(self.uuid) {
            return Ok(existing.clone());
        }
        meta.put(NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params: HashMap::new(),
        });

        let mut params = HashMap::new();
        params.insert(
            "texture".to_string(),
            json!(self.texture.serialize(meta)?.uuid),
        );
        if let Some(coord) = &self.coord {
            params.insert("coord".to_string(), json!(serialize_child(coord, meta)?));
        }
        if let Some(bias) = &self.bias {
            params.insert("bias".to_string(), json!(serialize_child(bias, meta)?));
        }

        let data = NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params,
        };
        meta.put(data.clone());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BiasFactory, CompileOptions, Requires};
    use crate::encoding::Encoding;
    use crate::nodes::input_nodes::FloatNode;
    use crate::resource::TextureMapping;

    fn linear_texture() -> Rc<TextureResource> {
        Rc::new(TextureResource::linear())
    }

    #[test]
    fn plain_sample_with_default_uv() {
        let mut builder = Builder::new();
        let node = TextureNode::new(linear_texture());
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(code, "tex2D( node_tex_0, vUv )");
    }

    #[test]
    fn projective_sample_widens_coord() {
        let mut builder = Builder::new();
        let node = TextureNode::new(linear_texture()).projective();
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(
            code,
            "texture2DProj( node_tex_0, vec4( vUv, 0.0, 1.0 ) )"
        );
    }

    #[test]
    fn explicit_bias_selects_biased_sampling() {
        let mut builder = Builder::new();
        let node =
            TextureNode::new(linear_texture()).with_bias(Rc::new(FloatNode::new(0.5)));
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(code, "tex2DBias( node_tex_0, vUv, 0.5 )");
    }

    #[test]
    fn cache_requirement_injects_implicit_bias() {
        let mut builder = Builder::new();
        let factory: BiasFactory = Rc::new(|_value| Rc::new(FloatNode::new(1.5)) as NodeRef);
        builder.push_cache("env", Requires::new());
        builder.register_requirement("bias", Require::Bias(factory));

        let node = TextureNode::new(linear_texture());
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(code, "tex2DBias( node_tex_0, vUv, 1.5 )");

        // Outside the cache the same node samples plainly.
        builder.pop_cache();
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert!(code.starts_with("tex2D( "));
    }

    #[test]
    fn srgb_texel_is_decoded() {
        let mut builder = Builder::new();
        let resource = Rc::new(TextureResource::new(Encoding::Srgb, TextureMapping::Uv));
        let node = TextureNode::new(resource);
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(code, "sRGBToLinear( tex2D( node_tex_0, vUv ) )");
    }

    #[test]
    fn output_format_is_coerced() {
        let mut builder = Builder::new();
        let node = TextureNode::new(linear_texture());
        let code = node.generate(&mut builder, Format::Vec3).unwrap();
        assert_eq!(code, "tex2D( node_tex_0, vUv ).xyz");
        let code = node.generate(&mut builder, Format::Float).unwrap();
        assert_eq!(code, "tex2D( node_tex_0, vUv ).x");
    }

    #[test]
    fn sampler_output_returns_handle() {
        let mut builder = Builder::new();
        let node = TextureNode::new(linear_texture());
        let code = node.generate(&mut builder, Format::Sampler2D).unwrap();
        assert_eq!(code, "node_tex_0");
    }

    #[test]
    fn same_resource_reuses_sampler() {
        let mut builder = Builder::new();
        let resource = linear_texture();
        let a = TextureNode::new(Rc::clone(&resource));
        let b = TextureNode::new(resource);
        a.generate(&mut builder, Format::Vec4).unwrap();
        b.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(builder.shared_inputs().len(), 1);
    }

    #[test]
    fn cache_scopes_separate_sampler_identities() {
        let mut builder = Builder::new();
        let resource = linear_texture();
        let node = TextureNode::new(resource);
        node.generate(&mut builder, Format::Vec4).unwrap();
        builder.push_cache("env", Requires::new());
        node.generate(&mut builder, Format::Vec4).unwrap();
        builder.pop_cache();
        assert_eq!(builder.shared_inputs().len(), 2);
    }

    #[test]
    fn unbound_texture_is_an_error() {
        let mut builder = Builder::new();
        let node = TextureNode::default();
        assert!(node.generate(&mut builder, Format::Vec4).is_err());
    }

    #[test]
    fn gamma_override_escalates_linear_decode() {
        let mut builder = Builder::with_options(CompileOptions {
            legacy_gamma_input: true,
        });
        builder.push_cache("", Requires::new());
        builder.register_requirement("gamma", Require::Node(Rc::new(FloatNode::new(1.0))));

        let node = TextureNode::new(linear_texture());
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(
            code,
            "GammaToLinear( tex2D( node_tex_0, vUv ), float( GAMMA_FACTOR ) )"
        );
    }

    #[test]
    fn gamma_requirement_alone_does_not_escalate() {
        let mut builder = Builder::new();
        builder.push_cache("", Requires::new());
        builder.register_requirement("gamma", Require::Node(Rc::new(FloatNode::new(1.0))));

        let node = TextureNode::new(linear_texture());
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(code, "tex2D( node_tex_0, vUv )");
    }

    #[test]
    fn copy_overwrites_partially() {
        let original_value = linear_texture();
        let original_bias: NodeRef = Rc::new(FloatNode::new(0.25));
        let mut target = TextureNode::new(Rc::clone(&original_value))
            .with_bias(Rc::clone(&original_bias));

        let source_coord: NodeRef = Rc::new(UvNode::with_channel(1));
        let mut source = TextureNode::default().with_coord(Rc::clone(&source_coord));
        source.project = true;

        target.copy(&source);

        assert_eq!(
            target.value.as_ref().unwrap().uuid,
            original_value.uuid
        );
        assert_eq!(target.bias.as_ref().unwrap().uuid(), original_bias.uuid());
        assert_eq!(target.coord.uuid(), source_coord.uuid());
        assert!(target.project);
    }

    #[test]
    fn copy_takes_defined_value_and_bias() {
        let mut target = TextureNode::default();
        let source = TextureNode::new(linear_texture())
            .with_bias(Rc::new(FloatNode::new(0.5)));
        target.copy(&source);
        assert!(target.value.is_some());
        assert!(target.bias.is_some());
        assert!(!target.project);
    }

    #[test]
    fn serialization_is_idempotent() {
        let mut meta = MetaRegistry::new();
        let node = TextureNode::new(linear_texture()).with_bias(Rc::new(FloatNode::new(0.5)));

        let first = node.serialize(&mut meta).unwrap();
        let second = node.serialize(&mut meta).unwrap();

        assert_eq!(first.uuid, second.uuid);
        assert_eq!(first.params["project"], serde_json::json!(false));
        assert!(first.params.contains_key("value"));
        assert!(first.params.contains_key("coord"));
        assert!(first.params.contains_key("bias"));
        // Texture node, coord child, bias child.
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn shared_subtree_serializes_once() {
        let mut meta = MetaRegistry::new();
        let shared_coord: NodeRef = Rc::new(UvNode::new());
        let a = TextureNode::new(linear_texture()).with_coord(Rc::clone(&shared_coord));
        let b = TextureNode::new(linear_texture()).with_coord(shared_coord);

        a.serialize(&mut meta).unwrap();
        b.serialize(&mut meta).unwrap();

        // Two texture nodes, one shared coordinate node.
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn cube_texture_samples_along_reflection() {
        let mut builder = Builder::new();
        let resource = Rc::new(TextureResource::new(
            Encoding::Linear,
            TextureMapping::CubeReflection,
        ));
        let node = CubeTextureNode::new(resource);
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(code, "textureCube( node_tex_0, vReflect )");
    }

    #[test]
    fn cube_texture_sampler_handle() {
        let mut builder = Builder::new();
        let resource = Rc::new(TextureResource::new(
            Encoding::Rgbm16,
            TextureMapping::CubeReflection,
        ));
        let node = CubeTextureNode::new(resource);
        let code = node.generate(&mut builder, Format::SamplerCube).unwrap();
        assert_eq!(code, "node_tex_0");
    }

    #[test]
    fn cube_uv_texture_decodes_atlas_lookup() {
        let mut builder = Builder::new();
        let resource = Rc::new(TextureResource::new(
            Encoding::Rgbm16,
            TextureMapping::CubeUvReflection,
        ));
        let node = CubeUvTextureNode::new(TextureNode::new(resource));
        let code = node.generate(&mut builder, Format::Vec4).unwrap();
        assert_eq!(
            code,
            "RGBMToLinear( textureCubeUV( node_tex_0, vReflect, 0.0 ), 16.0 )"
        );
    }
}
