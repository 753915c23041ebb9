//! Constant input nodes wrapping raw scalar and vector values.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use crate::builder::Builder;
use crate::format::{self, Format};
use crate::nodes::{MetaRegistry, NodeData, ShaderNode};

/// GLSL float literal; `Debug` formatting keeps the decimal point GLSL
/// requires (`1.0`, not `1`).
fn float_literal(v: f32) -> String {
    format!("{v:?}")
}

fn constant_data(
    uuid: Uuid,
    node_type: &str,
    value: serde_json::Value,
    meta: &mut MetaRegistry,
) -> NodeData {
    if let Some(existing) = meta.get(uuid) {
        return existing.clone();
    }
    let mut params = HashMap::new();
    params.insert("value".to_string(), value);
    let data = NodeData {
        uuid,
        node_type: node_type.to_string(),
        params,
    };
    meta.put(data.clone());
    data
}

/// Scalar float constant.
pub struct FloatNode {
    uuid: Uuid,
    pub value: f32,
}

impl FloatNode {
    pub fn new(value: f32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            value,
        }
    }
}

impl ShaderNode for FloatNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "Float"
    }

    fn generate(&self, _builder: &mut Builder, output: Format) -> Result<String> {
        Ok(format::convert(
            &float_literal(self.value),
            Format::Float,
            output,
        ))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        Ok(constant_data(
            self.uuid,
            self.node_type(),
            json!(self.value),
            meta,
        ))
    }
}

/// 2-component vector constant.
pub struct Vector2Node {
    uuid: Uuid,
    pub value: glam::Vec2,
}

impl Vector2Node {
    pub fn new(value: glam::Vec2) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            value,
        }
    }
}

impl ShaderNode for Vector2Node {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "Vector2"
    }

    fn generate(&self, _builder: &mut Builder, output: Format) -> Result<String> {
        let ctor = format::constructor_for_length(2)?;
        let code = format!(
            "{ctor}( {}, {} )",
            float_literal(self.value.x),
            float_literal(self.value.y)
        );
        Ok(format::convert(&code, Format::Vec2, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        Ok(constant_data(
            self.uuid,
            self.node_type(),
            json!(self.value),
            meta,
        ))
    }
}

/// 3-component vector constant.
pub struct Vector3Node {
    uuid: Uuid,
    pub value: glam::Vec3,
}

impl Vector3Node {
    pub fn new(value: glam::Vec3) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            value,
        }
    }
}

impl ShaderNode for Vector3Node {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "Vector3"
    }

    fn generate(&self, _builder: &mut Builder, output: Format) -> Result<String> {
        let ctor = format::constructor_for_length(3)?;
        let code = format!(
            "{ctor}( {}, {}, {} )",
            float_literal(self.value.x),
            float_literal(self.value.y),
            float_literal(self.value.z)
        );
        Ok(format::convert(&code, Format::Vec3, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        Ok(constant_data(
            self.uuid,
            self.node_type(),
            json!(self.value),
            meta,
        ))
    }
}

/// 4-component vector constant.
pub struct Vector4Node {
    uuid: Uuid,
    pub value: glam::Vec4,
}

impl Vector4Node {
    pub fn new(value: glam::Vec4) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            value,
        }
    }
}

impl ShaderNode for Vector4Node {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "Vector4"
    }

    fn generate(&self, _builder: &mut Builder, output: Format) -> Result<String> {
        let ctor = format::constructor_for_length(4)?;
        let code = format!(
            "{ctor}( {}, {}, {}, {} )",
            float_literal(self.value.x),
            float_literal(self.value.y),
            float_literal(self.value.z),
            float_literal(self.value.w)
        );
        Ok(format::convert(&code, Format::Vec4, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        Ok(constant_data(
            self.uuid,
            self.node_type(),
            json!(self.value),
            meta,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals_keep_decimal_point() {
        let mut builder = Builder::new();
        let code = FloatNode::new(1.0)
            .generate(&mut builder, Format::Float)
            .unwrap();
        assert_eq!(code, "1.0");
    }

    #[test]
    fn vector_constants_emit_constructors() {
        let mut builder = Builder::new();
        let code = Vector3Node::new(glam::Vec3::new(1.0, 0.5, 0.0))
            .generate(&mut builder, Format::Vec3)
            .unwrap();
        assert_eq!(code, "vec3( 1.0, 0.5, 0.0 )");
    }

    #[test]
    fn vector_constants_coerce_to_output() {
        let mut builder = Builder::new();
        let code = Vector2Node::new(glam::Vec2::new(0.25, 0.75))
            .generate(&mut builder, Format::Vec4)
            .unwrap();
        assert_eq!(code, "vec4( vec2( 0.25, 0.75 ), 0.0, 1.0 )");
        let code = Vector4Node::new(glam::Vec4::ONE)
            .generate(&mut builder, Format::Float)
            .unwrap();
        assert_eq!(code, "vec4( 1.0, 1.0, 1.0, 1.0 ).x");
    }

    #[test]
    fn serialization_records_value_once() {
        let mut meta = MetaRegistry::new();
        let node = Vector3Node::new(glam::Vec3::ZERO);
        let first = node.serialize(&mut meta).unwrap();
        let second = node.serialize(&mut meta).unwrap();
        assert_eq!(first.uuid, second.uuid);
        assert_eq!(meta.len(), 1);
        assert_eq!(first.params["value"], serde_json::json!([0.0, 0.0, 0.0]));
    }
}
