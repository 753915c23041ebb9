//! Geometry attribute nodes.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use crate::builder::Builder;
use crate::format::{self, Format};
use crate::nodes::{MetaRegistry, NodeData, ShaderNode};

/// Emits the interpolated UV varying for a texture-coordinate channel.
///
/// The default coordinate child of texture sampling nodes.
pub struct UvNode {
    uuid: Uuid,
    pub channel: usize,
}

impl UvNode {
    pub fn new() -> Self {
        Self::with_channel(0)
    }

    pub fn with_channel(channel: usize) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            channel,
        }
    }

    /// Varying identifier for this channel: `vUv`, then `vUv2`, `vUv3`, ...
    fn varying(&self) -> String {
        if self.channel == 0 {
            "vUv".to_string()
        } else {
            format!("vUv{}", self.channel + 1)
        }
    }
}

impl Default for UvNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderNode for UvNode {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn node_type(&self) -> &'static str {
        "UV"
    }

    fn generate(&self, _builder: &mut Builder, output: Format) -> Result<String> {
        Ok(format::convert(&self.varying(), Format::Vec2, output))
    }

    fn serialize(&self, meta: &mut MetaRegistry) -> Result<NodeData> {
        if let Some(existing) = meta.get(self.uuid) {
            return Ok(existing.clone());
        }
        let mut params = HashMap::new();
        params.insert("channel".to_string(), json!(self.channel));
        let data = NodeData {
            uuid: self.uuid,
            node_type: self.node_type().to_string(),
            params,
        };
        meta.put(data.clone());
        Ok(data)
    }
}
