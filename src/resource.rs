//! External texture resources referenced by sampling nodes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encoding::Encoding;

/// How a texture's coordinates are interpreted, selecting the sampling
/// strategy a resolved node uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureMapping {
    #[default]
    Uv,
    CubeReflection,
    CubeRefraction,
    CubeUvReflection,
    CubeUvRefraction,
}

/// Contract a texture resource satisfies for the compiler: a stable identity,
/// a color encoding, and a mapping mode. The resource itself (pixel data,
/// GPU handle) is owned elsewhere; nodes hold shared references.
#[derive(Clone, Debug)]
pub struct TextureResource {
    pub uuid: Uuid,
    pub encoding: Encoding,
    pub mapping: TextureMapping,
}

impl TextureResource {
    pub fn new(encoding: Encoding, mapping: TextureMapping) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            encoding,
            mapping,
        }
    }

    /// A plain linear UV-mapped texture.
    pub fn linear() -> Self {
        Self::new(Encoding::Linear, TextureMapping::Uv)
    }
}
