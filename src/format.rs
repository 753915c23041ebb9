//! The format type system: closed value-shape tags and coercion between them.

use crate::error::ShadeError;

/// Shape of a shading-language value produced by a graph node.
///
/// Each format carries the short code used by the persisted graph form
/// (`fv1`, `v2`, ... `t`); the codes are independent of GLSL type syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Scalar float, code `fv1`.
    Float,
    /// 2-component vector, code `v2`.
    Vec2,
    /// 3-component vector, code `v3`.
    Vec3,
    /// 4-component vector, code `v4`.
    Vec4,
    /// Scalar integer, code `iv1`.
    Int,
    /// 3x3 matrix, code `m3`.
    Mat3,
    /// 4x4 matrix, code `m4`.
    Mat4,
    /// 2D sampler handle, code `t`.
    Sampler2D,
    /// Cube sampler handle, code `tc`.
    SamplerCube,
}

/// Channel letters in positional order.
pub const ELEMENTS: [char; 4] = ['x', 'y', 'z', 'w'];

/// GLSL constructor keywords for values of length 1 to 4.
const CONSTRUCTORS: [&str; 4] = ["float", "vec2", "vec3", "vec4"];

impl Format {
    /// The persisted short code for this format.
    pub fn code(self) -> &'static str {
        match self {
            Format::Float => "fv1",
            Format::Vec2 => "v2",
            Format::Vec3 => "v3",
            Format::Vec4 => "v4",
            Format::Int => "iv1",
            Format::Mat3 => "m3",
            Format::Mat4 => "m4",
            Format::Sampler2D => "t",
            Format::SamplerCube => "tc",
        }
    }

    /// Parse a short code. Accepts the normalized spellings (`v1`, `i`) and
    /// the color alias `c` (a 3-vector). Malformed codes are an error, never
    /// a guessed default.
    pub fn from_code(code: &str) -> Result<Self, ShadeError> {
        Ok(match code {
            "fv1" | "v1" => Format::Float,
            "v2" => Format::Vec2,
            "v3" | "c" => Format::Vec3,
            "v4" => Format::Vec4,
            "iv1" | "i" => Format::Int,
            "m3" => Format::Mat3,
            "m4" => Format::Mat4,
            "t" => Format::Sampler2D,
            "tc" => Format::SamplerCube,
            other => return Err(ShadeError::UnknownFormat(other.to_string())),
        })
    }

    /// Component length: scalars are 1, vectors their arity, matrices their
    /// row count. Sampler handles have no length.
    pub fn length(self) -> Result<usize, ShadeError> {
        Ok(match self {
            Format::Float | Format::Int => 1,
            Format::Vec2 => 2,
            Format::Vec3 | Format::Mat3 => 3,
            Format::Vec4 | Format::Mat4 => 4,
            Format::Sampler2D | Format::SamplerCube => {
                return Err(ShadeError::NoLength(self.code()));
            }
        })
    }

    /// Inverse of [`Format::length`] for the synthesizable formats: 1 is a
    /// float scalar, 2-4 the matching vector. Matrices are never synthesized
    /// from a length.
    pub fn from_length(len: usize) -> Result<Self, ShadeError> {
        Ok(match len {
            1 => Format::Float,
            2 => Format::Vec2,
            3 => Format::Vec3,
            4 => Format::Vec4,
            other => return Err(ShadeError::BadLength(other)),
        })
    }

    /// Whether the short code carries the matrix marker.
    pub fn is_matrix(self) -> bool {
        matches!(self, Format::Mat3 | Format::Mat4)
    }

    /// Whether this format is a sampler handle rather than a value.
    pub fn is_sampler(self) -> bool {
        matches!(self, Format::Sampler2D | Format::SamplerCube)
    }

    /// The GLSL type name for this format.
    pub fn glsl(self) -> &'static str {
        match self {
            Format::Float => "float",
            Format::Vec2 => "vec2",
            Format::Vec3 => "vec3",
            Format::Vec4 => "vec4",
            Format::Int => "int",
            Format::Mat3 => "mat3",
            Format::Mat4 => "mat4",
            Format::Sampler2D => "sampler2D",
            Format::SamplerCube => "samplerCube",
        }
    }
}

/// GLSL constructor keyword for building a value of `len` scalar parts.
pub fn constructor_for_length(len: usize) -> Result<&'static str, ShadeError> {
    CONSTRUCTORS
        .get(len.wrapping_sub(1))
        .copied()
        .ok_or(ShadeError::BadLength(len))
}

/// Channel letter at an ordinal position (0..3).
pub fn element_at(index: usize) -> Option<char> {
    ELEMENTS.get(index).copied()
}

/// Ordinal position of a channel letter.
pub fn index_of_element(elm: char) -> Option<usize> {
    ELEMENTS.iter().position(|&e| e == elm)
}

/// Substitute color-channel accessors for positional ones in a swizzle
/// string (`"rgb"` becomes `"xyz"`). Non-channel characters pass through.
pub fn color_to_vector(swizzle: &str) -> String {
    swizzle
        .chars()
        .map(|c| match c {
            'r' => 'x',
            'g' => 'y',
            'b' => 'z',
            'a' => 'w',
            other => other,
        })
        .collect()
}

/// Coerce a source fragment from one format to another.
///
/// The (to, from) pair selects a fixed template; pairs outside the table
/// (same format, matrices, samplers) pass the code through unchanged and are
/// treated as already compatible.
pub fn convert(code: &str, from: Format, to: Format) -> String {
    use Format::*;

    match (to, from) {
        (Float, Vec2) | (Float, Vec3) | (Float, Vec4) => format!("{code}.x"),
        (Float, Int) => format!("float( {code} )"),

        (Vec2, Float) => format!("vec2( {code} )"),
        (Vec2, Vec3) | (Vec2, Vec4) => format!("{code}.xy"),
        (Vec2, Int) => format!("vec2( float( {code} ) )"),

        (Vec3, Float) => format!("vec3( {code} )"),
        (Vec3, Vec2) => format!("vec3( {code}, 0.0 )"),
        (Vec3, Vec4) => format!("{code}.xyz"),
        (Vec3, Int) => format!("vec3( float( {code} ) )"),

        (Vec4, Float) => format!("vec4( {code} )"),
        (Vec4, Vec2) => format!("vec4( {code}, 0.0, 1.0 )"),
        (Vec4, Vec3) => format!("vec4( {code}, 1.0 )"),
        (Vec4, Int) => format!("vec4( float( {code} ) )"),

        (Int, Float) => format!("int( {code} )"),
        (Int, Vec2) | (Int, Vec3) | (Int, Vec4) => format!("int( {code}.x )"),

        _ => code.to_string(),
    }
}
