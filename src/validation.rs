//! GLSL validation using the naga library.

use anyhow::{Context, Result, anyhow};

use crate::builder::Builder;

#[derive(Debug, Clone, Copy)]
pub enum GlslStage {
    Vertex,
    Fragment,
}

impl GlslStage {
    fn to_naga(self) -> naga::ShaderStage {
        match self {
            GlslStage::Vertex => naga::ShaderStage::Vertex,
            GlslStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// Parse and validate a complete GLSL module, returning the WGSL
/// translation on success or an error quoting the numbered source.
pub fn glsl_to_wgsl(source: &str, stage: GlslStage) -> Result<String> {
    let reject = |phase: &str, detail: String| {
        anyhow!("{phase} failed: {detail}\n{}", numbered(source))
    };

    let module = naga::front::glsl::Frontend::default()
        .parse(
            &naga::front::glsl::Options {
                stage: stage.to_naga(),
                defines: Default::default(),
            },
            source,
        )
        .map_err(|e| reject("GLSL parse", format!("{e:?}")))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| reject("GLSL validation", format!("{e:?}")))?;

    naga::back::wgsl::write_string(
        &module,
        &info,
        naga::back::wgsl::WriterFlags::EXPLICIT_TYPES,
    )
    .map_err(|e| anyhow!("WGSL writer failed: {e:?}"))
}

/// Map the legacy sampling names emitted by texture nodes onto their GLSL
/// 450 equivalents, so emitted fragments can be checked by a modern
/// frontend. (At runtime a prelude of matching defines plays this role.)
pub fn modernize_sampling_calls(expr: &str) -> String {
    expr.replace("tex2DBias(", "texture(")
        .replace("tex2D(", "texture(")
        .replace("texture2DProj(", "textureProj(")
        .replace("textureCubeBias(", "texture(")
        .replace("textureCube(", "texture(")
}

/// Texel decode helpers referenced by synthesized decode calls.
const DECODE_HELPERS: &str = "\
vec4 sRGBToLinear( vec4 value ) { return vec4( pow( value.rgb, vec3( 2.2 ) ), value.a ); }
vec4 GammaToLinear( vec4 value, float gammaFactor ) { return vec4( pow( value.rgb, vec3( gammaFactor ) ), value.a ); }
vec4 RGBEToLinear( vec4 value ) { return vec4( value.rgb * exp2( value.a * 255.0 - 128.0 ), 1.0 ); }
vec4 RGBMToLinear( vec4 value, float maxRange ) { return vec4( value.rgb * value.a * maxRange, 1.0 ); }
vec4 RGBDToLinear( vec4 value, float maxRange ) { return vec4( value.rgb * ( ( maxRange / 255.0 ) / value.a ), 1.0 ); }
";

/// Wrap an emitted fragment expression in a minimal fragment shader
/// (declaring the builder's shared uniforms and the standard varyings) and
/// validate it, returning the WGSL translation.
pub fn validate_fragment_expr(builder: &Builder, expr: &str) -> Result<String> {
    let mut uniforms = String::new();
    for (binding, input) in builder.shared_inputs().iter().enumerate() {
        if input.format.is_sampler() {
            uniforms.push_str(&format!(
                "layout(set = 0, binding = {binding}) uniform {} {};\n",
                input.format.glsl(),
                input.name
            ));
        } else {
            // Non-opaque uniforms need a block in GLSL 450.
            uniforms.push_str(&format!(
                "layout(set = 0, binding = {binding}) uniform Block{binding} {{ {} {}; }};\n",
                input.format.glsl(),
                input.name
            ));
        }
    }

    let body = modernize_sampling_calls(expr);
    let source = format!(
        "#version 450\n\n\
         {uniforms}\n\
         layout(location = 0) in vec2 vUv;\n\
         layout(location = 1) in vec3 vReflect;\n\n\
         const float GAMMA_FACTOR = 2.2;\n\n\
         {DECODE_HELPERS}\n\
         layout(location = 0) out vec4 frag_color;\n\n\
         void main() {{\n    frag_color = {body};\n}}\n"
    );

    glsl_to_wgsl(&source, GlslStage::Fragment)
        .with_context(|| format!("emitted fragment `{expr}` failed validation"))
}

fn numbered(source: &str) -> String {
    let mut output = String::from("---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
