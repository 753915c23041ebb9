//! Color encodings and texel decode/encode fragment synthesis.

use crate::error::ShadeError;

/// How color data is packed in a texture.
///
/// Everything except `Linear` needs a decode step before linear-space use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    Linear,
    Srgb,
    Rgbe,
    /// RGBM with a max range of 7.
    Rgbm7,
    /// RGBM with a max range of 16.
    Rgbm16,
    Rgbd,
    Gamma,
}

impl Encoding {
    /// Parse a persisted encoding tag. Unknown tags fail fast; a silently
    /// substituted encoding would miscolor output.
    pub fn from_tag(tag: &str) -> Result<Self, ShadeError> {
        Ok(match tag {
            "Linear" => Encoding::Linear,
            "sRGB" => Encoding::Srgb,
            "RGBE" => Encoding::Rgbe,
            "RGBM7" => Encoding::Rgbm7,
            "RGBM16" => Encoding::Rgbm16,
            "RGBD" => Encoding::Rgbd,
            "Gamma" => Encoding::Gamma,
            other => return Err(ShadeError::UnsupportedEncoding(other.to_string())),
        })
    }

    /// The persisted tag for this encoding.
    pub fn tag(self) -> &'static str {
        match self {
            Encoding::Linear => "Linear",
            Encoding::Srgb => "sRGB",
            Encoding::Rgbe => "RGBE",
            Encoding::Rgbm7 => "RGBM7",
            Encoding::Rgbm16 => "RGBM16",
            Encoding::Rgbd => "RGBD",
            Encoding::Gamma => "Gamma",
        }
    }

    /// The (function name part, call template) pair used to synthesize
    /// decode/encode calls. The template's `value` placeholder is substituted
    /// with the caller's fragment.
    pub fn components(self) -> (&'static str, &'static str) {
        match self {
            Encoding::Linear => ("Linear", "( value )"),
            Encoding::Srgb => ("sRGB", "( value )"),
            Encoding::Rgbe => ("RGBE", "( value )"),
            Encoding::Rgbm7 => ("RGBM", "( value, 7.0 )"),
            Encoding::Rgbm16 => ("RGBM", "( value, 16.0 )"),
            Encoding::Rgbd => ("RGBD", "( value, 256.0 )"),
            Encoding::Gamma => ("Gamma", "( value, float( GAMMA_FACTOR ) )"),
        }
    }
}

/// Wrap `code` in the "<Name>ToLinear" decode call for `encoding`.
///
/// A linear texel needs no conversion, so `Linear` passes the code through.
pub fn decoding_function(code: &str, encoding: Encoding) -> String {
    if encoding == Encoding::Linear {
        return code.to_string();
    }
    let (name, template) = encoding.components();
    format!("{name}ToLinear{}", template.replace("value", code))
}

/// Wrap `code` in the "LinearTo<Name>" encode call for `encoding`.
pub fn encoding_function(code: &str, encoding: Encoding) -> String {
    if encoding == Encoding::Linear {
        return code.to_string();
    }
    let (name, template) = encoding.components();
    format!("LinearTo{name}{}", template.replace("value", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_cover_all_tags() {
        assert_eq!(Encoding::Linear.components(), ("Linear", "( value )"));
        assert_eq!(Encoding::Srgb.components(), ("sRGB", "( value )"));
        assert_eq!(Encoding::Rgbe.components(), ("RGBE", "( value )"));
        assert_eq!(Encoding::Rgbm7.components(), ("RGBM", "( value, 7.0 )"));
        assert_eq!(Encoding::Rgbm16.components(), ("RGBM", "( value, 16.0 )"));
        assert_eq!(Encoding::Rgbd.components(), ("RGBD", "( value, 256.0 )"));
        assert_eq!(
            Encoding::Gamma.components(),
            ("Gamma", "( value, float( GAMMA_FACTOR ) )")
        );
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        assert_eq!(
            Encoding::from_tag("BC7"),
            Err(ShadeError::UnsupportedEncoding("BC7".to_string()))
        );
    }

    #[test]
    fn tag_round_trip() {
        for e in [
            Encoding::Linear,
            Encoding::Srgb,
            Encoding::Rgbe,
            Encoding::Rgbm7,
            Encoding::Rgbm16,
            Encoding::Rgbd,
            Encoding::Gamma,
        ] {
            assert_eq!(Encoding::from_tag(e.tag()).unwrap(), e);
        }
    }

    #[test]
    fn decode_synthesis() {
        assert_eq!(
            decoding_function("texel", Encoding::Srgb),
            "sRGBToLinear( texel )"
        );
        assert_eq!(
            decoding_function("texel", Encoding::Rgbm16),
            "RGBMToLinear( texel, 16.0 )"
        );
        assert_eq!(
            decoding_function("texel", Encoding::Gamma),
            "GammaToLinear( texel, float( GAMMA_FACTOR ) )"
        );
    }

    #[test]
    fn encode_synthesis() {
        assert_eq!(
            encoding_function("color", Encoding::Rgbd),
            "LinearToRGBD( color, 256.0 )"
        );
        assert_eq!(
            encoding_function("color", Encoding::Srgb),
            "LinearTosRGB( color )"
        );
    }

    #[test]
    fn linear_is_identity() {
        assert_eq!(decoding_function("texel", Encoding::Linear), "texel");
        assert_eq!(encoding_function("texel", Encoding::Linear), "texel");
    }
}
