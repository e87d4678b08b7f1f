//! Colour-specification parsing.
//!
//! Fill requests carry the colour as a CSS-style string (`#rgb`, `#rrggbb`,
//! `rgb(r,g,b)`, `rgba(r,g,b,a)`).  Parsing happens synchronously at request
//! submission so that a malformed spec is reported before any computation
//! starts.  The alpha component of `rgba()` is accepted and discarded — fill
//! opacity is applied separately by the engine.

use image::Rgba;

/// A fill colour.  Alpha is not part of the colour; the engine decides the
/// alpha it writes (255, or a forced region id during segmentation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Malformed colour specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not one of the recognised syntaxes.
    UnrecognisedSyntax(String),
    /// A numeric component that is neither blank nor a number.
    BadComponent(String),
    /// Hex form with a bad length or non-hex digit.
    BadHex(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnrecognisedSyntax(s) => write!(f, "unrecognised colour syntax: {:?}", s),
            ParseError::BadComponent(s) => write!(f, "non-numeric colour component: {:?}", s),
            ParseError::BadHex(s) => write!(f, "invalid hex colour: {:?}", s),
        }
    }
}

impl std::error::Error for ParseError {}

impl Colour {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a colour specification.
    ///
    /// Numeric tokens are parsed permissively: blank/whitespace-only
    /// components resolve to 0, fractional values are clamped to 0..=255 and
    /// rounded, non-numeric components fail.
    pub fn parse(spec: &str) -> Result<Colour, ParseError> {
        if let Some(rest) = spec.strip_prefix("rgba(") {
            Self::parse_components(spec, rest)
        } else if let Some(rest) = spec.strip_prefix("rgb(") {
            Self::parse_components(spec, rest)
        } else if spec.starts_with('#') {
            Self::parse_hex(spec)
        } else {
            Err(ParseError::UnrecognisedSyntax(spec.to_string()))
        }
    }

    /// The colour as an RGBA pixel with the given alpha.
    pub fn with_alpha(self, a: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, a])
    }

    /// Comma-separated components up to the closing paren (a missing paren
    /// just means the components run to the end of the string).
    fn parse_components(spec: &str, rest: &str) -> Result<Colour, ParseError> {
        let inner = rest.split(')').next().unwrap_or(rest);
        let mut channels = [0u8; 3];
        let mut count = 0;
        // rgba() carries a 4th token; everything past the 3rd is ignored
        for token in inner.split(',').take(3) {
            channels[count] = component_value(token)?;
            count += 1;
        }
        if count < 3 {
            return Err(ParseError::UnrecognisedSyntax(spec.to_string()));
        }
        Ok(Colour::new(channels[0], channels[1], channels[2]))
    }

    fn parse_hex(spec: &str) -> Result<Colour, ParseError> {
        let digits = &spec[1..];
        match digits.len() {
            6 => {
                let val = u32::from_str_radix(digits, 16)
                    .map_err(|_| ParseError::BadHex(spec.to_string()))?;
                Ok(Colour::new(
                    (val >> 16) as u8,
                    (val >> 8) as u8,
                    val as u8,
                ))
            }
            3 => {
                let val = u32::from_str_radix(digits, 16)
                    .map_err(|_| ParseError::BadHex(spec.to_string()))?;
                // Shorthand digit d expands to 0x11 * d
                Ok(Colour::new(
                    0x11 * ((val >> 8) & 0xf) as u8,
                    0x11 * ((val >> 4) & 0xf) as u8,
                    0x11 * (val & 0xf) as u8,
                ))
            }
            _ => Err(ParseError::BadHex(spec.to_string())),
        }
    }
}

/// Permissive numeric token: blank resolves to 0, anything else must parse
/// as a float and is clamped into the channel range.
fn component_value(token: &str) -> Result<u8, ParseError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<f32>()
        .map(|v| v.clamp(0.0, 255.0).round() as u8)
        .map_err(|_| ParseError::BadComponent(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms_agree() {
        let white = Colour::new(255, 255, 255);
        assert_eq!(Colour::parse("#fff").unwrap(), white);
        assert_eq!(Colour::parse("#ffffff").unwrap(), white);
        assert_eq!(Colour::parse("rgb(255,255,255)").unwrap(), white);
        assert_eq!(Colour::parse("#FA3").unwrap(), Colour::new(0xff, 0xaa, 0x33));
    }

    #[test]
    fn rgba_alpha_is_ignored() {
        assert_eq!(Colour::parse("rgba(0,0,0,1)").unwrap(), Colour::new(0, 0, 0));
        assert_eq!(
            Colour::parse("rgba(10, 20, 30, 0.5)").unwrap(),
            Colour::new(10, 20, 30)
        );
    }

    #[test]
    fn blank_components_resolve_to_zero() {
        assert_eq!(Colour::parse("rgb( , 128, )").unwrap(), Colour::new(0, 128, 0));
    }

    #[test]
    fn bad_inputs_fail() {
        assert!(matches!(
            Colour::parse("rgb(1,2,x)"),
            Err(ParseError::BadComponent(_))
        ));
        assert!(matches!(Colour::parse("#12fx34"), Err(ParseError::BadHex(_))));
        assert!(matches!(Colour::parse("#ffff"), Err(ParseError::BadHex(_))));
        assert!(matches!(
            Colour::parse("hotpink"),
            Err(ParseError::UnrecognisedSyntax(_))
        ));
        assert!(matches!(
            Colour::parse("rgb(1,2)"),
            Err(ParseError::UnrecognisedSyntax(_))
        ));
    }

    #[test]
    fn fractional_values_round_and_clamp() {
        assert_eq!(
            Colour::parse("rgb(12.6, 300, -5)").unwrap(),
            Colour::new(13, 255, 0)
        );
    }
}
