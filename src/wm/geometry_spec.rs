//! Geometry Specifier Module
//!
//! Parser and serializer for `[=][WxH][{+|-}X{+|-}Y]` geometry strings.
//! Size and position are independent: a string carrying only one of them
//! leaves the other untouched when applied to a record.

use std::fmt;
use std::str::FromStr;

use crate::shared::Size;
use crate::wm::error::WmError;

/// Position with per-axis edge selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedPosition {
    pub x: i32,
    pub y: i32,
    /// `x` is the distance from the right screen edge to the frame's right edge
    pub x_negative: bool,
    /// `y` is the distance from the bottom screen edge to the frame's bottom edge
    pub y_negative: bool,
}

/// Parsed geometry string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometrySpec {
    pub size: Option<Size>,
    pub position: Option<SignedPosition>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_digit(&self) -> bool {
        self.peek().is_some_and(|c| c.is_ascii_digit())
    }

    /// Unsigned decimal; at least one digit required
    fn unsigned(&mut self) -> Option<i32> {
        let start = self.pos;
        while self.at_digit() {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Decimal with an optional leading minus (`+-5` places x at -5)
    fn signed(&mut self) -> Option<i32> {
        let negative = self.eat(b'-');
        let value = self.unsigned()?;
        Some(if negative { -value } else { value })
    }

    /// Edge selector: `+` near edge, `-` far edge
    fn sign(&mut self) -> Option<bool> {
        if self.eat(b'+') {
            Some(false)
        } else if self.eat(b'-') {
            Some(true)
        } else {
            None
        }
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

impl GeometrySpec {
    /// Parse a geometry string. The empty string is not accepted here; callers
    /// treat it as "forget the requested size".
    pub fn parse(input: &str) -> Result<Self, WmError> {
        let bad = || WmError::BadGeometry(input.to_string());
        let mut cur = Cursor {
            bytes: input.as_bytes(),
            pos: 0,
        };
        cur.eat(b'=');

        let mut spec = GeometrySpec::default();
        if cur.at_digit() {
            let width = cur.unsigned().ok_or_else(bad)?;
            if !cur.eat(b'x') {
                return Err(bad());
            }
            let height = cur.unsigned().ok_or_else(bad)?;
            spec.size = Some(Size::new(width, height));
        }

        if !cur.done() {
            let x_negative = cur.sign().ok_or_else(bad)?;
            let x = cur.signed().ok_or_else(bad)?;
            let y_negative = cur.sign().ok_or_else(bad)?;
            let y = cur.signed().ok_or_else(bad)?;
            if !cur.done() {
                return Err(bad());
            }
            spec.position = Some(SignedPosition {
                x,
                y,
                x_negative,
                y_negative,
            });
        }

        Ok(spec)
    }
}

impl FromStr for GeometrySpec {
    type Err = WmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GeometrySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(size) = self.size {
            write!(f, "{}x{}", size.width, size.height)?;
        }
        if let Some(pos) = self.position {
            write!(
                f,
                "{}{}{}{}",
                if pos.x_negative { '-' } else { '+' },
                pos.x,
                if pos.y_negative { '-' } else { '+' },
                pos.y
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_spec() {
        let spec = GeometrySpec::parse("300x200+10+20").unwrap();
        assert_eq!(spec.size, Some(Size::new(300, 200)));
        let pos = spec.position.unwrap();
        assert_eq!((pos.x, pos.y), (10, 20));
        assert!(!pos.x_negative && !pos.y_negative);
    }

    #[test]
    fn test_far_edges_and_signed_offsets() {
        let spec = GeometrySpec::parse("=80x24-0-15").unwrap();
        let pos = spec.position.unwrap();
        assert!(pos.x_negative && pos.y_negative);
        assert_eq!((pos.x, pos.y), (0, 15));

        let spec = GeometrySpec::parse("+-5+-7").unwrap();
        assert_eq!(spec.size, None);
        let pos = spec.position.unwrap();
        assert_eq!((pos.x, pos.y), (-5, -7));
        assert!(!pos.x_negative);
    }

    #[test]
    fn test_size_only_and_position_only() {
        let spec = GeometrySpec::parse("640x480").unwrap();
        assert!(spec.position.is_none());
        let spec = GeometrySpec::parse("-10+10").unwrap();
        assert!(spec.size.is_none());
        assert!(spec.position.unwrap().x_negative);
    }

    #[test]
    fn test_malformed_strings_rejected() {
        for bad in ["10x", "x10", "10", "10x10+", "10x10+5", "+5+", "10x10+5+5junk", "10y10", "+a+b", "abc"] {
            assert_eq!(
                GeometrySpec::parse(bad),
                Err(WmError::BadGeometry(bad.to_string())),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_display_reproduces_fields() {
        for text in ["300x200+10+10", "300x200-10-10", "1x1+0-3", "7x9-4+2"] {
            let spec = GeometrySpec::parse(text).unwrap();
            assert_eq!(spec.to_string(), text);
            assert_eq!(GeometrySpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }
}
