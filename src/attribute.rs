use std::fmt::{self, Display, Formatter};
use std::ops::BitOr;

use thiserror::Error as ThisError;

use crate::Element;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{} {} {} {}", self.r, self.g, self.b, self.a))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Display for Vector3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{} {} {}", self.x, self.y, self.z))
    }
}

impl From<mint::Vector3<f32>> for Vector3 {
    fn from(value: mint::Vector3<f32>) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

impl From<Vector3> for mint::Vector3<f32> {
    fn from(value: Vector3) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Display for Vector4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{} {} {} {}", self.x, self.y, self.z, self.w))
    }
}

impl From<mint::Vector4<f32>> for Vector4 {
    fn from(value: mint::Vector4<f32>) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
            w: value.w,
        }
    }
}

impl From<Vector4> for mint::Vector4<f32> {
    fn from(value: Vector4) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
            w: value.w,
        }
    }
}

/// Euler angles in Source order: pitch, yaw, roll.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Angle {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Display for Angle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{} {} {}", self.pitch, self.yaw, self.roll))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Matrix {
    pub entries: [[f32; 4]; 4],
}

impl Display for Matrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format!(
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            self.entries[0][0],
            self.entries[0][1],
            self.entries[0][2],
            self.entries[0][3],
            self.entries[1][0],
            self.entries[1][1],
            self.entries[1][2],
            self.entries[1][3],
            self.entries[2][0],
            self.entries[2][1],
            self.entries[2][2],
            self.entries[2][3],
            self.entries[3][0],
            self.entries[3][1],
            self.entries[3][2],
            self.entries[3][3]
        ))
    }
}

/// Flags carried by an attribute alongside its value.
///
/// `STANDARD` and `DONT_SAVE` attributes are never serialized.
/// `USER_DEFINED` marks free-form fields read from a file, as opposed to
/// fields that belong to an element's built-in schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttributeFlags(u8);

impl AttributeFlags {
    pub const USER_DEFINED: Self = Self(1 << 0);
    pub const STANDARD: Self = Self(1 << 1);
    pub const DONT_SAVE: Self = Self(1 << 2);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if any flag set in `other` is also set in `self`.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for AttributeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, ThisError)]
#[error("Attribute Is Not Of The Requested Type")]
pub struct AttributeError;

/// A single typed value held by an element.
///
/// Element references are held directly; a `None` reference is an attribute
/// whose target element was never created.
#[derive(Clone, Debug)]
pub enum Attribute {
    Element(Option<Element>),
    ElementArray(Vec<Element>),
    Integer(i32),
    Float(f32),
    Boolean(bool),
    String(String),
    Color(Color),
    Vector3(Vector3),
    Vector4(Vector4),
    Angle(Angle),
    Matrix(Matrix),
}

impl Attribute {
    pub fn is_array(&self) -> bool {
        matches!(self, Attribute::ElementArray(_))
    }
}

macro_rules! declare_attribute {
    ($qualifier:ty, $attribute:path) => {
        impl From<$qualifier> for Attribute {
            fn from(value: $qualifier) -> Self {
                $attribute(value)
            }
        }

        impl TryFrom<Attribute> for $qualifier {
            type Error = AttributeError;

            fn try_from(value: Attribute) -> Result<Self, Self::Error> {
                match value {
                    $attribute(value) => Ok(value),
                    _ => Err(AttributeError),
                }
            }
        }

        impl<'a> TryFrom<&'a Attribute> for &'a $qualifier {
            type Error = AttributeError;

            fn try_from(value: &'a Attribute) -> Result<Self, Self::Error> {
                match value {
                    $attribute(value) => Ok(value),
                    _ => Err(AttributeError),
                }
            }
        }
    };
}

declare_attribute!(Option<Element>, Attribute::Element);
declare_attribute!(Vec<Element>, Attribute::ElementArray);
declare_attribute!(i32, Attribute::Integer);
declare_attribute!(f32, Attribute::Float);
declare_attribute!(bool, Attribute::Boolean);
declare_attribute!(String, Attribute::String);
declare_attribute!(Color, Attribute::Color);
declare_attribute!(Vector3, Attribute::Vector3);
declare_attribute!(Vector4, Attribute::Vector4);
declare_attribute!(Angle, Attribute::Angle);
declare_attribute!(Matrix, Attribute::Matrix);
