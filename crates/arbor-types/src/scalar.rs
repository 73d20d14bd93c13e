//! Math and curve value types that have no public field layout.
//!
//! These are persisted through scalar codecs rather than generic field
//! walking. In memory they travel as [`Scalar`] inside a [`Value`].
//!
//! [`Value`]: crate::Value

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

/// Linear RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// How a curve is evaluated outside its key range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    #[default]
    Clamp,
    Loop,
    PingPong,
}

impl WrapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clamp => "Clamp",
            Self::Loop => "Loop",
            Self::PingPong => "PingPong",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Clamp" => Some(Self::Clamp),
            "Loop" => Some(Self::Loop),
            "PingPong" => Some(Self::PingPong),
            _ => None,
        }
    }
}

impl fmt::Display for WrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    pub in_tangent: f32,
    pub out_tangent: f32,
}

/// Keyframed animation curve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curve {
    pub keys: Vec<Keyframe>,
    pub pre_wrap: WrapMode,
    pub post_wrap: WrapMode,
}

/// A codec-backed value carried inside [`Value::Scalar`].
///
/// [`Value::Scalar`]: crate::Value::Scalar
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Quat(Quat),
    Color(Color),
    Rect(Rect),
    Curve(Curve),
}

impl Scalar {
    /// Short kind label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Quat(_) => "quat",
            Self::Color(_) => "color",
            Self::Rect(_) => "rect",
            Self::Curve(_) => "curve",
        }
    }
}
