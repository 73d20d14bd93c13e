//! Built-in codecs for the math and curve value types.
//!
//! Vectors, quaternions and colors persist as flat float arrays
//! (`[x, y, z]`, `[r, g, b, a]`); rectangles and curves as small objects.

use std::sync::Arc;

use arbor_stream::{TokenReader, TokenWriter};
use arbor_types::{
    Color, Curve, Keyframe, Quat, Rect, Scalar, TypeName, Value, Vec2, Vec3, Vec4, WrapMode,
};

use crate::codec::{CodecRegistry, ScalarCodec};
use crate::error::{SchemaError, SchemaResult};

pub const VECTOR2: &str = "Vector2";
pub const VECTOR3: &str = "Vector3";
pub const VECTOR4: &str = "Vector4";
pub const QUATERNION: &str = "Quaternion";
pub const COLOR: &str = "Color";
pub const RECT: &str = "Rect";
pub const ANIMATION_CURVE: &str = "AnimationCurve";

pub(crate) fn register_all(registry: &mut CodecRegistry) {
    for packed in [
        Packed::Vec2,
        Packed::Vec3,
        Packed::Vec4,
        Packed::Quat,
        Packed::Color,
    ] {
        registry.register(TypeName::from_static(packed.name()), Arc::new(PackedCodec(packed)));
    }
    registry.register(TypeName::from_static(RECT), Arc::new(RectCodec));
    registry.register(TypeName::from_static(ANIMATION_CURVE), Arc::new(CurveCodec));
}

fn mismatch(codec: &str, value: &Value) -> SchemaError {
    SchemaError::CodecMismatch {
        codec: codec.to_string(),
        found: value.describe(),
    }
}

#[derive(Clone, Copy, Debug)]
enum Packed {
    Vec2,
    Vec3,
    Vec4,
    Quat,
    Color,
}

impl Packed {
    fn name(self) -> &'static str {
        match self {
            Self::Vec2 => VECTOR2,
            Self::Vec3 => VECTOR3,
            Self::Vec4 => VECTOR4,
            Self::Quat => QUATERNION,
            Self::Color => COLOR,
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Quat | Self::Color => 4,
        }
    }

    fn unpack(self, value: &Value) -> Option<Vec<f32>> {
        let Value::Scalar(scalar) = value else {
            return None;
        };
        match (self, scalar) {
            (Self::Vec2, Scalar::Vec2(v)) => Some(vec![v.x, v.y]),
            (Self::Vec3, Scalar::Vec3(v)) => Some(vec![v.x, v.y, v.z]),
            (Self::Vec4, Scalar::Vec4(v)) => Some(vec![v.x, v.y, v.z, v.w]),
            (Self::Quat, Scalar::Quat(q)) => Some(vec![q.x, q.y, q.z, q.w]),
            (Self::Color, Scalar::Color(c)) => Some(vec![c.r, c.g, c.b, c.a]),
            _ => None,
        }
    }

    /// `c` always holds exactly `arity()` components.
    fn pack(self, c: &[f32]) -> Scalar {
        match self {
            Self::Vec2 => Scalar::Vec2(Vec2 { x: c[0], y: c[1] }),
            Self::Vec3 => Scalar::Vec3(Vec3 {
                x: c[0],
                y: c[1],
                z: c[2],
            }),
            Self::Vec4 => Scalar::Vec4(Vec4 {
                x: c[0],
                y: c[1],
                z: c[2],
                w: c[3],
            }),
            Self::Quat => Scalar::Quat(Quat {
                x: c[0],
                y: c[1],
                z: c[2],
                w: c[3],
            }),
            Self::Color => Scalar::Color(Color {
                r: c[0],
                g: c[1],
                b: c[2],
                a: c[3],
            }),
        }
    }

    fn default_scalar(self) -> Scalar {
        match self {
            Self::Vec2 => Scalar::Vec2(Vec2::default()),
            Self::Vec3 => Scalar::Vec3(Vec3::default()),
            Self::Vec4 => Scalar::Vec4(Vec4::default()),
            Self::Quat => Scalar::Quat(Quat::default()),
            Self::Color => Scalar::Color(Color::default()),
        }
    }
}

struct PackedCodec(Packed);

impl ScalarCodec for PackedCodec {
    fn write(&self, writer: &mut dyn TokenWriter, value: &Value) -> SchemaResult<()> {
        let components = self
            .0
            .unpack(value)
            .ok_or_else(|| mismatch(self.0.name(), value))?;
        writer.write_start_array()?;
        for c in components {
            writer.write_f64(f64::from(c))?;
        }
        writer.write_end_array()?;
        Ok(())
    }

    fn read(&self, reader: &mut dyn TokenReader) -> SchemaResult<Value> {
        reader.ensure_start_array()?;
        let mut components = Vec::with_capacity(self.0.arity());
        while !reader.at_end_array()? {
            components.push(reader.read_f64()? as f32);
        }
        if components.len() != self.0.arity() {
            return Err(reader
                .invalid(format!(
                    "{} expects {} components, found {}",
                    self.0.name(),
                    self.0.arity(),
                    components.len()
                ))
                .into());
        }
        reader.ensure_end_array()?;
        Ok(Value::Scalar(self.0.pack(&components)))
    }

    fn default_value(&self) -> Value {
        Value::Scalar(self.0.default_scalar())
    }
}

struct RectCodec;

impl ScalarCodec for RectCodec {
    fn write(&self, writer: &mut dyn TokenWriter, value: &Value) -> SchemaResult<()> {
        let Value::Scalar(Scalar::Rect(rect)) = value else {
            return Err(mismatch(RECT, value));
        };
        writer.write_start_object()?;
        for (name, v) in [
            ("x", rect.x),
            ("y", rect.y),
            ("width", rect.width),
            ("height", rect.height),
        ] {
            writer.write_property_name(name)?;
            writer.write_f64(f64::from(v))?;
        }
        writer.write_end_object()?;
        Ok(())
    }

    fn read(&self, reader: &mut dyn TokenReader) -> SchemaResult<Value> {
        reader.ensure_start_object()?;
        let mut rect = Rect::default();
        while !reader.at_end_object()? {
            let name = reader.read_property_name()?;
            let slot = match name.as_str() {
                "x" => &mut rect.x,
                "y" => &mut rect.y,
                "width" => &mut rect.width,
                "height" => &mut rect.height,
                _ => {
                    reader.skip_value()?;
                    continue;
                }
            };
            *slot = reader.read_f64()? as f32;
        }
        reader.ensure_end_object()?;
        Ok(Value::Scalar(Scalar::Rect(rect)))
    }

    fn default_value(&self) -> Value {
        Value::Scalar(Scalar::Rect(Rect::default()))
    }
}

/// `{ "keys": [[time, value, inTangent, outTangent], ...],
///    "preWrap": "Clamp", "postWrap": "Loop" }`
struct CurveCodec;

impl CurveCodec {
    fn read_wrap(reader: &mut dyn TokenReader) -> SchemaResult<WrapMode> {
        let text = reader.read_string()?;
        WrapMode::parse(&text)
            .ok_or_else(|| reader.invalid(format!("unknown wrap mode `{text}`")).into())
    }

    fn read_key(reader: &mut dyn TokenReader) -> SchemaResult<Keyframe> {
        reader.ensure_start_array()?;
        let key = Keyframe {
            time: reader.read_f64()? as f32,
            value: reader.read_f64()? as f32,
            in_tangent: reader.read_f64()? as f32,
            out_tangent: reader.read_f64()? as f32,
        };
        reader.ensure_end_array()?;
        Ok(key)
    }
}

impl ScalarCodec for CurveCodec {
    fn write(&self, writer: &mut dyn TokenWriter, value: &Value) -> SchemaResult<()> {
        let Value::Scalar(Scalar::Curve(curve)) = value else {
            return Err(mismatch(ANIMATION_CURVE, value));
        };
        writer.write_start_object()?;
        writer.write_property_name("keys")?;
        writer.write_start_array()?;
        for key in &curve.keys {
            writer.write_start_array()?;
            for v in [key.time, key.value, key.in_tangent, key.out_tangent] {
                writer.write_f64(f64::from(v))?;
            }
            writer.write_end_array()?;
        }
        writer.write_end_array()?;
        writer.write_property_name("preWrap")?;
        writer.write_str(curve.pre_wrap.as_str())?;
        writer.write_property_name("postWrap")?;
        writer.write_str(curve.post_wrap.as_str())?;
        writer.write_end_object()?;
        Ok(())
    }

    fn read(&self, reader: &mut dyn TokenReader) -> SchemaResult<Value> {
        reader.ensure_start_object()?;
        let mut curve = Curve::default();
        while !reader.at_end_object()? {
            match reader.read_property_name()?.as_str() {
                "keys" => {
                    reader.ensure_start_array()?;
                    while !reader.at_end_array()? {
                        curve.keys.push(Self::read_key(reader)?);
                    }
                    reader.ensure_end_array()?;
                }
                "preWrap" => curve.pre_wrap = Self::read_wrap(reader)?,
                "postWrap" => curve.post_wrap = Self::read_wrap(reader)?,
                _ => reader.skip_value()?,
            }
        }
        reader.ensure_end_object()?;
        Ok(Value::Scalar(Scalar::Curve(curve)))
    }

    fn default_value(&self) -> Value {
        Value::Scalar(Scalar::Curve(Curve::default()))
    }
}
