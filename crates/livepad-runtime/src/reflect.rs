//! The introspection capability the dumper is built on.
//!
//! Rust has no runtime reflection, so dumpable values describe themselves
//! through [`Reflect`]: a value classifies itself as one of a handful of
//! shapes, and struct-likes enumerate their fields in declared order. The
//! dumper depends only on this trait, never on concrete types.

use std::borrow::Cow;

use crate::bitmap::Bitmap;

/// A value that can be dumped.
pub trait Reflect {
    /// Short type name shown to the user, e.g. `"Vec<i32>"`, not a full path.
    fn type_name(&self) -> Cow<'static, str>;

    /// Classify this value for the dumper.
    fn shape(&self) -> Shape<'_>;
}

/// The dumper-facing classification of a value.
pub enum Shape<'a> {
    /// Absent value. The dumper produces nothing for it.
    Null,
    /// A scalar, dumped as a `Primitive` leaf.
    Scalar(ScalarValue),
    /// A raw memory handle. Suppressed entirely — never dumped.
    Opaque,
    /// A homogeneous, statically-typed sequence.
    Sequence(Vec<&'a dyn Reflect>),
    /// An untyped sequence of arbitrary values. Always dumped as an
    /// object list, element types notwithstanding.
    Mixed(Vec<&'a dyn Reflect>),
    /// A struct-like value with named fields, in declared order.
    Object(Vec<FieldRead<'a>>),
    /// Raw image data, short-circuited to a JPEG node.
    Bitmap(&'a Bitmap),
}

/// A typed scalar payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
}

/// The outcome of a best-effort field read.
///
/// Plain struct fields always read successfully; the error arm exists for
/// capability implementations whose getters can genuinely fail (poisoned
/// locks, FFI-backed accessors). The dumper swallows failed reads at that
/// member only.
pub struct FieldRead<'a> {
    pub name: Cow<'a, str>,
    pub value: Result<&'a dyn Reflect, FieldError>,
}

impl<'a> FieldRead<'a> {
    pub fn ok(name: impl Into<Cow<'a, str>>, value: &'a dyn Reflect) -> Self {
        Self {
            name: name.into(),
            value: Ok(value),
        }
    }

    pub fn err(name: impl Into<Cow<'a, str>>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Err(FieldError(error.into())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("field read failed: {0}")]
pub struct FieldError(pub String);

// ── Scalar impls ─────────────────────────────────────────────────────────────

macro_rules! reflect_scalar {
    ($($ty:ty => $variant:ident as $cast:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_name(&self) -> Cow<'static, str> {
                    Cow::Borrowed(stringify!($ty))
                }
                fn shape(&self) -> Shape<'_> {
                    Shape::Scalar(ScalarValue::$variant(*self as $cast))
                }
            }
        )+
    };
}

reflect_scalar! {
    i8 => Int as i64, i16 => Int as i64, i32 => Int as i64, i64 => Int as i64,
    isize => Int as i64,
    u8 => UInt as u64, u16 => UInt as u64, u32 => UInt as u64, u64 => UInt as u64,
    usize => UInt as u64,
    f32 => Float as f64, f64 => Float as f64,
}

impl Reflect for bool {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("bool")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(ScalarValue::Bool(*self))
    }
}

impl Reflect for char {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("char")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(ScalarValue::Char(*self))
    }
}

impl Reflect for String {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("String")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(ScalarValue::Str(self.clone()))
    }
}

impl Reflect for str {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("str")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(ScalarValue::Str(self.to_string()))
    }
}

// ── Pointer-like values are suppressed ───────────────────────────────────────

impl<T> Reflect for *const T {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("pointer")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Opaque
    }
}

impl<T> Reflect for *mut T {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("pointer")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Opaque
    }
}

// ── Transparent wrappers ─────────────────────────────────────────────────────

impl<T: Reflect + ?Sized> Reflect for &T {
    fn type_name(&self) -> Cow<'static, str> {
        (**self).type_name()
    }
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }
}

impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn type_name(&self) -> Cow<'static, str> {
        (**self).type_name()
    }
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_name(&self) -> Cow<'static, str> {
        match self {
            Some(value) => value.type_name(),
            None => Cow::Borrowed("Option"),
        }
    }
    fn shape(&self) -> Shape<'_> {
        match self {
            Some(value) => value.shape(),
            None => Shape::Null,
        }
    }
}

// ── Sequences ────────────────────────────────────────────────────────────────

impl<T: Reflect> Reflect for Vec<T> {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Owned(short_type_name::<Self>())
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(self.iter().map(|v| v as &dyn Reflect).collect())
    }
}

impl<T: Reflect> Reflect for [T] {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Owned(short_type_name::<Self>())
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(self.iter().map(|v| v as &dyn Reflect).collect())
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Owned(short_type_name::<Self>())
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(self.iter().map(|v| v as &dyn Reflect).collect())
    }
}

/// The untyped-sequence analog: a bag of values whose element types are
/// unknown statically. The dumper always classifies it as an object list,
/// never by its first element.
pub struct MixedSeq(pub Vec<Box<dyn Reflect>>);

impl Reflect for MixedSeq {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("MixedSeq")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Mixed(self.0.iter().map(|v| v.as_ref() as &dyn Reflect).collect())
    }
}

/// `std::any::type_name` with every module path stripped, inside generic
/// arguments included: `alloc::vec::Vec<core::option::Option<i32>>`
/// becomes `Vec<Option<i32>>`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else if c == ':' {
            segment.clear();
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}

// ── Struct impl helper ───────────────────────────────────────────────────────

/// Implement [`Reflect`] for a struct, enumerating the listed fields in
/// declared order:
///
/// ```
/// use livepad_runtime::reflect_fields;
///
/// struct Point { x: i32, y: i32 }
/// reflect_fields!(Point { x, y });
/// ```
#[macro_export]
macro_rules! reflect_fields {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::reflect::Reflect for $ty {
            fn type_name(&self) -> std::borrow::Cow<'static, str> {
                std::borrow::Cow::Borrowed(stringify!($ty))
            }
            fn shape(&self) -> $crate::reflect::Shape<'_> {
                $crate::reflect::Shape::Object(vec![
                    $(
                        $crate::reflect::FieldRead::ok(
                            stringify!($field),
                            &self.$field as &dyn $crate::reflect::Reflect,
                        ),
                    )+
                ])
            }
        }
    };
}
