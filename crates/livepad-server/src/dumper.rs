//! The object dumper — turns a live value into a depth-bounded,
//! item-capped [`DumpValue`] tree.
//!
//! Cycle safety comes from the depth bound alone: there is no visited-set,
//! and adding one would change the output shape clients already rely on.
//! Sequences are classified by their first successfully-dumped element,
//! and elements past the item cap are silently discarded. Both behaviors
//! are part of the wire contract.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use livepad_core::dump::{DumpType, DumpValue, FieldMap};
use livepad_runtime::bitmap::Bitmap;
use livepad_runtime::reflect::{FieldRead, Reflect, ScalarValue, Shape};

const JPEG_QUALITY: u8 = 60;

/// Dump a value. `None` means the value produced nothing (null, a
/// suppressed pointer, or an object whose every member came up empty) —
/// callers treat absence as the uniform empty signal.
pub fn dump_value(value: &dyn Reflect, max_depth: usize, max_items: usize) -> Option<DumpValue> {
    dump_recursive(value, max_depth, 0, max_items)
}

fn dump_recursive(
    value: &dyn Reflect,
    max_depth: usize,
    depth: usize,
    max_items: usize,
) -> Option<DumpValue> {
    let type_name = value.type_name();
    match value.shape() {
        // Images short-circuit everything, including the depth bound.
        Shape::Bitmap(bitmap) => encode_image(bitmap),
        Shape::Null => None,
        // Raw memory handles are suppressed outright.
        Shape::Opaque => None,
        // Scalars survive any depth.
        Shape::Scalar(scalar) => Some(DumpValue::primitive(&type_name, scalar_to_json(&scalar))),
        Shape::Sequence(items) => {
            if depth > max_depth {
                return Some(DumpValue::beyond_depth_limit(&type_name));
            }
            dump_sequence(&type_name, items, max_depth, depth, max_items)
        }
        Shape::Mixed(items) => {
            if depth > max_depth {
                return Some(DumpValue::beyond_depth_limit(&type_name));
            }
            // Element types are unknown, so this is always an object list.
            let children = items
                .into_iter()
                .take(max_items)
                .filter_map(|item| dump_recursive(item, max_depth, depth + 1, max_items))
                .collect();
            Some(DumpValue::complex_sequence(&type_name, children))
        }
        Shape::Object(fields) => {
            if depth > max_depth {
                return Some(DumpValue::beyond_depth_limit(&type_name));
            }
            dump_object(&type_name, fields, max_depth, depth, max_items)
        }
    }
}

/// Homogeneous sequence: cap, dump, drop empties, then classify the whole
/// list by the first surviving child. A mixed list therefore takes on the
/// first element's classification — preserved for wire compatibility.
fn dump_sequence(
    type_name: &str,
    items: Vec<&dyn Reflect>,
    max_depth: usize,
    depth: usize,
    max_items: usize,
) -> Option<DumpValue> {
    let children: Vec<DumpValue> = items
        .into_iter()
        .take(max_items)
        .filter_map(|item| dump_recursive(item, max_depth, depth + 1, max_items))
        .collect();

    let first = children.first()?;
    if first.dump_type == DumpType::Primitive {
        let values = children
            .into_iter()
            .map(|c| c.primitive_value.unwrap_or(serde_json::Value::Null))
            .collect();
        Some(DumpValue::primitive_sequence(type_name, values))
    } else {
        Some(DumpValue::complex_sequence(type_name, children))
    }
}

/// Struct-like: best-effort read every field in declared order. A failed
/// read loses that member only; a member whose own dump is empty is
/// omitted; an object with no surviving members vanishes entirely.
fn dump_object(
    type_name: &str,
    fields: Vec<FieldRead<'_>>,
    max_depth: usize,
    depth: usize,
    max_items: usize,
) -> Option<DumpValue> {
    let mut map = FieldMap::new();
    for field in fields {
        let child = match field.value {
            Ok(child) => child,
            Err(error) => {
                tracing::trace!(field = %field.name, %error, "field read failed, omitting");
                continue;
            }
        };
        if let Some(node) = dump_recursive(child, max_depth, depth + 1, max_items) {
            map.insert(field.name.as_ref(), node);
        }
    }
    if map.is_empty() {
        None
    } else {
        Some(DumpValue::complex(type_name, map))
    }
}

fn scalar_to_json(scalar: &ScalarValue) -> serde_json::Value {
    match scalar {
        ScalarValue::Bool(v) => serde_json::Value::Bool(*v),
        ScalarValue::Int(v) => serde_json::Value::Number((*v).into()),
        ScalarValue::UInt(v) => serde_json::Value::Number((*v).into()),
        ScalarValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ScalarValue::Char(v) => serde_json::Value::String(v.to_string()),
        ScalarValue::Str(v) => serde_json::Value::String(v.clone()),
    }
}

fn encode_image(bitmap: &Bitmap) -> Option<DumpValue> {
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    if let Err(error) = encoder.write_image(
        bitmap.pixels(),
        bitmap.width(),
        bitmap.height(),
        ExtendedColorType::Rgb8,
    ) {
        tracing::warn!(%error, "JPEG encoding failed, omitting image");
        return None;
    }
    Some(DumpValue::image(BASE64.encode(&jpeg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepad_runtime::reflect_fields;
    use serde_json::json;
    use std::borrow::Cow;

    struct Sample {
        a: i32,
        b: String,
    }
    reflect_fields!(Sample { a, b });

    #[test]
    fn flat_struct_dumps_field_by_field() {
        let sample = Sample {
            a: 5,
            b: "x".into(),
        };
        let node = dump_value(&sample, 2, 1000).unwrap();
        assert_eq!(node.dump_type, DumpType::Complex);
        let fields = node.complex_value.unwrap();
        assert_eq!(fields.get("a").unwrap().primitive_value, Some(json!(5)));
        assert_eq!(fields.get("b").unwrap().primitive_value, Some(json!("x")));
    }

    #[test]
    fn long_sequences_are_capped_without_a_marker() {
        let values = vec![1i64, 2, 3, 4, 5];
        let node = dump_value(&values, 2, 3).unwrap();
        assert_eq!(node.dump_type, DumpType::PrimitiveSequence);
        assert_eq!(
            node.primitive_enumerable.unwrap(),
            vec![json!(1), json!(2), json!(3)]
        );
    }

    #[test]
    fn null_produces_nothing() {
        assert!(dump_value(&None::<i32>, 2, 1000).is_none());
    }

    #[test]
    fn pointers_are_suppressed() {
        let value = 9i32;
        let ptr = &value as *const i32;
        assert!(dump_value(&ptr, 2, 1000).is_none());
    }

    #[test]
    fn scalars_survive_beyond_the_depth_bound() {
        struct Deep {
            inner: Option<Box<Deep>>,
            leaf: i32,
        }
        reflect_fields!(Deep { inner, leaf });

        let graph = Deep {
            leaf: 1,
            inner: Some(Box::new(Deep {
                leaf: 2,
                inner: Some(Box::new(Deep {
                    leaf: 3,
                    inner: None,
                })),
            })),
        };
        // Depth 1: the level-2 object is beyond the bound, but its sibling
        // scalar at the same level still prints.
        let node = dump_value(&graph, 1, 1000).unwrap();
        let fields = node.complex_value.unwrap();
        assert_eq!(fields.get("leaf").unwrap().dump_type, DumpType::Primitive);
        let inner = fields.get("inner").unwrap();
        let inner_fields = inner.complex_value.as_ref().unwrap();
        assert_eq!(
            inner_fields.get("inner").unwrap().dump_type,
            DumpType::BeyondDepthLimit
        );
        assert_eq!(
            inner_fields.get("leaf").unwrap().dump_type,
            DumpType::Primitive
        );
    }

    /// A value whose shape refers back to itself: the tightest possible
    /// cycle. Termination must come from the depth bound alone.
    struct SelfCycle {
        id: u32,
    }

    impl Reflect for SelfCycle {
        fn type_name(&self) -> Cow<'static, str> {
            Cow::Borrowed("SelfCycle")
        }
        fn shape(&self) -> Shape<'_> {
            Shape::Object(vec![
                FieldRead::ok("id", &self.id),
                FieldRead::ok("me", self),
            ])
        }
    }

    #[test]
    fn cyclic_graph_terminates_at_the_depth_bound() {
        let value = SelfCycle { id: 7 };
        let node = dump_value(&value, 3, 1000).unwrap();

        // Walk down the "me" chain; it must end in a sentinel within the bound.
        let mut current = &node;
        let mut levels = 0;
        loop {
            match current.dump_type {
                DumpType::BeyondDepthLimit => break,
                DumpType::Complex => {
                    levels += 1;
                    assert!(levels <= 4, "depth bound failed to terminate the cycle");
                    current = current.complex_value.as_ref().unwrap().get("me").unwrap();
                }
                other => panic!("unexpected node type {other:?}"),
            }
        }
    }

    #[test]
    fn empty_object_vanishes_not_empties() {
        struct AllFailing;
        impl Reflect for AllFailing {
            fn type_name(&self) -> Cow<'static, str> {
                Cow::Borrowed("AllFailing")
            }
            fn shape(&self) -> Shape<'_> {
                Shape::Object(vec![
                    FieldRead::err("broken", "backing store gone"),
                    FieldRead::err("also_broken", "backing store gone"),
                ])
            }
        }
        assert!(dump_value(&AllFailing, 2, 1000).is_none());

        struct AllNull {
            a: Option<i32>,
            b: Option<i32>,
        }
        reflect_fields!(AllNull { a, b });
        assert!(dump_value(&AllNull { a: None, b: None }, 2, 1000).is_none());
    }

    #[test]
    fn failed_field_reads_lose_only_that_member() {
        struct Partial {
            good: i32,
        }
        impl Reflect for Partial {
            fn type_name(&self) -> Cow<'static, str> {
                Cow::Borrowed("Partial")
            }
            fn shape(&self) -> Shape<'_> {
                Shape::Object(vec![
                    FieldRead::ok("good", &self.good),
                    FieldRead::err("bad", "unreadable"),
                ])
            }
        }
        let node = dump_value(&Partial { good: 3 }, 2, 1000).unwrap();
        let fields = node.complex_value.unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields.get("good").is_some());
        assert!(fields.get("bad").is_none());
    }

    #[test]
    fn sequence_of_objects_is_complex() {
        let items = vec![
            Sample { a: 1, b: "one".into() },
            Sample { a: 2, b: "two".into() },
        ];
        let node = dump_value(&items, 3, 1000).unwrap();
        assert_eq!(node.dump_type, DumpType::ComplexSequence);
        assert_eq!(node.complex_enumerable.unwrap().len(), 2);
    }

    #[test]
    fn empty_sequence_produces_nothing() {
        let values: Vec<i32> = Vec::new();
        assert!(dump_value(&values, 2, 1000).is_none());
    }

    #[test]
    fn mixed_untyped_sequence_is_always_complex() {
        use livepad_runtime::reflect::MixedSeq;
        let values = MixedSeq(vec![
            Box::new(1i32),
            Box::new(Sample { a: 2, b: "x".into() }),
        ]);
        let node = dump_value(&values, 3, 1000).unwrap();
        // First element is a scalar, but an untyped list never takes on
        // the primitive classification.
        assert_eq!(node.dump_type, DumpType::ComplexSequence);
        assert_eq!(node.complex_enumerable.unwrap().len(), 2);
    }

    #[test]
    fn bitmap_becomes_an_image_node_even_past_depth() {
        struct Nested {
            icon: Bitmap,
        }
        reflect_fields!(Nested { icon });

        let nested = Nested {
            icon: Bitmap::solid(2, 2, [0, 128, 255]).unwrap(),
        };
        // Depth 0: any composite child would be beyond the bound, but the
        // image check runs first.
        let node = dump_value(&nested, 0, 1000).unwrap();
        let fields = node.complex_value.unwrap();
        let icon = fields.get("icon").unwrap();
        assert_eq!(icon.dump_type, DumpType::Image);
        let encoded = icon.primitive_value.as_ref().unwrap().as_str().unwrap();
        let jpeg = BASE64.decode(encoded).unwrap();
        // JPEG magic.
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn repeat_dumps_are_structurally_identical() {
        let sample = Sample { a: 1, b: "same".into() };
        let first = dump_value(&sample, 3, 10);
        let second = dump_value(&sample, 3, 10);
        assert_eq!(first, second);
    }
}
