//! Standard transforms between the scalar types a workflow commonly carries.
//!
//! Covers `i64`, `f64`, `bool` and `String`, cataloged under the names
//! workflow definitions tend to use (`Integer`, `Float`, `Double`, `Boolean`,
//! `String`, plus lowercase spellings).

use crate::transform_registry::{BoxError, Transform, TransformProvider};
use crate::types::TypeKey;
use crate::wire::JsonCodec;

/// Provider for the standard scalar transforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTransforms;

impl TransformProvider for StandardTransforms {
    fn transforms(&self) -> Vec<Transform> {
        vec![
            // Formatting
            Transform::new(|n: i64| n.to_string()),
            Transform::new(|x: f64| x.to_string()),
            Transform::new(|b: bool| b.to_string()),
            // Parsing
            Transform::fallible(|s: String| s.trim().parse::<i64>()),
            Transform::fallible(parse_float),
            Transform::fallible(parse_bool),
            // Numeric
            Transform::new(|n: i64| n as f64),
        ]
    }

    fn aliases(&self) -> Vec<(&'static str, TypeKey)> {
        let integer = TypeKey::of::<i64>();
        let float = TypeKey::of::<f64>();
        let boolean = TypeKey::of::<bool>();
        let string = TypeKey::of::<String>();

        // Last alias for a type becomes its display name.
        vec![
            ("int", integer),
            ("integer", integer),
            ("Integer", integer),
            ("double", float),
            ("float", float),
            ("Double", float),
            ("Float", float),
            ("boolean", boolean),
            ("Boolean", boolean),
            ("string", string),
            ("String", string),
        ]
    }
}

fn parse_bool(s: String) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("not a boolean: {:?}", other).into()),
    }
}

fn parse_float(s: String) -> Result<f64, BoxError> {
    let x: f64 = s.trim().parse()?;
    if x.is_finite() {
        Ok(x)
    } else {
        Err(format!("not a finite number: {:?}", s.trim()).into())
    }
}

/// JSON codec covering every type [`StandardTransforms`] works with.
pub fn standard_codec() -> JsonCodec {
    let mut codec = JsonCodec::new();
    codec.register::<i64>();
    codec.register::<f64>();
    codec.register::<bool>();
    codec.register::<String>();
    codec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform_registry::{TransformError, TransformRegistry};
    use crate::types::DynValue;

    fn registry() -> TransformRegistry {
        let registry = TransformRegistry::new();
        registry.install(&StandardTransforms);
        registry
    }

    #[test]
    fn test_integer_to_string() {
        let out = registry()
            .execute_named(DynValue::new(42i64), "String")
            .unwrap();
        assert_eq!(out.downcast::<String>().unwrap(), "42");
    }

    #[test]
    fn test_parse_transforms() {
        let registry = registry();

        assert_eq!(registry.convert::<String, i64>(" 17 ".to_string()).unwrap(), 17);
        assert_eq!(registry.convert::<String, f64>("2.5".to_string()).unwrap(), 2.5);
        assert!(registry.convert::<String, bool>("TRUE".to_string()).unwrap());
        assert!(matches!(
            registry.convert::<String, bool>("yes".to_string()),
            Err(TransformError::Invocation { .. })
        ));
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        let registry = registry();

        for text in ["NaN", "inf", "-infinity", "1e400"] {
            assert!(
                matches!(
                    registry.convert::<String, f64>(text.to_string()),
                    Err(TransformError::Invocation { .. })
                ),
                "{} parsed",
                text
            );
        }
        assert_eq!(registry.convert::<String, f64>("1e300".to_string()).unwrap(), 1e300);
    }

    #[test]
    fn test_widening_is_one_way() {
        let registry = registry();

        assert_eq!(registry.convert::<i64, f64>(3).unwrap(), 3.0);
        assert!(matches!(
            registry.convert::<f64, i64>(3.0),
            Err(TransformError::NoTransform { .. })
        ));
        assert!(matches!(
            registry.convert::<bool, i64>(true),
            Err(TransformError::NoTransform { .. })
        ));
    }

    #[test]
    fn test_aliases() {
        let registry = registry();

        assert_eq!(registry.resolve("int"), Some(TypeKey::of::<i64>()));
        assert_eq!(registry.resolve("Double"), Some(TypeKey::of::<f64>()));
        assert_eq!(registry.display_name(TypeKey::of::<i64>()), "Integer");
        assert_eq!(registry.display_name(TypeKey::of::<f64>()), "Float");
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_codec_covers_every_type() {
        let codec = standard_codec();
        for (input, output) in registry().entries() {
            assert!(codec.supports(input), "no codec for {}", input);
            assert!(codec.supports(output), "no codec for {}", output);
        }
    }
}
