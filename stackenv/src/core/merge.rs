//! Recursive merge of YAML mappings.
//!
//! Used to build the per-environment view: the default environment mapping
//! merged with an environment's override mapping. Mappings merge key by
//! key; anything else is overwritten by the override.

use serde_yaml::{Mapping, Value};

/// Merge `over` onto `base`. Override wins on scalar and sequence leaves,
/// mappings merge recursively.
pub fn merge_values(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Mapping(base), Value::Mapping(over)) => {
            Value::Mapping(merge_mappings(base, over))
        }
        _ => over.clone(),
    }
}

/// Mapping form of [`merge_values`].
pub fn merge_mappings(base: &Mapping, over: &Mapping) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in over {
        let value = match merged.get(key) {
            Some(existing) => merge_values(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).expect("fixture yaml")
    }

    #[test]
    fn override_wins_on_scalars() {
        let merged = merge_mappings(&mapping("a: 1\nb: 2"), &mapping("b: 3"));
        assert_eq!(merged.get("a"), Some(&Value::from(1)));
        assert_eq!(merged.get("b"), Some(&Value::from(3)));
    }

    #[test]
    fn mappings_merge_recursively() {
        let base = mapping("stable:\n  gcc:\n    compiler: gcc@11\n  keep: true");
        let over = mapping("stable:\n  gcc:\n    compiler: gcc@12");
        let merged = merge_mappings(&base, &over);
        let stable = merged.get("stable").and_then(Value::as_mapping).expect("stable");
        assert_eq!(
            stable.get("gcc").and_then(|v| v.get("compiler")),
            Some(&Value::from("gcc@12"))
        );
        assert_eq!(stable.get("keep"), Some(&Value::from(true)));
    }

    #[test]
    fn sequences_are_replaced_not_appended() {
        let merged = merge_mappings(&mapping("list: [1, 2]"), &mapping("list: [3]"));
        assert_eq!(
            merged.get("list"),
            Some(&Value::Sequence(vec![Value::from(3)]))
        );
    }
}
