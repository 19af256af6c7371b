use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// JSON schema for `T`, fully inlined: no `$ref`, `definitions` or `$schema`.
pub fn inlined_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_default();

    inline_refs(&mut value);

    if let Value::Object(map) = &mut value {
        map.remove("definitions");
        map.remove("$schema");
        map.remove("title");
    }
    strip_formats(&mut value);
    value
}

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };
    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        // Keep the referencing site's description, if any.
                        let description = map.get("description").cloned();
                        *value = def.clone();
                        if let (Some(d), Value::Object(inlined)) = (description, &mut *value) {
                            inlined.insert("description".into(), d);
                        }
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    let description = map.get("description").cloned();
                    if let Some(only) = all_of.into_iter().next() {
                        *value = only;
                        if let (Some(d), Value::Object(inlined)) = (description, &mut *value) {
                            inlined.entry("description").or_insert(d);
                        }
                    }
                    inline_refs_recursive(value, definitions);
                    return;
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

/// `format: int64` and friends are not part of the model-side schema subset.
fn strip_formats(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if matches!(map.get("format"), Some(Value::String(_))) {
                map.remove("format");
            }
            for (_, v) in map.iter_mut() {
                strip_formats(v);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(strip_formats),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Inner {
        code: String,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Outer {
        /// how many
        count: i64,
        inner: Option<Inner>,
    }

    #[test]
    fn refs_are_inlined() {
        let v = inlined_schema::<Vec<Outer>>();
        let s = v.to_string();
        assert!(!s.contains("$ref"), "{s}");
        assert!(!s.contains("definitions"), "{s}");
        assert!(!s.contains("int64"), "{s}");
        assert_eq!(v["type"], "array");
        assert_eq!(v["items"]["properties"]["count"]["description"], "how many");
    }
}
