/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays (including arrays of tables such as `[[targets]]`)
///   from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn nested_tables_merge_per_field() {
        let mut base = parse("[glue]\nhandle = \"wasm\"\nsetter = \"__wbg_set_wasm\"\n");
        deep_merge(&mut base, &parse("[glue]\nmodule = \"tiktoken\"\n"));

        let glue = base["glue"].as_table().unwrap();
        assert_eq!(glue["handle"].as_str(), Some("wasm"));
        assert_eq!(glue["module"].as_str(), Some("tiktoken"));
    }

    #[test]
    fn arrays_of_tables_replace() {
        let mut base = parse("[[targets]]\nname = \"a\"\n[[targets]]\nname = \"b\"\n");
        deep_merge(&mut base, &parse("[[targets]]\nname = \"c\"\n"));

        let targets = base["targets"].as_array().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0]["name"].as_str(), Some("c"));
    }
}
