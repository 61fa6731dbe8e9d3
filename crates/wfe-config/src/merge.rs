//! Deep merge of `toml::Value` trees, used to layer inline session
//! overrides on top of a loaded configuration file.

/// Deep merge two TOML values. `overlay` wins for non-table values;
/// tables are merged recursively.
pub fn merge_toml_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_map), toml::Value::Table(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged_val = match base_map.remove(&key) {
                    Some(base_val) => merge_toml_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged_val);
            }
            toml::Value::Table(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn overlay_scalar_wins() {
        let base: Value = toml::from_str("x = 1").unwrap();
        let overlay: Value = toml::from_str("x = 2").unwrap();
        let merged = merge_toml_values(base, overlay);
        assert_eq!(merged.get("x").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn nested_tables_merge_recursively() {
        let base: Value = toml::from_str("[executor]\nqueueSize = 10\n").unwrap();
        let overlay: Value = toml::from_str("[executor]\npollInterval = \"5s\"\n").unwrap();
        let merged = merge_toml_values(base, overlay);
        let table = merged.get("executor").unwrap();
        assert_eq!(table.get("queueSize").unwrap().as_integer(), Some(10));
        assert_eq!(table.get("pollInterval").unwrap().as_str(), Some("5s"));
    }
}
