use toml::{Table, Value};

/// Merges `PREFIX<sep>A<sep>B=value` variables into `table` at `a.b`.
///
/// Path segments are lowercased. Values are kept as strings since every
/// setting is textual.
pub fn merge_env_vars<I>(table: &mut Table, prefix: &str, separator: &str, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    if separator.is_empty() {
        return;
    }
    let prefix_with_sep = format!("{prefix}{separator}");

    for (key, value) in vars {
        let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        let path: Vec<String> = path_str
            .split(separator)
            .map(|s| s.to_lowercase())
            .collect();
        if path.iter().any(String::is_empty) {
            continue;
        }
        insert_at_path(table, &path, Value::String(value));
    }
}

fn insert_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        table.insert(first.clone(), value);
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }
    if let Some(Value::Table(nested)) = table.get_mut(first) {
        insert_at_path(nested, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefixed_vars_are_merged() {
        let mut table = Table::new();
        merge_env_vars(
            &mut table,
            "KEYHIVE",
            "__",
            vars(&[("KEYHIVE__SCOPE", "local_machine"), ("OTHER__SCOPE", "users")]),
        );

        assert_eq!(table.len(), 1);
        assert_eq!(table["scope"].as_str(), Some("local_machine"));
    }

    #[test]
    fn test_nested_path() {
        let mut table = Table::new();
        merge_env_vars(&mut table, "APP", "_", vars(&[("APP_STORE_FILE", "x")]));

        assert_eq!(table["store"]["file"].as_str(), Some("x"));
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let mut table = Table::new();
        merge_env_vars(
            &mut table,
            "KEYHIVE",
            "__",
            vars(&[("KEYHIVE__", "a"), ("KEYHIVE____VIEW", "b")]),
        );

        assert!(table.is_empty());
    }
}
