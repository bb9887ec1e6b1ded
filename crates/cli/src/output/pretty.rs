//! Pretty output formatting.

use panache_core::value::{Item, Value};

use crate::commands::Explanation;

/// Format an attribute value for display.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::S(s) => format!("{s:?}"),
        Value::L(values) => {
            let inner: Vec<String> = values.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::M(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        other => other.to_string(),
    }
}

/// Format an item for display, one attribute per line.
pub fn format_item(item: &Item) -> String {
    item.iter()
        .map(|(name, value)| format!("  {name}: {}", format_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format items for display.
pub fn format_items(items: &[Item]) -> String {
    if items.is_empty() {
        return "No items found.".to_string();
    }
    let mut output = format!("ITEMS ({})\n", items.len());
    output.push_str(&"-".repeat(40));
    for item in items {
        output.push_str(&format!("\n{}", format_item(item)));
        output.push('\n');
    }
    output
}

/// Format a query explanation for display.
pub fn format_explanation(explanation: &Explanation) -> String {
    let rendered = &explanation.expression;
    let mut output = format!(
        "Table: {}\nOperation: {:?}",
        explanation.table, rendered.operation
    );
    if let Some(key_condition) = &rendered.key_condition {
        output.push_str(&format!("\nKey condition: {key_condition}"));
    }
    if let Some(filter) = &rendered.filter {
        output.push_str(&format!("\nFilter: {filter}"));
    }
    for (alias, name) in &rendered.names {
        output.push_str(&format!("\n  {alias} = {name}"));
    }
    for (placeholder, value) in &rendered.values {
        output.push_str(&format!("\n  {placeholder} = {}", format_value(value)));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::from("a")), "\"a\"");
        assert_eq!(
            format_value(&Value::L(vec![Value::from("a"), Value::from(1)])),
            "[\"a\", 1]"
        );
    }

    #[test]
    fn test_format_empty_items() {
        assert_eq!(format_items(&[]), "No items found.");
    }

    #[test]
    fn test_format_item_lines() {
        let mut item = Item::new();
        item.insert("id".to_string(), Value::from("a"));
        item.insert("weight".to_string(), Value::from(3));
        assert_eq!(format_item(&item), "  id: \"a\"\n  weight: 3");
    }
}
