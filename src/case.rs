//! Identifier conversions: table name to URL path segment, and display names.

/// URL path segment for a table: `order_lines` -> `order-lines`.
pub fn table_to_path(table: &str) -> String {
    table.replace('_', "-")
}

/// Display name used for tags and summaries: `order_lines` -> `Order Lines`.
pub fn humanize(table: &str) -> String {
    table
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscores_become_hyphens() {
        assert_eq!(table_to_path("order_lines"), "order-lines");
        assert_eq!(table_to_path("users"), "users");
    }

    #[test]
    fn humanized_names() {
        assert_eq!(humanize("order_lines"), "Order Lines");
        assert_eq!(humanize("_users_"), "Users");
    }
}
