//! Plugin ordering hints.

use tracing::info;

/// Reorder `items` so the entries named in `hint` come first, in hint order,
/// followed by everything else in its original order.
///
/// Hint names that match nothing are logged and skipped.
pub fn order_by_hint<T, F>(items: Vec<T>, hint: &[String], name_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut remaining: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    for wanted in hint {
        let position = remaining
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|item| name_of(item) == wanted.as_str()));
        match position.and_then(|i| remaining[i].take()) {
            Some(item) => ordered.push(item),
            None => info!("Plugin {} not found.", wanted),
        }
    }

    ordered.extend(remaining.into_iter().flatten());
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn order(items: &[&'static str], names: &[&str]) -> Vec<&'static str> {
        order_by_hint(items.to_vec(), &hint(names), |s| *s)
    }

    #[test]
    fn hinted_entries_lead_and_the_rest_keep_their_order() {
        assert_eq!(order(&["A", "B", "C", "D"], &["D", "B"]), vec!["D", "B", "A", "C"]);
    }

    #[test]
    fn unknown_names_are_skipped() {
        assert_eq!(order(&["A", "B", "C"], &["Z", "C"]), vec!["C", "A", "B"]);
    }

    #[test]
    fn empty_hint_keeps_original_order() {
        assert_eq!(order(&["A", "B"], &[]), vec!["A", "B"]);
    }

    #[test]
    fn repeated_hint_names_only_move_one_entry() {
        assert_eq!(order(&["A", "B"], &["B", "B"]), vec!["B", "A"]);
    }
}
