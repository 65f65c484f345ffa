use pretty_assertions::assert_eq;
use relay_core::{resolve, CandidateItem};

fn items(ids: &[&str]) -> Vec<CandidateItem> {
    ids.iter()
        .map(|id| CandidateItem::new(*id, format!("body of {id}")))
        .collect()
}

fn ids(items: &[CandidateItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[test]
fn present_watermark_yields_newer_prefix_oldest_first() {
    let source = items(&["e", "d", "c", "b", "a"]);
    let change = resolve(&source, Some("c"));
    assert_eq!(ids(&change.items), vec!["d", "e"]);
    assert!(!change.gap_recovery);
}

#[test]
fn every_watermark_position_yields_the_reversed_prefix() {
    let source = items(&["e", "d", "c", "b", "a"]);
    for (pos, item) in source.iter().enumerate() {
        let change = resolve(&source, Some(&item.id));
        let mut expected: Vec<_> = ids(&source[..pos]);
        expected.reverse();
        assert_eq!(ids(&change.items), expected);
    }
}

#[test]
fn watermark_on_newest_item_means_nothing_new() {
    let source = items(&["c", "b", "a"]);
    assert!(resolve(&source, Some("c")).is_empty());
}

#[test]
fn first_run_takes_only_the_newest_item() {
    let source = items(&["c", "b", "a"]);
    let change = resolve(&source, None);
    assert_eq!(ids(&change.items), vec!["c"]);
    assert!(!change.gap_recovery);
}

#[test]
fn aged_out_watermark_triggers_gap_recovery() {
    let source = items(&["e", "d", "c", "b", "a"]);
    let change = resolve(&source, Some("z"));
    assert_eq!(ids(&change.items), vec!["a", "b", "c", "d", "e"]);
    assert!(change.gap_recovery);
}

#[test]
fn empty_source_is_always_empty() {
    assert!(resolve(&[], None).is_empty());
    let change = resolve(&[], Some("z"));
    assert!(change.is_empty());
    assert!(!change.gap_recovery);
}

#[test]
fn committing_the_last_item_makes_the_next_run_disjoint() {
    let first = items(&["c", "b", "a"]);
    let change = resolve(&first, Some("a"));
    let committed = change.items.last().unwrap().id.clone();
    assert_eq!(committed, "c");

    let next = items(&["e", "d", "c", "b", "a"]);
    let again = resolve(&next, Some(&committed));
    assert_eq!(ids(&again.items), vec!["d", "e"]);
    assert!(again
        .items
        .iter()
        .all(|item| !change.items.iter().any(|done| done.id == item.id)));
}

#[test]
fn ids_compare_by_exact_string_equality() {
    let source = items(&["https://t.me/x/10", "https://t.me/x/9"]);
    let change = resolve(&source, Some("https://t.me/x/1"));
    assert!(change.gap_recovery);
    assert_eq!(change.len(), 2);
}
