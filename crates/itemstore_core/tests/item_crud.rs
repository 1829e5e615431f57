use itemstore_core::{
    Attributes, ContextError, Item, ItemLookup, ItemRepository, MemoryItemRepository,
    OperationContext, RepoError,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Barrier;
use uuid::Uuid;

fn item(kind: &str, name: &str) -> Item {
    Item::new(kind, name, Attributes::new())
}

#[test]
fn insert_and_find_roundtrip() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let mut attributes = Attributes::new();
    attributes.insert("drinkType", json!("Hot Drinks")).unwrap();
    let tea = Item::new("drink", "tea", attributes);
    let id = repo.insert(&ctx, &tea).unwrap();

    assert_eq!(id, tea.id);
    let loaded = repo.find(&ctx, id).unwrap();
    assert_eq!(loaded, tea);
    assert_eq!(
        repo.find_by_type_and_name(&ctx, "drink", "tea").unwrap(),
        tea
    );
    assert_eq!(repo.find_by_name(&ctx, "tea").unwrap(), tea);
}

#[test]
fn insert_keeps_ids_unique() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    for index in 0..20 {
        repo.insert(&ctx, &item("drink", &format!("drink-{index}")))
            .unwrap();
    }

    let ids: HashSet<Uuid> = repo
        .list(&ctx, None)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(ids.len(), 20);
}

#[test]
fn insert_duplicate_id_conflicts() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let tea = item("drink", "tea");
    repo.insert(&ctx, &tea).unwrap();

    let mut same_id = item("food", "bread");
    same_id.id = tea.id;
    let err = repo.insert(&ctx, &same_id).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ItemLookup::Id(id)) if id == tea.id));
    assert_eq!(repo.len(&ctx).unwrap(), 1);
}

#[test]
fn insert_duplicate_type_and_name_conflicts() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    repo.insert(&ctx, &item("drink", "tea")).unwrap();
    let err = repo.insert(&ctx, &item("drink", "tea")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(ItemLookup::TypeAndName { ref kind, ref name })
            if kind == "drink" && name == "tea"
    ));
    assert_eq!(repo.len(&ctx).unwrap(), 1);
}

#[test]
fn same_name_under_other_type_is_allowed() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    repo.insert(&ctx, &item("drink", "tea")).unwrap();
    repo.insert(&ctx, &item("plant", "tea")).unwrap();

    assert_eq!(repo.len(&ctx).unwrap(), 2);
    assert_eq!(repo.find_by_name(&ctx, "tea").unwrap().kind, "drink");
}

#[test]
fn insert_rejects_invalid_item() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let err = repo.insert(&ctx, &item("drink", "X")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.is_empty(&ctx).unwrap());
}

#[test]
fn list_filters_by_type_in_insertion_order() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let tea = item("drink", "tea");
    let bread = item("food", "bread");
    let coffee = item("drink", "coffee");
    for value in [&tea, &bread, &coffee] {
        repo.insert(&ctx, value).unwrap();
    }

    let drinks = repo.list(&ctx, Some("drink")).unwrap();
    assert_eq!(drinks, vec![tea.clone(), coffee.clone()]);

    let all = repo.list(&ctx, None).unwrap();
    assert_eq!(all, vec![tea, bread, coffee]);

    assert!(repo.list(&ctx, Some("vehicle")).unwrap().is_empty());
}

#[test]
fn find_missing_returns_not_found() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let id = Uuid::new_v4();
    assert!(matches!(
        repo.find(&ctx, id).unwrap_err(),
        RepoError::NotFound(ItemLookup::Id(missing)) if missing == id
    ));
    assert!(matches!(
        repo.find_by_type_and_name(&ctx, "drink", "tea").unwrap_err(),
        RepoError::NotFound(ItemLookup::TypeAndName { .. })
    ));
    assert!(matches!(
        repo.find_by_name(&ctx, "tea").unwrap_err(),
        RepoError::NotFound(ItemLookup::Name(_))
    ));
}

#[test]
fn replace_overwrites_in_place() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let mut tea = item("drink", "tea");
    let coffee = item("drink", "coffee");
    repo.insert(&ctx, &tea).unwrap();
    repo.insert(&ctx, &coffee).unwrap();

    tea.attributes.insert("foo", json!("bar")).unwrap();
    repo.replace(&ctx, tea.id, &tea).unwrap();

    let all = repo.list(&ctx, None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], tea);
    assert_eq!(all[1], coffee);
}

#[test]
fn replace_with_other_id_is_immutable() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let tea = item("drink", "tea");
    repo.insert(&ctx, &tea).unwrap();

    let mut changed = tea.clone();
    changed.id = Uuid::new_v4();
    changed.attributes.insert("foo", json!(1)).unwrap();
    let err = repo.replace(&ctx, tea.id, &changed).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Immutable { expected, actual } if expected == tea.id && actual == changed.id
    ));
    assert_eq!(repo.find(&ctx, tea.id).unwrap(), tea);
}

#[test]
fn replace_missing_returns_not_found() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();
    repo.insert(&ctx, &item("drink", "tea")).unwrap();

    let ghost = item("drink", "ghost");
    let err = repo.replace(&ctx, ghost.id, &ghost).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ItemLookup::Id(id)) if id == ghost.id));
    assert_eq!(repo.len(&ctx).unwrap(), 1);
}

#[test]
fn replace_if_unchanged_requires_matching_snapshot() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let tea = item("drink", "tea");
    repo.insert(&ctx, &tea).unwrap();

    let mut first = tea.clone();
    first.attributes.insert("stock", json!(0)).unwrap();
    repo.replace_if_unchanged(&ctx, &tea, &first).unwrap();

    let mut second = tea.clone();
    second.attributes.insert("stock", json!(9)).unwrap();
    let err = repo.replace_if_unchanged(&ctx, &tea, &second).unwrap_err();
    assert!(matches!(err, RepoError::Stale(id) if id == tea.id));
    assert_eq!(repo.find(&ctx, tea.id).unwrap(), first);
}

#[test]
fn replace_rename_into_taken_name_conflicts() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let tea = item("drink", "tea");
    let coffee = item("drink", "coffee");
    repo.insert(&ctx, &tea).unwrap();
    repo.insert(&ctx, &coffee).unwrap();

    let mut renamed = coffee.clone();
    renamed.name = "tea".to_string();
    let err = repo.replace(&ctx, coffee.id, &renamed).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ItemLookup::TypeAndName { .. })));
    assert_eq!(repo.find(&ctx, coffee.id).unwrap(), coffee);

    // Keeping its own name is not a collision.
    repo.replace(&ctx, coffee.id, &coffee).unwrap();
}

#[test]
fn delete_removes_exactly_one_and_keeps_order() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();

    let first = item("drink", "first");
    let second = item("drink", "second");
    let third = item("drink", "third");
    for value in [&first, &second, &third] {
        repo.insert(&ctx, value).unwrap();
    }

    repo.delete(&ctx, second.id).unwrap();

    assert_eq!(repo.list(&ctx, None).unwrap(), vec![first, third]);
    assert!(matches!(
        repo.find(&ctx, second.id).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn delete_missing_returns_not_found() {
    let ctx = OperationContext::background();
    let repo = MemoryItemRepository::new();
    repo.insert(&ctx, &item("drink", "tea")).unwrap();

    let err = repo.delete(&ctx, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert_eq!(repo.len(&ctx).unwrap(), 1);
}

#[test]
fn cancelled_context_does_not_mutate() {
    let repo = MemoryItemRepository::new();
    let live = OperationContext::background();
    let tea = item("drink", "tea");
    repo.insert(&live, &tea).unwrap();

    let cancelled = OperationContext::background();
    cancelled.cancel();

    let err = repo.insert(&cancelled, &item("drink", "coffee")).unwrap_err();
    assert!(matches!(err, RepoError::Cancelled(ContextError::Cancelled)));
    assert!(matches!(
        repo.delete(&cancelled, tea.id).unwrap_err(),
        RepoError::Cancelled(_)
    ));
    assert!(matches!(
        repo.list(&cancelled, None).unwrap_err(),
        RepoError::Cancelled(_)
    ));

    assert_eq!(repo.list(&live, None).unwrap(), vec![tea]);
}

#[test]
fn concurrent_inserts_with_same_name_have_one_winner() {
    const WRITERS: usize = 16;

    let repo = MemoryItemRepository::new();
    let barrier = Barrier::new(WRITERS);

    let results: Vec<Result<Uuid, RepoError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                scope.spawn(|| {
                    let ctx = OperationContext::background();
                    let candidate = item("drink", "tea");
                    barrier.wait();
                    repo.insert(&ctx, &candidate)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(RepoError::Conflict(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, WRITERS - 1);

    let ctx = OperationContext::background();
    assert_eq!(repo.list(&ctx, Some("drink")).unwrap().len(), 1);
}

#[test]
fn concurrent_readers_see_consistent_snapshots() {
    let repo = MemoryItemRepository::new();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let ctx = OperationContext::background();
            for index in 0..200 {
                let value = item("drink", &format!("drink-{index}"));
                repo.insert(&ctx, &value).unwrap();
                if index % 2 == 0 {
                    repo.delete(&ctx, value.id).unwrap();
                }
            }
        });
        scope.spawn(|| {
            let ctx = OperationContext::background();
            for _ in 0..200 {
                let items = repo.list(&ctx, Some("drink")).unwrap();
                let names: HashSet<&str> = items.iter().map(|item| item.name.as_str()).collect();
                assert_eq!(names.len(), items.len());
            }
        });
    });

    let ctx = OperationContext::background();
    assert_eq!(repo.len(&ctx).unwrap(), 100);
}
