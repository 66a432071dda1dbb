use kvdoc::collection::{Document, ScanStrategy};
use kvdoc::common::Value;
use kvdoc::filter::{all, field};
use kvdoc::store::KvStoreProvider;
use kvdoc::{doc, filter};
use kvdoc_int_test::test_util::{
    assert_index_consistent, cleanup, create_context_with, create_test_context, doc_key,
    index_key, insert_test_documents, int_id, run_test, sorted, user_ids, INDEXED_FIELDS,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

#[ctor::ctor]
fn init() {
    colog::init();
}

fn staff(id: i64) -> Document {
    let roles = ["CTO", "CEO", "Dev", "QA"];
    doc! {
        userId: id,
        role: roles[(id % 4) as usize],
        age: 20 + id % 7,
        active: id % 3 == 0,
        name: format!("user-{}", id),
    }
}

#[test]
fn test_index_entries_follow_writes() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            assert_index_consistent(&users, &INDEXED_FIELDS)?;

            let entries = users.index_entries("role")?;
            let expected = vec![
                ("s:CEO".to_string(), BTreeSet::from([int_id(2)])),
                ("s:CTO".to_string(), BTreeSet::from([int_id(1), int_id(3)])),
            ];
            assert_eq!(entries, expected);

            users.update(filter! { userId: 3 }, &doc! { role: "Lead Dev", active: true })?;
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            users.delete(filter! { role: "CEO" })?;
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            users.set(&doc! { userId: 1, role: "CEO" })?;
            assert_index_consistent(&users, &INDEXED_FIELDS)?;

            // non indexed fields get no entries
            assert!(users.index_entries("name")?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_intersection_equals_single_field_intersection() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            for id in 0..60 {
                users.set(&staff(id))?;
            }

            for role in ["CTO", "CEO", "Dev", "QA"] {
                for age in 20..27 {
                    let by_role = users.find(field("role").eq(role))?.collect::<Vec<_>>();
                    let by_age = users.find(field("age").eq(age))?.collect::<Vec<_>>();
                    let expected = by_role
                        .iter()
                        .filter(|doc| by_age.contains(doc))
                        .filter_map(|doc| doc.get("userId").and_then(Value::as_i64))
                        .collect::<Vec<_>>();

                    let cursor = users.find(field("role").eq(role).and(field("age").eq(age)))?;
                    assert_eq!(cursor.find_plan().index_probes().len(), 2);
                    assert_eq!(sorted(user_ids(cursor)), sorted(expected));
                }
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_membership_probes_union_values() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            for id in 0..40 {
                users.set(&staff(id))?;
            }

            let cursor = users.find(filter! {
                role: { "$in": ["CTO", "QA", "CTO"] },
                age: { "$in": [20, 21] },
                active: true,
            })?;
            assert_eq!(cursor.find_plan().index_probes()[0].values().len(), 2);
            let found = sorted(user_ids(cursor));

            let expected = (0..40)
                .filter(|id| [0, 3].contains(&(id % 4)))
                .filter(|id| [20, 21].contains(&(20 + id % 7)))
                .filter(|id| id % 3 == 0)
                .collect::<Vec<_>>();
            assert_eq!(found, expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_scan_fallback_matches_brute_force() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            let mut documents = Vec::new();
            for id in 0..50 {
                let document = staff(id);
                users.set(&document)?;
                documents.push(document);
            }

            let filters = vec![
                filter! { age: { "$gt": 22 } },
                filter! { name: { "$regex": "-1" } },
                filter! { role: { "$ne": "Dev" }, age: { "$lte": 21 } },
                filter! { role: { "$nin": ["CTO", "CEO"] } },
            ];
            for spec in filters {
                let compiled = kvdoc::filter::Filter::compile(&spec)?;
                let expected = documents
                    .iter()
                    .filter(|doc| compiled.matches(doc))
                    .filter_map(|doc| doc.get("userId").and_then(Value::as_i64))
                    .collect::<Vec<_>>();

                let cursor = users.find(spec)?;
                assert!(cursor.find_plan().is_full_scan());
                assert_eq!(sorted(user_ids(cursor)), sorted(expected));
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_plans() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            let plan = users.explain(filter! { userId: { "$in": [1, 2] }, role: "CTO" })?;
            match plan.strategy() {
                ScanStrategy::IdLookup(ids) => assert_eq!(ids, &vec![int_id(1), int_id(2)]),
                other => panic!("expected an id lookup, got {:?}", other),
            }

            let plan = users.explain(filter! { role: "CTO", age: { "$gt": 3 }, name: "x" })?;
            assert_eq!(plan.index_probes().len(), 1);
            assert_eq!(plan.filter().predicates().len(), 3);

            assert!(users.explain(filter! { name: "x" })?.is_full_scan());
            assert!(users.explain(all())?.is_full_scan());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_masks_and_repairs_dangling_ids() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            // the record vanishes behind the index's back
            ctx.store().memory().delete_value(&doc_key("users", &int_id(1)))?;

            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![3]);
            let entries = users.index_entries("role")?;
            assert!(entries.iter().all(|(_, ids)| !ids.contains(&int_id(1))));

            // entries the read did not consult are left for reconciliation
            let age = users.index_entries("age")?;
            assert!(age.iter().any(|(_, ids)| ids.contains(&int_id(1))));
            users.reconcile_indexes()?;
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_masks_and_repairs_stale_ids() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            // rewrite the record without touching the index
            let other = ctx.repository().collection("shadow", "userId")?;
            other.set(&doc! { userId: 2, role: "CTO", age: 40, name: "Bob" })?;
            let raw = ctx.store().memory().get_value(&doc_key("shadow", &int_id(2)))?;
            let record = raw.expect("shadow record");
            ctx.store().memory().set_value(
                &doc_key("users", &int_id(2)),
                record,
                kvdoc::store::Expiry::Never,
            )?;

            // the index still says CEO, the document says CTO
            assert!(users.find(filter! { role: "CEO" })?.is_empty());
            assert!(users.index_entries("role")?.iter().all(|(value, ids)| {
                value != "s:CEO" || !ids.contains(&int_id(2))
            }));

            // scan and reconcile bring the CTO membership back
            assert_eq!(users.count(filter! { role: { "$ne": "CEO" } })?, 3);
            users.reconcile_indexes()?;
            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![1, 2, 3]);
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_repair_can_be_disabled() {
    run_test(
        || create_context_with(|builder| builder.read_repair(false)),
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            ctx.store().memory().delete_value(&doc_key("users", &int_id(1)))?;

            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![3]);
            let entries = users.index_entries("role")?;
            assert!(entries.iter().any(|(_, ids)| ids.contains(&int_id(1))));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reconcile_drops_entries_of_unindexed_fields() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            // same store, "active" and "age" no longer indexed
            let narrowed = kvdoc::repository::Repository::builder()
                .store(ctx.repository().store().clone())
                .indexed_field("role")
                .build()?
                .collection("users", "userId")?;
            let result = narrowed.reconcile_indexes()?;
            assert_eq!(result.affected_count(), 3);
            assert!(narrowed.index_entries("age")?.is_empty());
            assert_eq!(narrowed.index_entries("role")?.len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_key_prefix_namespaces_repositories() {
    run_test(
        || create_context_with(|builder| builder.key_prefix("tenant-a:")),
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            let keys = ctx.store().memory().list_keys_with_prefix("")?;
            assert!(!keys.is_empty());
            assert!(keys.iter().all(|key| key.starts_with("tenant-a:users:")));

            let other = kvdoc::repository::Repository::builder()
                .store(ctx.repository().store().clone())
                .key_prefix("tenant-b:")
                .build()?
                .collection("users", "userId")?;
            assert_eq!(other.count(all())?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_between_index_and_record_write_of_update() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            // a reader runs after the new membership landed, before the record did
            let seen = Arc::new(Mutex::new(None));
            let reader = users.clone();
            let reader_seen = Arc::clone(&seen);
            ctx.store().before_set(&doc_key("users", &int_id(1)), move || {
                let found = reader.find(filter! { role: "Lead" }).expect("concurrent find");
                *reader_seen.lock() = Some(user_ids(found));
            });

            let result = users.update(filter! { userId: 1 }, &doc! { role: "Lead" })?;
            assert_eq!(result.affected_ids(), &[int_id(1)]);
            assert_eq!(*seen.lock(), Some(vec![]));

            assert_eq!(user_ids(users.find(filter! { role: "Lead" })?), vec![1]);
            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![3]);
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_between_index_and_record_write_of_insert() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            let seen = Arc::new(Mutex::new(None));
            let reader = users.clone();
            let reader_seen = Arc::clone(&seen);
            ctx.store().before_set(&doc_key("users", &int_id(7)), move || {
                let found = reader.find(filter! { role: "CTO" }).expect("concurrent find");
                *reader_seen.lock() = Some(user_ids(found));
            });

            users.set(&doc! { userId: 7, role: "CTO", age: 33 })?;
            assert_eq!(*seen.lock(), Some(vec![1, 3]));

            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![1, 3, 7]);
            assert_eq!(user_ids(users.find(filter! { role: "CTO", age: 33 })?), vec![7]);
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_eviction_keeps_membership_of_record_rewritten_meanwhile() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            // a write of role Lead has added its membership, the record still says CTO
            let lead = index_key("users", "role", "s:Lead");
            ctx.store().memory().add_set_member(&lead, int_id(1).as_str())?;

            // the write completes after the reader fetched CTO, before it evicts
            let writer = users.clone();
            ctx.store().before_removal(&lead, move || {
                writer
                    .set(&doc! { userId: 1, role: "Lead", age: 30, name: "Alice" })
                    .expect("concurrent set");
            });

            assert!(users.find(filter! { role: "Lead" })?.is_empty());
            assert_eq!(user_ids(users.find(filter! { role: "Lead" })?), vec![1]);
            assert_index_consistent(&users, &INDEXED_FIELDS)?;
            Ok(())
        },
        cleanup,
    )
}
