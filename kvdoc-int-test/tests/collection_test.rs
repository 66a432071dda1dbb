use kvdoc::collection::{just_once, order_by, DocId};
use kvdoc::common::{SortOrder, Value};
use kvdoc::errors::ErrorKind;
use kvdoc::filter::{all, field};
use kvdoc::store::KvStoreProvider;
use kvdoc::{doc, filter};
use kvdoc_int_test::test_util::{
    cleanup, create_structured_test_context, create_test_context, insert_test_documents, int_id,
    run_test, sorted, user_ids,
};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_user_scenario() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![1, 3]);
            assert_eq!(user_ids(users.find(filter! { age: { "$gt": 25 } })?), vec![1, 2]);

            let result = users.update(filter! { userId: 3 }, &doc! { role: "Lead Dev" })?;
            assert_eq!(result.affected_ids(), &[int_id(3)]);
            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![1]);

            let result = users.delete(filter! { role: "CEO" })?;
            assert_eq!(result.affected_ids(), &[int_id(2)]);
            assert_eq!(user_ids(users.find(filter! {})?), vec![1, 3]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_user_scenario_structured() {
    run_test(
        create_structured_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            assert_eq!(user_ids(users.find(filter! { role: "CTO" })?), vec![1, 3]);
            users.update(filter! { userId: 3 }, &doc! { role: "Lead Dev" })?;
            users.delete(filter! { role: "CEO" })?;
            assert_eq!(user_ids(users.find(all())?), vec![1, 3]);

            let carol = users.get_by_id(3)?.expect("carol is stored");
            assert_eq!(carol.get("role"), Some(&Value::from("Lead Dev")));
            assert_eq!(carol.get("age"), Some(&Value::from(25)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_set_returns_id_and_replaces() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            let id = users.set(&doc! { userId: "alice", role: "CTO" })?;
            assert_eq!(id, DocId::from_value(&Value::from("alice"))?);

            users.set(&doc! { userId: "alice", role: "CEO" })?;
            assert_eq!(users.count(all())?, 1);
            assert_eq!(users.count(filter! { role: "CTO" })?, 0);
            assert_eq!(users.count(filter! { role: "CEO" })?, 1);

            // replacing drops fields that are not in the new document
            users.set(&doc! { userId: "alice" })?;
            assert_eq!(users.count(filter! { role: "CEO" })?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_string_and_integer_ids_are_distinct() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            users.set(&doc! { userId: 7, role: "a" })?;
            users.set(&doc! { userId: "7", role: "b" })?;
            assert_eq!(users.count(all())?, 2);

            let found = users.find_one(filter! { userId: "7" })?.expect("string id");
            assert_eq!(found.get("role"), Some(&Value::from("b")));
            let found = users.find_one(filter! { userId: 7 })?.expect("integer id");
            assert_eq!(found.get("role"), Some(&Value::from("a")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_documents_are_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            let err = users.set(&doc! { role: "CTO" }).err().expect("missing id");
            assert_eq!(err.kind(), &ErrorKind::InvalidDocument);

            let err = users.set(&doc! { userId: 1.5 }).err().expect("float id");
            assert_eq!(err.kind(), &ErrorKind::InvalidDocument);

            let err = users.set(&doc! { userId: true }).err().expect("bool id");
            assert_eq!(err.kind(), &ErrorKind::InvalidDocument);
            assert_eq!(users.count(all())?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_numeric_equality_across_types() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            users.set(&doc! { userId: 1, age: 30.0 })?;
            users.set(&doc! { userId: 2, age: 30 })?;
            users.set(&doc! { userId: 3, age: 30.5 })?;
            users.set(&doc! { userId: 4, age: "30" })?;

            assert_eq!(user_ids(users.find(filter! { age: 30 })?), vec![1, 2]);
            assert_eq!(user_ids(users.find(filter! { age: 30.0 })?), vec![1, 2]);
            assert_eq!(user_ids(users.find(filter! { age: 30.5 })?), vec![3]);
            assert_eq!(user_ids(users.find(filter! { age: "30" })?), vec![4]);
            // ordering ignores non numeric values
            assert_eq!(user_ids(users.find(filter! { age: { "$gte": 30 } })?), vec![1, 2, 3]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_operators() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            users.set(&doc! { userId: 4, name: "dave" })?;

            assert_eq!(user_ids(users.find(filter! { role: { "$eq": "CEO" } })?), vec![2]);
            assert_eq!(user_ids(users.find(filter! { role: { "$ne": "CTO" } })?), vec![2, 4]);
            assert_eq!(
                user_ids(users.find(filter! { role: { "$in": ["CEO", "CFO"] } })?),
                vec![2]
            );
            assert_eq!(
                user_ids(users.find(filter! { role: { "$nin": ["CTO"] } })?),
                vec![2, 4]
            );
            assert_eq!(
                user_ids(users.find(filter! { age: { "$gte": 25, "$lt": 40 } })?),
                vec![1, 3]
            );
            assert_eq!(user_ids(users.find(filter! { age: { "$lte": 25 } })?), vec![3]);
            assert_eq!(
                user_ids(users.find(filter! { name: { "$regex": "^[ab]", "$options": "i" } })?),
                vec![1, 2]
            );
            assert_eq!(user_ids(users.find(field("name").regex("o"))?), vec![2, 3]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_fluent_filters() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            let spec = field("role").eq("CTO").and(field("age").gt(26));
            assert_eq!(user_ids(users.find(spec)?), vec![1]);

            let spec = field("userId").in_array(vec![2, 3]).and(field("role").ne("CEO"));
            assert_eq!(user_ids(users.find(spec)?), vec![3]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_is_a_shallow_merge() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            let result = users.update(filter! { role: "CTO" }, &doc! { age: 50, level: 3 })?;
            assert_eq!(result.affected_count(), 2);
            assert!(!result.has_failures());

            let alice = users.get_by_id(1)?.expect("alice is stored");
            assert_eq!(alice.get("name"), Some(&Value::from("Alice")));
            assert_eq!(alice.get("age"), Some(&Value::from(50)));
            assert_eq!(alice.get("level"), Some(&Value::from(3)));
            assert_eq!(user_ids(users.find(filter! { age: 50 })?), vec![1, 3]);
            assert!(users.find(filter! { age: 30 })?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_without_matches() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            let result = users.update(filter! { role: "CFO" }, &doc! { age: 1 })?;
            assert_eq!(result.affected_count(), 0);
            assert!(!result.has_failures());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_rejects_id_change() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            let calls = ctx.store().calls();

            let err = users
                .update(filter! { userId: 1 }, &doc! { userId: 9 })
                .err()
                .expect("id field in patch");
            assert_eq!(err.kind(), &ErrorKind::InvalidDocument);
            assert_eq!(ctx.store().calls(), calls);
            assert!(users.get_by_id(9)?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_and_delete_just_once() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            let result = users.update_with_options(all(), &doc! { active: true }, &just_once())?;
            assert_eq!(result.affected_count(), 1);
            assert_eq!(users.count(filter! { active: true })?, 1);

            let result = users.delete_one(filter! { role: "CTO" })?;
            assert_eq!(result.affected_count(), 1);
            assert_eq!(users.count(filter! { role: "CTO" })?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_without_matches() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            let result = users.delete(filter! { name: "nobody" })?;
            assert_eq!(result.affected_count(), 0);
            assert_eq!(users.count(all())?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_options() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            users.set(&doc! { userId: 4, role: "CTO" })?;

            let options = order_by("age", SortOrder::Ascending);
            assert_eq!(user_ids(users.find_with_options(all(), &options)?), vec![3, 1, 2, 4]);

            let options = order_by("age", SortOrder::Descending).skip(1).limit(2);
            assert_eq!(user_ids(users.find_with_options(all(), &options)?), vec![1, 3]);

            let options = order_by("name", SortOrder::Ascending).limit(1);
            let cursor = users.find_with_options(filter! { role: "CTO" }, &options)?;
            assert_eq!(user_ids(cursor), vec![1]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_count() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            assert!(users.find_one(all())?.is_none());
            assert_eq!(users.count(all())?, 0);

            insert_test_documents(&users)?;
            let first = users.find_one(filter! { role: "CTO" })?.expect("a CTO");
            assert_eq!(first.get("userId"), Some(&Value::from(1)));
            assert_eq!(users.count(filter! { age: { "$lt": 35 } })?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_cursor_is_one_shot_and_carries_plan() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;

            let mut cursor = users.find(filter! { role: "CTO" })?;
            assert_eq!(cursor.size(), 2);
            assert!(!cursor.find_plan().is_full_scan());
            assert_eq!(sorted(user_ids(users.find(filter! { role: "CTO" })?)), vec![1, 3]);
            assert_eq!(cursor.by_ref().count(), 2);
            assert_eq!(cursor.next(), None);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_clear() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.users()?;
            insert_test_documents(&users)?;
            let result = users.clear()?;
            assert_eq!(result.affected_count(), 3);
            assert_eq!(users.count(all())?, 0);
            assert!(users.index_entries("role")?.is_empty());
            assert!(ctx.store().memory().list_keys_with_prefix("users")?.is_empty());
            Ok(())
        },
        cleanup,
    )
}
