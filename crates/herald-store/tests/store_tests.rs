use chrono::{TimeZone, Utc};
use herald_store::Store;
use herald_store::models::ParentLookup;
use herald_types::api::Direction;
use herald_types::models::{MessageRecord, Privileges, Reactions, UserEntry};

fn record(id: i64, ts_ms: i64) -> MessageRecord {
    MessageRecord {
        id,
        kind: "md".into(),
        text: format!("message {id}"),
        author: "Dana".into(),
        author_id: "dana@example.org".into(),
        timestamp: Utc.timestamp_millis_opt(ts_ms).unwrap(),
        last_edit: None,
        file: None,
        deleted: false,
        views: 0,
        reactions: Reactions::new(),
        reply_to: None,
        is_thread: false,
        original_message: None,
    }
}

fn seed(store: &Store, count: i64) {
    for i in 1..=count {
        let id = store.next_message_id().unwrap();
        assert_eq!(id, i);
        store.insert_message(&record(id, 1_000 * id), true).unwrap();
    }
}

#[test]
fn ids_are_monotonic() {
    let store = Store::open_in_memory().unwrap();
    let a = store.next_message_id().unwrap();
    let b = store.next_message_id().unwrap();
    assert!(b > a);
}

#[test]
fn pagination_is_complete_and_ordered() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 25);

    // Walk the whole feed with the last item of each page as the cursor.
    let mut collected = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.feed_page(cursor, 7, Direction::Desc, false).unwrap();
        if page.is_empty() {
            break;
        }
        cursor = Some(page.last().unwrap().record.id);
        collected.extend(page.into_iter().map(|item| item.record.id));
    }

    let expected: Vec<i64> = (1..=25).rev().collect();
    assert_eq!(collected, expected);
}

#[test]
fn ascending_pagination_walks_oldest_first() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 9);

    let page = store.feed_page(None, 4, Direction::Asc, false).unwrap();
    let ids: Vec<i64> = page.iter().map(|item| item.record.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let next = store.feed_page(Some(4), 4, Direction::Asc, false).unwrap();
    let ids: Vec<i64> = next.iter().map(|item| item.record.id).collect();
    assert_eq!(ids, vec![5, 6, 7, 8]);
}

#[test]
fn same_cursor_yields_identical_pages() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 12);

    let first = store.feed_page(Some(9), 5, Direction::Desc, false).unwrap();
    let second = store.feed_page(Some(9), 5, Direction::Desc, false).unwrap();

    let ids = |items: &[herald_store::models::FeedItem]| {
        items.iter().map(|i| i.record.id).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(ids(&first), vec![8, 7, 6, 5, 4]);
}

#[test]
fn unknown_cursor_starts_from_the_top() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 5);

    let page = store.feed_page(Some(999), 3, Direction::Desc, false).unwrap();
    let ids: Vec<i64> = page.iter().map(|item| item.record.id).collect();
    assert_eq!(ids, vec![5, 4, 3]);
}

#[test]
fn deleted_records_do_not_shrink_pages() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 12);
    for id in [12, 10, 8, 6] {
        store.soft_delete(id, "*message deleted*", 99_000).unwrap();
    }

    let page = store.feed_page(None, 5, Direction::Desc, false).unwrap();
    let ids: Vec<i64> = page.iter().map(|item| item.record.id).collect();
    // tombstones consumed index slots but the page still fills
    assert_eq!(ids, vec![11, 9, 7, 5, 4]);

    // an elevated viewer sees the tombstones in place
    let page = store.feed_page(None, 5, Direction::Desc, true).unwrap();
    let ids: Vec<i64> = page.iter().map(|item| item.record.id).collect();
    assert_eq!(ids, vec![12, 11, 10, 9, 8]);
}

#[test]
fn soft_delete_tombstones_in_place() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 2);

    let deleted = store
        .soft_delete(1, "*message deleted*", 5_000)
        .unwrap()
        .unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.text, "*message deleted*");
    assert!(deleted.file.is_none());

    // the record is still there, never physically removed
    assert!(store.message_exists(1).unwrap());
    assert!(store.soft_delete(77, "*message deleted*", 5_000).unwrap().is_none());
}

#[test]
fn feed_embeds_reply_parents() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 2);

    let mut reply = record(3, 3_000);
    reply.reply_to = Some(1);
    store.insert_message(&reply, true).unwrap();

    // a reply to a key that resolves to nothing
    let mut orphan = record(4, 4_000);
    orphan.reply_to = Some(999);
    store.insert_message(&orphan, true).unwrap();

    let page = store.feed_page(None, 10, Direction::Desc, false).unwrap();

    let orphan_item = page.iter().find(|i| i.record.id == 4).unwrap();
    assert!(matches!(orphan_item.parent, Some(ParentLookup::Missing(999))));

    let reply_item = page.iter().find(|i| i.record.id == 3).unwrap();
    match &reply_item.parent {
        Some(ParentLookup::Found(parent)) => assert_eq!(parent.id, 1),
        other => panic!("expected found parent, got {other:?}"),
    }

    let plain = page.iter().find(|i| i.record.id == 2).unwrap();
    assert!(plain.parent.is_none());
}

#[test]
fn unindexed_thread_replies_stay_out_of_the_feed() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 3);

    let mut reply = record(4, 4_000);
    reply.reply_to = Some(2);
    reply.is_thread = true;
    // index_thread_replies off: no feed_index row
    store.insert_message(&reply, false).unwrap();

    let page = store.feed_page(None, 10, Direction::Desc, false).unwrap();
    let ids: Vec<i64> = page.iter().map(|item| item.record.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    // but the thread scan still finds it
    let replies = store.thread_replies(2, false).unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, 4);
}

#[test]
fn thread_replies_sorted_oldest_first() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 1);

    for (id, ts) in [(2, 9_000), (3, 2_000), (4, 5_000)] {
        let mut reply = record(id, ts);
        reply.reply_to = Some(1);
        reply.is_thread = true;
        store.insert_message(&reply, true).unwrap();
    }
    store.soft_delete(4, "*message deleted*", 10_000).unwrap();

    let replies = store.thread_replies(1, false).unwrap();
    let ids: Vec<i64> = replies.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let all = store.thread_replies(1, true).unwrap();
    let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 4, 2]);
}

#[test]
fn reaction_toggle_round_trips() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 1);

    let first = store.toggle_reaction(1, "u1", "👍").unwrap().unwrap();
    assert_eq!(first.get("👍"), Some(&1));

    // second identical toggle clears it
    let second = store.toggle_reaction(1, "u1", "👍").unwrap().unwrap();
    assert!(second.is_empty());

    let record = store.get_message(1).unwrap().unwrap();
    assert!(record.reactions.is_empty());
}

#[test]
fn reaction_switch_replaces_previous_emoji() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 1);

    store.toggle_reaction(1, "u1", "👍").unwrap();
    store.toggle_reaction(1, "u2", "👍").unwrap();
    let aggregate = store.toggle_reaction(1, "u1", "❤️").unwrap().unwrap();

    assert_eq!(aggregate.get("👍"), Some(&1));
    assert_eq!(aggregate.get("❤️"), Some(&1));
}

#[test]
fn reaction_on_missing_message_mutates_nothing() {
    let store = Store::open_in_memory().unwrap();
    assert!(store.toggle_reaction(41, "u1", "👍").unwrap().is_none());
}

#[test]
fn search_candidates_respect_the_window() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 10);

    let ids = store.search_candidates(6_000).unwrap();
    assert_eq!(ids, vec![10, 9, 8, 7, 6]);
}

#[test]
fn views_accumulate() {
    let store = Store::open_in_memory().unwrap();
    seed(&store, 3);

    store.add_views(&[1, 3]).unwrap();
    store.add_views(&[3]).unwrap();

    assert_eq!(store.get_message(1).unwrap().unwrap().views, 1);
    assert_eq!(store.get_message(2).unwrap().unwrap().views, 0);
    assert_eq!(store.get_message(3).unwrap().unwrap().views, 2);
}

#[test]
fn users_list_round_trips() {
    let store = Store::open_in_memory().unwrap();
    assert!(store.get_users().unwrap().is_empty());

    let users = vec![UserEntry {
        email: "mod@example.org".into(),
        public_name: "Mod".into(),
        privileges: Privileges {
            moderator: true,
            writer: true,
            ..Default::default()
        },
        ..Default::default()
    }];
    store.set_users(&users).unwrap();

    let loaded = store.get_users().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].privileges.moderator);
    assert!(!loaded[0].privileges.admin);
}
