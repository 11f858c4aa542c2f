#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use serde_json::json;

use common::Harness;
use outings_core::protocol::ServerEvent;
use outings_core::RoomKey;
use outings_gateway::config::{GatewayConfig, SenderPolicy};
use outings_gateway::infra::{InMemoryMessageStore, MessageStore};
use outings_gateway::services::Handshake;
use outings_gateway::session::Phase;

fn presence_of(events: &[ServerEvent]) -> Vec<(String, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Presence(p) => Some((p.user_id.clone(), p.online)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn direct_message_reaches_both_parties_once() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;
    u1.drain();

    u1.emit("send_message", json!({ "text": "hi", "recipientId": "u2" })).await;

    let mine = u1.received_messages();
    let theirs = u2.received_messages();
    assert_eq!(mine.len(), 1);
    assert_eq!(theirs.len(), 1);
    assert_eq!(mine[0].id, theirs[0].id);
    assert_eq!(theirs[0].sender_id, "u1");
    assert_eq!(theirs[0].recipient_id.as_deref(), Some("u2"));
    assert_eq!(theirs[0].message_type, "text");
    assert!(!theirs[0].is_read);
    assert!(h.push.sent().is_empty(), "online recipient gets no push");
}

#[tokio::test]
async fn offline_recipient_with_token_gets_push() {
    let h = Harness::new();
    h.tokens.set("u2", "tok-u2");
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "text": "hi", "recipientId": "u2" })).await;

    assert_eq!(u1.received_messages().len(), 1);
    let sent = h.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "tok-u2");
    assert_eq!(sent[0].notification.title, "New message");
    assert_eq!(sent[0].notification.body, "hi");
    assert_eq!(sent[0].data.sender_id, "u1");
    assert_eq!(sent[0].data.recipient_id, "u2");
    assert_eq!(sent[0].data.group_id, "");
    assert_eq!(sent[0].data.media_url, "");
    assert_eq!(h.app.metrics().push.get(&[("result", "sent")]), 1);
}

#[tokio::test]
async fn offline_recipient_without_token_gets_nothing() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "recipientId": "u2", "messageType": "image", "mediaUrl": "https://cdn/x.png" })).await;

    let mine = u1.received_messages();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].message_type, "image");
    assert!(h.push.sent().is_empty());
    assert_eq!(h.app.metrics().push.get(&[("result", "no_token")]), 1);
}

#[tokio::test]
async fn push_failure_does_not_affect_delivery() {
    let h = Harness::new();
    h.tokens.set("u2", "tok-u2");
    h.push.set_failing(true);
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "text": "hi", "recipientId": "u2" })).await;

    assert_eq!(u1.received_messages().len(), 1);
    assert_eq!(h.messages.len(), 1);
    assert_eq!(h.app.metrics().push.get(&[("result", "error")]), 1);
    assert_eq!(u1.session.phase(), Phase::Connected);
}

#[tokio::test]
async fn empty_body_push_uses_placeholder_text() {
    let h = Harness::new();
    h.tokens.set("u2", "tok-u2");
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "recipientId": "u2", "messageType": "file", "fileName": "plan.pdf", "fileSize": 2048 })).await;

    let sent = h.push.sent();
    assert_eq!(sent[0].notification.body, "You have a new message");
    assert_eq!(sent[0].data.message_type, "file");
}

#[tokio::test]
async fn group_message_fans_out_once_per_connection_without_push() {
    let h = Harness::new();
    for u in ["u1", "u2", "u3"] {
        h.memberships.add(u, "g1");
    }
    h.tokens.set("u3", "tok-u3");

    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;
    u1.drain();

    u1.emit("send_message", json!({ "text": "hey all", "groupId": "g1" })).await;

    let mine = u1.received_messages();
    let theirs = u2.received_messages();
    assert_eq!(mine.len(), 1, "sender is in group:g1 and user:u1 but sees one copy");
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].group_id.as_deref(), Some("g1"));
    assert!(theirs[0].recipient_id.is_none());
    assert!(h.push.sent().is_empty(), "group messages never push");
}

#[tokio::test]
async fn sender_other_device_sees_group_message_without_group_room() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    let mut phone = h.connect(Some("u1")).await;
    let mut laptop = h.connect(Some("u1")).await;
    laptop.emit("leave_group", json!({ "groupId": "g1" })).await;
    phone.drain();

    phone.emit("send_message", json!({ "text": "hey", "groupId": "g1" })).await;

    assert_eq!(laptop.received_messages().len(), 1);
}

#[tokio::test]
async fn recipient_wins_when_both_targets_are_set() {
    let h = Harness::new();
    h.memberships.add("u3", "g1");
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;
    let mut u3 = h.connect(Some("u3")).await;
    u1.drain();
    u2.drain();

    u1.emit("send_message", json!({ "text": "x", "recipientId": "u2", "groupId": "g1" })).await;

    let got = u2.received_messages();
    assert_eq!(got.len(), 1);
    assert!(got[0].group_id.is_none());
    assert!(u3.received_messages().is_empty());
}

#[tokio::test]
async fn send_without_target_is_silently_dropped() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "text": "lost" })).await;

    assert!(u1.drain().is_empty(), "no error event either");
    assert!(h.messages.is_empty());
}

#[tokio::test]
async fn persistence_failure_means_no_fanout() {
    let store = InMemoryMessageStore::new();
    store.set_unavailable(true);
    let h = Harness::with_message_store(store);
    h.tokens.set("u2", "tok-u2");
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "text": "hi", "recipientId": "u2" })).await;

    assert!(u1.received_messages().is_empty());
    assert!(h.push.sent().is_empty());
    assert_eq!(u1.session.phase(), Phase::Connected);
}

#[tokio::test]
async fn refresh_groups_is_idempotent() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    let mut u1 = h.connect(Some("u1")).await;
    let conn = u1.session.connection_id().clone();

    u1.emit("refresh_groups", json!(null)).await;
    u1.emit("refresh_groups", json!(null)).await;

    assert_eq!(h.app.rooms().group_rooms_of(&conn), vec![RoomKey::group("g1")]);
}

#[tokio::test]
async fn refresh_restores_left_group_and_picks_up_new_ones() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    let mut u1 = h.connect(Some("u1")).await;
    let conn = u1.session.connection_id().clone();

    u1.emit("leave_group", json!({ "groupId": "g1" })).await;
    assert!(h.app.rooms().group_rooms_of(&conn).is_empty());

    h.memberships.add("u1", "g2");
    u1.emit("refresh_groups", json!({})).await;

    assert_eq!(
        h.app.rooms().group_rooms_of(&conn),
        vec![RoomKey::group("g1"), RoomKey::group("g2")]
    );
}

#[tokio::test]
async fn refresh_drops_groups_the_user_left() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    h.memberships.add("u1", "g2");
    let mut u1 = h.connect(Some("u1")).await;
    let conn = u1.session.connection_id().clone();

    h.memberships.remove("u1", "g2");
    u1.emit("refresh_groups", json!(null)).await;

    assert_eq!(h.app.rooms().group_rooms_of(&conn), vec![RoomKey::group("g1")]);
}

#[tokio::test]
async fn refresh_keeps_rooms_when_membership_store_fails() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    let mut u1 = h.connect(Some("u1")).await;
    let conn = u1.session.connection_id().clone();

    h.memberships.set_unavailable(true);
    u1.emit("refresh_groups", json!(null)).await;

    assert_eq!(h.app.rooms().group_rooms_of(&conn), vec![RoomKey::group("g1")]);
    assert!(u1.drain().is_empty(), "store failures are not reported to the client");

    let mut u2 = h.connect(Some("u2")).await;
    u1.drain();
    u2.emit("send_message", json!({ "text": "still here", "groupId": "g1" })).await;
    assert_eq!(u1.received_messages().len(), 1);
}

#[tokio::test]
async fn join_group_subscribes_to_new_group_traffic() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    let mut u3 = h.connect(Some("u3")).await;

    u1.emit("join_group", json!({ "groupId": "g2" })).await;
    u1.drain();
    u3.emit("send_message", json!({ "text": "welcome", "groupId": "g2" })).await;

    assert_eq!(u1.received_messages().len(), 1);
}

#[tokio::test]
async fn anonymous_connection_joins_nothing() {
    let h = Harness::new();
    let mut anon = h.connect(None).await;
    let conn = anon.session.connection_id().clone();

    anon.emit("join_group", json!({ "groupId": "g1" })).await;
    anon.emit("refresh_groups", json!(null)).await;

    assert!(h.app.realtime().rooms.rooms_of(&conn).is_empty());
}

#[tokio::test]
async fn anonymous_send_uses_client_sender_id_and_persists() {
    let h = Harness::new();
    h.memberships.add("u2", "g1");
    let mut u2 = h.connect(Some("u2")).await;
    let mut anon = h.connect(None).await;

    anon.emit("send_message", json!({ "text": "from the void", "senderId": "u9", "groupId": "g1" })).await;

    let got = u2.received_messages();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].sender_id, "u9");
    assert_eq!(h.messages.len(), 1);
    assert!(anon.received_messages().is_empty(), "anonymous connections are in no rooms");
}

#[tokio::test]
async fn identity_wins_over_claimed_sender_by_default() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("send_message", json!({ "text": "x", "senderId": "mallory", "recipientId": "u2" })).await;

    let got = u1.received_messages();
    assert_eq!(got[0].sender_id, "u1");
}

#[tokio::test]
async fn client_sender_policy_trusts_claimed_sender() {
    let mut cfg = GatewayConfig::default();
    cfg.messaging.sender_policy = SenderPolicy::Client;
    let h = Harness::with_config(cfg);
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;

    u1.emit("send_message", json!({ "text": "x", "senderId": "u7", "recipientId": "u2" })).await;

    let got = u2.received_messages();
    assert_eq!(got[0].sender_id, "u7");
}

#[tokio::test]
async fn read_receipt_round_trip() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;
    u1.drain();

    u1.emit("send_message", json!({ "text": "hi", "recipientId": "u2" })).await;
    let msg = u2.received_messages().remove(0);
    u1.drain();

    u2.emit("read_message", json!({ "messageId": msg.id })).await;

    let stored = h.messages.get(&msg.id).await.unwrap().unwrap();
    assert!(stored.is_read);
    assert!(stored.read_at.is_some());

    let receipts: Vec<_> = u1
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::MessageRead(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].message_id, msg.id);
    assert_eq!(receipts[0].reader_id, "u2");
}

#[tokio::test]
async fn read_falls_back_to_flag_only_store() {
    let h = Harness::with_message_store(InMemoryMessageStore::without_read_at());
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;

    u1.emit("send_message", json!({ "text": "hi", "recipientId": "u2" })).await;
    let msg = u2.received_messages().remove(0);

    u2.emit("read_message", json!({ "messageId": msg.id })).await;

    let stored = h.messages.get(&msg.id).await.unwrap().unwrap();
    assert!(stored.is_read);
    assert!(stored.read_at.is_none());
}

#[tokio::test]
async fn non_participant_read_is_rejected() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    let mut u3 = h.connect(Some("u3")).await;

    u1.emit("send_message", json!({ "text": "private", "recipientId": "u2" })).await;
    let msg = u1.received_messages().remove(0);
    u3.drain();

    u3.emit("read_message", json!({ "messageId": msg.id })).await;

    let errors: Vec<_> = u3
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::Error(err) => Some(err.code),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec!["NOT_ALLOWED".to_string()]);
    let stored = h.messages.get(&msg.id).await.unwrap().unwrap();
    assert!(!stored.is_read);
}

#[tokio::test]
async fn reading_unknown_message_reports_not_found() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("read_message", json!({ "messageId": "nope" })).await;

    let events = u1.drain();
    assert!(matches!(&events[..], [ServerEvent::Error(e)] if e.code == "NOT_FOUND"));
}

#[tokio::test]
async fn group_read_receipt_goes_to_group_room() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    h.memberships.add("u2", "g1");
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;

    u1.emit("send_message", json!({ "text": "yo", "groupId": "g1" })).await;
    let msg = u2.received_messages().remove(0);
    u1.drain();

    u2.emit("read_message", json!({ "messageId": msg.id })).await;

    assert!(u1
        .drain()
        .iter()
        .any(|e| matches!(e, ServerEvent::MessageRead(r) if r.reader_id == "u2")));
}

#[tokio::test]
async fn presence_flips_only_on_first_and_last_connection() {
    let h = Harness::new();
    let mut observer = h.connect(Some("u0")).await;

    let mut a = h.connect(Some("u1")).await;
    assert_eq!(presence_of(&observer.drain()), vec![("u1".to_string(), true)]);

    let mut b = h.connect(Some("u1")).await;
    assert!(presence_of(&observer.drain()).is_empty());

    a.close().await;
    assert!(presence_of(&observer.drain()).is_empty());
    assert!(h.app.presence().is_online("u1").await.unwrap());

    b.close().await;
    assert_eq!(presence_of(&observer.drain()), vec![("u1".to_string(), false)]);
    assert!(!h.app.presence().is_online("u1").await.unwrap());
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let h = Harness::new();
    let mut observer = h.connect(Some("u0")).await;
    let mut u1 = h.connect(Some("u1")).await;
    observer.drain();

    u1.close().await;
    u1.close().await;

    assert_eq!(u1.session.phase(), Phase::Disconnected);
    assert_eq!(presence_of(&observer.drain()), vec![("u1".to_string(), false)]);
    assert_eq!(h.app.metrics().sessions_active.get(&[]), 1);
}

#[tokio::test]
async fn events_after_disconnect_are_ignored() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    u1.close().await;

    u1.emit("send_message", json!({ "text": "late", "recipientId": "u2" })).await;

    assert!(h.messages.is_empty());
}

#[tokio::test]
async fn presence_query_answers_requester_only() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    let mut bystander = h.connect(Some("u5")).await;
    u1.drain();

    u1.emit("presence_query", json!({ "peerUserId": "u2" })).await;
    assert_eq!(presence_of(&u1.drain()), vec![("u2".to_string(), false)]);
    assert!(bystander.drain().is_empty());

    let _u2 = h.connect(Some("u2")).await;
    u1.drain();
    u1.emit("presence_query", json!({ "peerUserId": "u2" })).await;
    assert_eq!(presence_of(&u1.drain()), vec![("u2".to_string(), true)]);
}

#[tokio::test]
async fn typing_goes_to_recipient_room_only() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;
    let mut u3 = h.connect(Some("u3")).await;
    u1.drain();
    u2.drain();

    u1.emit("typing", json!({ "isTyping": true, "recipientId": "u2" })).await;

    let events = u2.drain();
    assert!(matches!(
        &events[..],
        [ServerEvent::Typing(t)] if t.is_typing && t.user_id.as_deref() == Some("u1") && t.group_id.is_none()
    ));
    assert!(u1.drain().is_empty());
    assert!(u3.drain().is_empty());
}

#[tokio::test]
async fn group_typing_carries_group_id() {
    let h = Harness::new();
    h.memberships.add("u1", "g1");
    h.memberships.add("u2", "g1");
    let mut u1 = h.connect(Some("u1")).await;
    let mut u2 = h.connect(Some("u2")).await;
    u2.drain();

    u1.emit("typing", json!({ "isTyping": false, "groupId": "g1" })).await;

    let events = u2.drain();
    assert!(matches!(
        &events[..],
        [ServerEvent::Typing(t)] if !t.is_typing && t.group_id.as_deref() == Some("g1")
    ));
}

#[tokio::test]
async fn typing_without_target_is_a_no_op() {
    let h = Harness::new();
    let mut u1 = h.connect(Some("u1")).await;

    u1.emit("typing", json!({ "isTyping": true })).await;

    assert!(u1.drain().is_empty());
}

#[tokio::test]
async fn query_parameter_identity_is_used_without_auth_field() {
    let h = Harness::new();
    let handshake = Handshake {
        auth_user_id: Some("   ".into()),
        query_user_id: Some(" u4 ".into()),
    };
    let u4 = h.connect_with(&handshake).await;

    assert_eq!(u4.session.user_id(), Some("u4"));
    assert!(h.app.presence().is_online("u4").await.unwrap());
}
