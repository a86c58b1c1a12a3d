//! Vote persistence tests: upsert semantics, round scoping, and the
//! all-voters-voted predicate behind auto-reveal.

mod common;

use common::{create_room, join, test_pool};
use poker_db::models::participant::ParticipantRole;
use poker_db::repositories::{ParticipantRepo, RoundRepo, VoteRepo};

// ---------------------------------------------------------------------------
// Upsert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn revote_overwrites_previous_value() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "3")
        .await
        .unwrap();
    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "8")
        .await
        .unwrap();

    let votes = VoteRepo::list_current_for_room(&pool, &room.id)
        .await
        .unwrap();
    assert_eq!(votes.len(), 1, "exactly one vote per participant per round");
    assert_eq!(votes[0].value, "8");
    assert_eq!(votes[0].participant_id, alice.id);
}

#[tokio::test]
async fn vote_without_current_round_is_rejected() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;

    sqlx::query("UPDATE rooms SET current_round_id = NULL WHERE id = ?")
        .bind(&room.id)
        .execute(&pool)
        .await
        .unwrap();

    let written = VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    assert!(!written);
}

// ---------------------------------------------------------------------------
// Round scoping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn current_votes_exclude_previous_rounds() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();
    RoundRepo::complete_and_advance(&pool, &room.id).await.unwrap();

    assert!(VoteRepo::list_current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .is_empty());

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "13")
        .await
        .unwrap();
    let votes = VoteRepo::list_current_for_room(&pool, &room.id)
        .await
        .unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].value, "13");
}

// ---------------------------------------------------------------------------
// All-voters-voted predicate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_voted_false_with_no_voters() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;

    assert!(!VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());

    // A spectator alone does not make the predicate true.
    join(&pool, &room.id, "Watcher", ParticipantRole::Spectator).await;
    assert!(!VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn all_voted_tracks_partial_and_complete_votes() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;
    let bob = join(&pool, &room.id, "Bob", ParticipantRole::Voter).await;

    assert!(!VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    assert!(!VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());

    VoteRepo::upsert_current(&pool, &room.id, &bob.id, "8")
        .await
        .unwrap();
    assert!(VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn spectators_do_not_block_all_voted() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;
    join(&pool, &room.id, "Watcher", ParticipantRole::Spectator).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    assert!(VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn late_joiner_invalidates_all_voted() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    assert!(VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());

    join(&pool, &room.id, "Bob", ParticipantRole::Voter).await;
    assert!(!VoteRepo::have_all_voters_voted(&pool, &room.id)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Session lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_lookup_is_room_scoped() {
    let pool = test_pool().await;
    let room_a = create_room(&pool, "A").await;
    let room_b = create_room(&pool, "B").await;
    let alice = join(&pool, &room_a.id, "Alice", ParticipantRole::Voter).await;

    let found = ParticipantRepo::find_by_session(&pool, &room_a.id, &alice.session_token)
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(alice.id.clone()));

    let missing = ParticipantRepo::find_by_session(&pool, &room_b.id, &alice.session_token)
        .await
        .unwrap();
    assert!(missing.is_none());
}
