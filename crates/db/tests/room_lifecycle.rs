//! Room and round lifecycle tests: creation, reveal, reset, completion,
//! consensus streaks, and expiry cleanup.

mod common;

use chrono::Utc;
use common::{create_room, join, test_pool};
use poker_db::models::participant::ParticipantRole;
use poker_db::models::round::RoundState;
use poker_db::repositories::{ParticipantRepo, RoomRepo, RoundRepo, VoteRepo};

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_room_attaches_round_one() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;

    assert_eq!(room.name, "Sprint");
    assert!(room.current_round_id.is_some());
    assert_eq!(room.consecutive_consensus_rounds, 0);
    assert!(room.expires_at > Utc::now());

    let round = RoundRepo::current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .expect("room has a current round");
    assert_eq!(round.round_number, 1);
    assert_eq!(round.state, RoundState::Voting);
    assert_eq!(round.room_id, room.id);
}

#[tokio::test]
async fn first_participant_becomes_creator() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;

    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;
    let bob = join(&pool, &room.id, "Bob", ParticipantRole::Voter).await;

    let room = RoomRepo::find(&pool, &room.id).await.unwrap().unwrap();
    assert_eq!(room.creator_participant_id.as_deref(), Some(alice.id.as_str()));
    assert!(room.is_creator(&alice.id));
    assert!(!room.is_creator(&bob.id));
    assert!(RoomRepo::is_creator(&pool, &room.id, &alice.id).await.unwrap());
    assert!(!RoomRepo::is_creator(&pool, &room.id, &bob.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Reveal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reveal_transitions_voting_to_revealed_once() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;

    assert!(RoundRepo::reveal_current(&pool, &room.id).await.unwrap());
    let round = RoundRepo::current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(round.state, RoundState::Revealed);

    // A second reveal finds no round in `voting` and reports no transition.
    assert!(!RoundRepo::reveal_current(&pool, &room.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_clears_votes_and_returns_to_voting() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();

    assert!(RoundRepo::reset_current(&pool, &room.id).await.unwrap());

    let round = RoundRepo::current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(round.state, RoundState::Voting);
    assert_eq!(round.round_number, 1, "reset must not advance the round");
    assert!(VoteRepo::list_current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .is_empty());

    // Reset is idempotent in observable state.
    assert!(RoundRepo::reset_current(&pool, &room.id).await.unwrap());
    let round_again = RoundRepo::current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(round_again.state, RoundState::Voting);
    assert_eq!(round_again.round_number, 1);
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn complete_and_advance_computes_stats_and_opens_next_round() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;
    let bob = join(&pool, &room.id, "Bob", ParticipantRole::Voter).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    VoteRepo::upsert_current(&pool, &room.id, &bob.id, "8")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();

    let next = RoundRepo::complete_and_advance(&pool, &room.id)
        .await
        .unwrap();
    assert_eq!(next.round_number, 2);
    assert_eq!(next.state, RoundState::Voting);

    let room = RoomRepo::find(&pool, &room.id).await.unwrap().unwrap();
    assert_eq!(room.current_round_id.as_deref(), Some(next.id.as_str()));
    assert_eq!(room.consecutive_consensus_rounds, 0);

    // The new round has no votes yet.
    assert!(VoteRepo::list_current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn complete_requires_revealed_state() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;

    let err = RoundRepo::complete_and_advance(&pool, &room.id)
        .await
        .unwrap_err();
    assert!(matches!(err, sqlx::Error::RowNotFound));

    // Still on round 1, still voting.
    let round = RoundRepo::current_for_room(&pool, &room.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(round.round_number, 1);
    assert_eq!(round.state, RoundState::Voting);
}

#[tokio::test]
async fn consensus_streak_increments_and_resets() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;
    let bob = join(&pool, &room.id, "Bob", ParticipantRole::Voter).await;

    // Round 1: both vote "5" -> consensus, streak 1.
    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    VoteRepo::upsert_current(&pool, &room.id, &bob.id, "5")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();
    RoundRepo::complete_and_advance(&pool, &room.id).await.unwrap();

    let room_row = RoomRepo::find(&pool, &room.id).await.unwrap().unwrap();
    assert_eq!(room_row.consecutive_consensus_rounds, 1);

    // Round 2: both vote "5" again -> streak 2.
    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    VoteRepo::upsert_current(&pool, &room.id, &bob.id, "5")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();
    RoundRepo::complete_and_advance(&pool, &room.id).await.unwrap();

    let room_row = RoomRepo::find(&pool, &room.id).await.unwrap().unwrap();
    assert_eq!(room_row.consecutive_consensus_rounds, 2);

    // Round 3: split vote -> streak resets to 0.
    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    VoteRepo::upsert_current(&pool, &room.id, &bob.id, "8")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();
    let completed = RoundRepo::complete_and_advance(&pool, &room.id)
        .await
        .unwrap();

    let room_row = RoomRepo::find(&pool, &room.id).await.unwrap().unwrap();
    assert_eq!(room_row.consecutive_consensus_rounds, 0);
    assert_eq!(completed.round_number, 4);
}

#[tokio::test]
async fn completed_round_stores_average_and_consensus() {
    let pool = test_pool().await;
    let room = create_room(&pool, "Sprint").await;
    let alice = join(&pool, &room.id, "Alice", ParticipantRole::Voter).await;
    let bob = join(&pool, &room.id, "Bob", ParticipantRole::Voter).await;

    VoteRepo::upsert_current(&pool, &room.id, &alice.id, "5")
        .await
        .unwrap();
    VoteRepo::upsert_current(&pool, &room.id, &bob.id, "8")
        .await
        .unwrap();
    RoundRepo::reveal_current(&pool, &room.id).await.unwrap();
    RoundRepo::complete_and_advance(&pool, &room.id).await.unwrap();

    // Inspect the completed round directly.
    let (state, average, total, consensus): (String, Option<f64>, i64, bool) = sqlx::query_as(
        "SELECT state, average_score, total_votes, consensus FROM rounds
         WHERE room_id = ? AND round_number = 1",
    )
    .bind(&room.id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(state, "completed");
    assert_eq!(average, Some(6.5));
    assert_eq!(total, 2);
    assert!(!consensus);
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_expired_cascades() {
    let pool = test_pool().await;
    let expired = create_room(&pool, "Old").await;
    let fresh = create_room(&pool, "New").await;
    let alice = join(&pool, &expired.id, "Alice", ParticipantRole::Voter).await;
    VoteRepo::upsert_current(&pool, &expired.id, &alice.id, "5")
        .await
        .unwrap();

    // Push the first room past its expiry.
    sqlx::query("UPDATE rooms SET expires_at = ? WHERE id = ?")
        .bind(Utc::now() - chrono::Duration::hours(1))
        .bind(&expired.id)
        .execute(&pool)
        .await
        .unwrap();

    let deleted = RoomRepo::delete_expired(&pool).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(RoomRepo::find(&pool, &expired.id).await.unwrap().is_none());
    assert!(RoomRepo::find(&pool, &fresh.id).await.unwrap().is_some());

    // Participants, rounds, and votes of the expired room are gone.
    assert!(ParticipantRepo::find(&pool, &alice.id)
        .await
        .unwrap()
        .is_none());
    let (rounds, votes): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM rounds WHERE room_id = ?1),
                (SELECT COUNT(*) FROM votes WHERE room_id = ?1)",
    )
    .bind(&expired.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((rounds, votes), (0, 0));
}
