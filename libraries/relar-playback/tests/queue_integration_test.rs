//! Queue sequencing integration tests
//!
//! Real-world scenarios: starting an album from the middle, next/previous
//! buttons under each play mode, shuffling mid-album, editing the queue
//! while a track plays.

mod common;

use common::{album, create_tracks};
use relar_playback::{
    PlayMode, PlaybackError, QueueManager, QueueState, RemovalOutcome, ShuffleIndex,
};

fn current_id(queue: &QueueManager) -> Option<String> {
    queue.current().map(|track| track.id.clone())
}

fn next_id(queue: &QueueManager) -> Option<String> {
    queue.peek_next().map(|track| track.id.clone())
}

fn abc_queue(mode: PlayMode, start: usize) -> QueueManager {
    let mut queue = QueueManager::new();
    queue.set_play_mode(mode);
    queue
        .set_queue(create_tracks(&["A", "B", "C"]), album(), Some(start))
        .unwrap();
    queue
}

// ===== Play Mode Traversal =====

#[test]
fn test_mode_none_stops_after_last_track() {
    let queue = abc_queue(PlayMode::Off, 2);
    assert_eq!(current_id(&queue).as_deref(), Some("C"));
    assert!(queue.peek_next().is_none());
}

#[test]
fn test_mode_repeat_wraps_to_first_track() {
    let queue = abc_queue(PlayMode::Repeat, 2);
    assert_eq!(next_id(&queue).as_deref(), Some("A"));
}

#[test]
fn test_mode_repeat_one_replays_current() {
    let mut queue = abc_queue(PlayMode::RepeatOne, 1);
    assert_eq!(next_id(&queue).as_deref(), Some("B"));
    assert_eq!(
        queue.peek_previous().map(|track| track.id.as_str()),
        Some("B")
    );

    queue.advance().unwrap();
    assert_eq!(current_id(&queue).as_deref(), Some("B"));
}

#[test]
fn test_previous_wraps_from_first_track() {
    let mut queue = abc_queue(PlayMode::Off, 0);
    assert_eq!(queue.retreat().unwrap().unwrap().id, "C");
}

#[test]
fn test_cycle_play_mode_returns_to_none() {
    let mut queue = QueueManager::new();
    assert_eq!(queue.cycle_play_mode(), PlayMode::Repeat);
    assert_eq!(queue.cycle_play_mode(), PlayMode::RepeatOne);
    assert_eq!(queue.cycle_play_mode(), PlayMode::Off);
}

#[test]
fn test_listen_through_album_then_restart() {
    let mut queue = abc_queue(PlayMode::Off, 0);

    let mut heard = vec![current_id(&queue).unwrap()];
    while let Some(track) = queue.advance().unwrap() {
        heard.push(track.id);
    }
    assert_eq!(heard, vec!["A", "B", "C"]);
    assert_eq!(queue.state(), QueueState::IdleAtEnd);

    // Pressing play again starts from the top
    assert_eq!(queue.advance().unwrap().unwrap().id, "A");
}

// ===== Shuffle =====

#[test]
fn test_shuffle_on_keeps_current_track_first() {
    let mut queue = abc_queue(PlayMode::Off, 1);

    queue.set_shuffle(true).unwrap();

    assert_eq!(queue.current_position(), Some(0));
    assert_eq!(current_id(&queue).as_deref(), Some("B"));
    assert_eq!(queue.shuffle_index().unwrap().to_shuffled(1), Some(0));
    assert_eq!(queue.state(), QueueState::Active);
}

#[test]
fn test_shuffle_plays_every_track_once() {
    let ids: Vec<String> = (0..25).map(|i| format!("song-{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let mut queue = QueueManager::with_settings(true, PlayMode::Off);
    queue
        .set_queue(create_tracks(&id_refs), album(), Some(7))
        .unwrap();

    let mut heard = vec![current_id(&queue).unwrap()];
    while let Some(track) = queue.advance().unwrap() {
        heard.push(track.id);
    }

    assert_eq!(heard[0], "song-7");
    heard.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(heard, expected);
}

#[test]
fn test_shuffle_on_empty_queue_is_allowed() {
    let mut queue = QueueManager::new();
    queue.set_shuffle(true).unwrap();

    assert!(queue.is_shuffled());
    assert!(queue.shuffle_index().unwrap().is_empty());
    assert_eq!(queue.state(), QueueState::Empty);
}

#[test]
fn test_shuffle_while_idle_at_end_keeps_idle() {
    let mut queue = abc_queue(PlayMode::Off, 2);
    queue.advance().unwrap();
    assert_eq!(queue.state(), QueueState::IdleAtEnd);

    queue.set_shuffle(true).unwrap();
    assert_eq!(queue.state(), QueueState::IdleAtEnd);
    assert!(queue.current().is_none());
    assert_eq!(queue.effective_order().len(), 3);
}

// ===== Removal =====

#[test]
fn test_remove_from_shuffled_queue_keeps_shuffled_order() {
    let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let mut queue = QueueManager::with_settings(true, PlayMode::Off);
    queue
        .set_queue(create_tracks(&id_refs), album(), Some(0))
        .unwrap();

    let mut expected = queue.summary().order;
    let position = queue.shuffle_index().unwrap().to_shuffled(5).unwrap();
    expected.remove(position);

    let removed = queue.remove_track(5).unwrap();
    assert_eq!(removed.track.id, "5");
    assert_eq!(queue.summary().order, expected);
    assert_eq!(current_id(&queue).as_deref(), Some("0"));
}

#[test]
fn test_shuffle_index_worked_example() {
    let mut index =
        ShuffleIndex::from_original_order(vec![0, 1, 2, 3, 5, 4, 6, 7, 8, 9]).unwrap();

    assert_eq!(index.remove_original_index(5).unwrap(), 4);
    assert_eq!(index.original_indices(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(index.shuffled_positions(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_remove_current_track_plays_following_track() {
    let mut queue = abc_queue(PlayMode::Off, 0);

    let removal = queue.remove_at(0).unwrap();
    assert_eq!(removal.track.id, "A");
    match removal.outcome {
        RemovalOutcome::Replaced(track) => assert_eq!(track.id, "B"),
        other => panic!("expected replacement, got {:?}", other),
    }
    assert_eq!(queue.current_position(), Some(0));
}

#[test]
fn test_remove_after_current_keeps_position() {
    let mut queue = abc_queue(PlayMode::Off, 0);

    let removal = queue.remove_track(2).unwrap();
    assert_eq!(removal.outcome, RemovalOutcome::Unaffected);
    assert_eq!(current_id(&queue).as_deref(), Some("A"));
    assert_eq!(next_id(&queue).as_deref(), Some("B"));
}

#[test]
fn test_remove_while_idle_at_end() {
    let mut queue = abc_queue(PlayMode::Off, 2);
    queue.advance().unwrap();

    let removal = queue.remove_track(0).unwrap();
    assert_eq!(removal.outcome, RemovalOutcome::Unaffected);
    assert_eq!(queue.state(), QueueState::IdleAtEnd);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_remove_from_empty_queue_is_an_error() {
    let mut queue = QueueManager::new();
    assert_eq!(
        queue.remove_track(0).unwrap_err(),
        PlaybackError::EmptyQueueOperation("remove a track")
    );
}

// ===== Enqueue & Clear =====

#[test]
fn test_enqueue_extends_upcoming_tracks() {
    let mut queue = abc_queue(PlayMode::Off, 2);
    assert!(queue.peek_next().is_none());

    queue.enqueue(common::create_track("D"));
    assert_eq!(next_id(&queue).as_deref(), Some("D"));
}

#[test]
fn test_clear_then_set_queue_again() {
    let mut queue = abc_queue(PlayMode::Repeat, 1);
    queue.clear();
    assert!(queue.summary().is_empty());
    assert!(queue.advance().is_err());

    queue
        .set_queue(create_tracks(&["X", "Y"]), album(), None)
        .unwrap();
    assert_eq!(current_id(&queue).as_deref(), Some("X"));
    assert_eq!(queue.play_mode(), PlayMode::Repeat);
}
