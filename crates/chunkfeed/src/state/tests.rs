use super::*;
use crate::{CollectionParams, DatasetError, Error, LoadStatus, SubscriptionTarget};

type State = CollectionState<&'static str, u32>;
type Fx = Vec<Effect<&'static str, u32>>;

const PARAMS: CollectionParams<&'static str> = CollectionParams::new("forward", "reverse", 3);

fn watch_ticket(effects: &Fx) -> Ticket {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Watch { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .unwrap()
}

fn resolve_ticket(effects: &Fx) -> Ticket {
    match effects.as_slice() {
        [Effect::Resolve { ticket, .. }] => *ticket,
        other => panic!("expected a single resolve, got {other:?}"),
    }
}

fn open_chunk(effects: &Fx) -> (usize, Ticket) {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::OpenChunk { index, ticket, .. } => Some((*index, *ticket)),
            _ => None,
        })
        .unwrap()
}

/// Drives a page load to completion: resolves `boundary`, attaches the chunk
/// and delivers `snapshot`. Returns the probe ticket issued for the new
/// boundary.
fn complete_page(state: &mut State, resolve: Ticket, boundary: u32, snapshot: Vec<u32>) -> Ticket {
    let effects = state.reduce(Event::Resolved {
        ticket: resolve,
        result: Ok(Some(boundary)),
    });
    let (index, ticket) = open_chunk(&effects);
    state.reduce(Event::Attached { index, ticket });
    state.reduce(Event::ChunkSnapshot {
        index,
        ticket,
        result: Ok(snapshot),
    });
    watch_ticket(&effects)
}

/// A state with one page `[1, 2, 3]` loaded and the probe reporting more.
fn one_page() -> (State, Ticket) {
    let (mut state, effects) = State::initialize(PARAMS);
    let effects = state.reduce(Event::Availability {
        ticket: watch_ticket(&effects),
        result: Ok(true),
    });
    let probe = complete_page(&mut state, resolve_ticket(&effects), 3, vec![3, 2, 1]);
    state.reduce(Event::Availability {
        ticket: probe,
        result: Ok(true),
    });
    (state, probe)
}

#[test]
fn starts_by_probing_the_whole_dataset() {
    let (state, effects) = State::initialize(PARAMS);

    assert_eq!(
        effects,
        [Effect::Watch {
            ticket: Ticket(0),
            forward: "forward",
            after: None,
        }]
    );
    assert_eq!(state.status(), LoadStatus::Idle);
    assert!(state.docs().is_empty());
    assert!(!state.has_more());
    assert!(state.error().is_none());
}

#[test]
fn first_document_bootstraps_the_first_page() {
    let (mut state, effects) = State::initialize(PARAMS);
    let probe = watch_ticket(&effects);

    assert!(
        state
            .reduce(Event::Availability {
                ticket: probe,
                result: Ok(false),
            })
            .is_empty()
    );
    assert_eq!(state.status(), LoadStatus::Idle);

    let effects = state.reduce(Event::Availability {
        ticket: probe,
        result: Ok(true),
    });
    assert_eq!(
        effects,
        [Effect::Resolve {
            ticket: Ticket(1),
            forward: "forward",
            after: None,
            size: 3,
        }]
    );
    assert_eq!(state.status(), LoadStatus::LoadingFirst);

    let effects = state.reduce(Event::Resolved {
        ticket: Ticket(1),
        result: Ok(Some(3)),
    });
    assert_eq!(
        effects,
        [
            Effect::OpenChunk {
                index: 0,
                ticket: Ticket(2),
                reverse: "reverse",
                range: ChunkRange::new(None, 3),
            },
            Effect::Watch {
                ticket: Ticket(3),
                forward: "forward",
                after: Some(3),
            },
        ]
    );
    assert_eq!(state.status(), LoadStatus::Idle);
    assert_eq!(state.boundary(), Some(&3));
    assert_eq!(state.chunks().len(), 1);
    assert!(!state.chunks()[0].is_settled());
}

#[test]
fn load_more_waits_for_the_last_chunk_to_settle() {
    let (mut state, effects) = State::initialize(PARAMS);
    let effects = state.reduce(Event::Availability {
        ticket: watch_ticket(&effects),
        result: Ok(true),
    });
    let effects = state.reduce(Event::Resolved {
        ticket: resolve_ticket(&effects),
        result: Ok(Some(3)),
    });
    let (index, ticket) = open_chunk(&effects);

    // Not attached, no snapshot.
    assert!(!state.can_load_more());
    assert!(state.reduce(Event::LoadMore).is_empty());

    // Attached, still no snapshot.
    state.reduce(Event::Attached { index, ticket });
    assert!(state.chunks()[0].is_attached());
    assert!(state.reduce(Event::LoadMore).is_empty());

    state.reduce(Event::ChunkSnapshot {
        index,
        ticket,
        result: Ok(vec![3, 2, 1]),
    });
    assert!(state.can_load_more());
    assert_eq!(
        state.reduce(Event::LoadMore),
        [Effect::Resolve {
            ticket: Ticket(4),
            forward: "forward",
            after: Some(3),
            size: 3,
        }]
    );
    assert_eq!(state.status(), LoadStatus::LoadingMore);
}

#[test]
fn repeated_load_more_issues_one_fetch() {
    let (mut state, _) = one_page();

    assert_eq!(state.reduce(Event::LoadMore).len(), 1);
    assert!(state.reduce(Event::LoadMore).is_empty());
    assert!(state.reduce(Event::LoadMore).is_empty());
    assert_eq!(state.status(), LoadStatus::LoadingMore);
}

#[test]
fn pages_concatenate_in_forward_order() {
    let (mut state, _) = one_page();

    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));
    complete_page(&mut state, resolve, 6, vec![6, 5, 4]);
    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));
    let probe = complete_page(&mut state, resolve, 8, vec![8, 7]);

    assert_eq!(state.docs(), [1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(state.boundary(), Some(&8));
    assert_eq!(state.chunks()[1].range(), &ChunkRange::new(Some(3), 6));
    assert_eq!(state.chunks()[2].range(), &ChunkRange::new(Some(6), 8));
    assert_eq!(state.attached_count(), 3);

    state.reduce(Event::Availability {
        ticket: probe,
        result: Ok(false),
    });
    let view = state.view();
    assert_eq!(view.chunk_count, 3);
    assert!(!view.has_more);
    assert_eq!(view.status, LoadStatus::Idle);
}

#[test]
fn exhausted_fetch_clears_has_more() {
    let (mut state, _) = one_page();
    assert!(state.has_more());

    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));
    let effects = state.reduce(Event::Resolved {
        ticket: resolve,
        result: Ok(None),
    });

    assert!(effects.is_empty());
    assert!(!state.has_more());
    assert_eq!(state.status(), LoadStatus::Idle);
    assert_eq!(state.chunks().len(), 1);
    assert_eq!(state.boundary(), Some(&3));
}

#[test]
fn fetch_failure_is_reported_and_retryable() {
    let (mut state, _) = one_page();

    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));
    state.reduce(Event::Resolved {
        ticket: resolve,
        result: Err(DatasetError::unavailable("offline")),
    });

    assert_eq!(
        state.error(),
        Some(&Error::Fetch(DatasetError::unavailable("offline")))
    );
    assert_eq!(state.status(), LoadStatus::Idle);
    assert_eq!(state.docs(), [1, 2, 3]);

    let retry = state.reduce(Event::LoadMore);
    assert!(matches!(
        retry.as_slice(),
        [Effect::Resolve { after: Some(3), .. }]
    ));
}

#[test]
fn pushes_only_touch_their_own_chunk() {
    let (mut state, _) = one_page();
    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));
    complete_page(&mut state, resolve, 6, vec![6, 5, 4]);
    let first = state.chunks()[0].ticket();

    state.reduce(Event::ChunkSnapshot {
        index: 0,
        ticket: first,
        result: Ok(vec![3, 20, 2, 1]),
    });

    assert_eq!(state.chunks()[1].snapshot(), Some(&[6, 5, 4][..]));
    assert_eq!(state.docs(), [1, 2, 20, 3, 4, 5, 6]);
    assert_eq!(state.boundary(), Some(&6));
}

#[test]
fn subscription_failure_keeps_the_last_snapshot() {
    let (mut state, _) = one_page();
    let ticket = state.chunks()[0].ticket();

    state.reduce(Event::ChunkSnapshot {
        index: 0,
        ticket,
        result: Err(DatasetError::unavailable("stream reset")),
    });

    assert_eq!(state.docs(), [1, 2, 3]);
    assert_eq!(
        state.error(),
        Some(&Error::Subscription {
            target: SubscriptionTarget::Chunk(0),
            source: DatasetError::unavailable("stream reset"),
        })
    );
    assert!(state.can_load_more());
}

#[test]
fn failure_before_the_first_snapshot_settles_the_chunk_empty() {
    let (mut state, effects) = State::initialize(PARAMS);
    let effects = state.reduce(Event::Availability {
        ticket: watch_ticket(&effects),
        result: Ok(true),
    });
    let effects = state.reduce(Event::Resolved {
        ticket: resolve_ticket(&effects),
        result: Ok(Some(3)),
    });
    let (index, ticket) = open_chunk(&effects);
    state.reduce(Event::Attached { index, ticket });
    state.reduce(Event::ChunkSnapshot {
        index,
        ticket,
        result: Err(DatasetError::unavailable("denied")),
    });

    assert!(state.chunks()[0].is_settled());
    assert!(state.docs().is_empty());
    assert!(state.can_load_more());
}

#[test]
fn probe_failure_is_reported() {
    let (mut state, probe) = one_page();

    state.reduce(Event::Availability {
        ticket: probe,
        result: Err(DatasetError::unavailable("probe lost")),
    });

    assert!(matches!(
        state.error(),
        Some(Error::Subscription {
            target: SubscriptionTarget::Availability,
            ..
        })
    ));
    assert!(state.has_more());
}

#[test]
fn has_more_follows_the_current_probe() {
    let (mut state, probe) = one_page();

    for present in [false, true, false] {
        state.reduce(Event::Availability {
            ticket: probe,
            result: Ok(present),
        });
        assert_eq!(state.has_more(), present);
    }
}

#[test]
fn stale_tickets_are_ignored() {
    let (mut state, initial_probe) = {
        let (state, effects) = State::initialize(PARAMS);
        let probe = watch_ticket(&effects);
        (state, probe)
    };
    let effects = state.reduce(Event::Availability {
        ticket: initial_probe,
        result: Ok(true),
    });
    let resolve = resolve_ticket(&effects);
    let probe = complete_page(&mut state, resolve, 3, vec![3, 2, 1]);
    let before = state.clone();

    // The boundary-less probe was replaced.
    assert!(
        state
            .reduce(Event::Availability {
                ticket: initial_probe,
                result: Ok(true),
            })
            .is_empty()
    );
    // The fetch already completed.
    state.reduce(Event::Resolved {
        ticket: resolve,
        result: Ok(Some(99)),
    });
    // Wrong ticket for chunk 0, and a chunk that does not exist.
    state.reduce(Event::ChunkSnapshot {
        index: 0,
        ticket: Ticket(1_000),
        result: Ok(vec![42]),
    });
    state.reduce(Event::ChunkSnapshot {
        index: 5,
        ticket: probe,
        result: Ok(vec![42]),
    });

    assert_eq!(state, before);
}

#[test]
fn detach_releases_everything_once() {
    let (mut state, probe) = one_page();
    let chunk = state.chunks()[0].ticket();
    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));

    assert_eq!(state.reduce(Event::Detach), [Effect::DetachAll]);
    assert!(state.reduce(Event::Detach).is_empty());
    assert_eq!(state.status(), LoadStatus::Detached);
    assert_eq!(state.attached_count(), 0);

    // Nothing that arrives afterwards changes the state.
    let detached = state.clone();
    assert!(state.reduce(Event::LoadMore).is_empty());
    state.reduce(Event::Resolved {
        ticket: resolve,
        result: Ok(Some(6)),
    });
    state.reduce(Event::ChunkSnapshot {
        index: 0,
        ticket: chunk,
        result: Ok(vec![9]),
    });
    state.reduce(Event::Availability {
        ticket: probe,
        result: Ok(false),
    });
    assert_eq!(state, detached);
    assert_eq!(state.docs(), [1, 2, 3]);
}

#[test]
fn reset_matches_a_fresh_collection() {
    let (mut state, _) = one_page();
    let resolve = resolve_ticket(&state.reduce(Event::LoadMore));
    state.reduce(Event::Resolved {
        ticket: resolve,
        result: Err(DatasetError::unavailable("offline")),
    });

    let next = CollectionParams::new("other", "rehto", 5);
    let effects = state.reduce(Event::Reset(next.clone()));
    let (fresh, _) = State::initialize(next.clone());

    assert!(matches!(
        effects.as_slice(),
        [
            Effect::DetachAll,
            Effect::Watch {
                forward: "other",
                after: None,
                ..
            }
        ]
    ));
    assert_eq!(state.view().docs, fresh.view().docs);
    assert_eq!(state.status(), fresh.status());
    assert_eq!(state.boundary(), None);
    assert_eq!(state.error(), None);
    assert!(!state.has_more());
    assert!(state.chunks().is_empty());
    assert_eq!(state.params(), &next);
}

#[test]
fn reset_after_detach_reattaches() {
    let (mut state, _) = one_page();
    state.reduce(Event::Detach);

    let effects = state.reduce(Event::Reset(PARAMS));
    assert!(matches!(effects.as_slice(), [Effect::Watch { .. }]));
    assert_eq!(state.status(), LoadStatus::Idle);
}

#[test]
fn tickets_are_not_reused_across_reset() {
    let (mut state, old_probe) = one_page();
    let old_chunk = state.chunks()[0].ticket();

    let effects = state.reduce(Event::Reset(PARAMS));
    let probe = watch_ticket(&effects);
    assert!(probe > old_probe && probe > old_chunk);

    let effects = state.reduce(Event::Availability {
        ticket: probe,
        result: Ok(true),
    });
    complete_page(&mut state, resolve_ticket(&effects), 2, vec![2, 1]);

    // A push from the subscription of the previous run.
    state.reduce(Event::ChunkSnapshot {
        index: 0,
        ticket: old_chunk,
        result: Ok(vec![9, 8, 7]),
    });
    assert_eq!(state.docs(), [1, 2]);
}

#[test]
fn load_more_without_a_boundary_starts_the_first_page() {
    let (mut state, _) = State::initialize(PARAMS);

    let effects = state.reduce(Event::LoadMore);
    assert!(matches!(
        effects.as_slice(),
        [Effect::Resolve { after: None, .. }]
    ));
    assert_eq!(state.status(), LoadStatus::LoadingFirst);

    // An empty dataset leaves everything as it was.
    state.reduce(Event::Resolved {
        ticket: resolve_ticket(&effects),
        result: Ok(None),
    });
    assert_eq!(state.status(), LoadStatus::Idle);
    assert!(state.chunks().is_empty());
    assert!(!state.has_more());
}
