mod common;

use common::{add_user, count};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Barrier;
use std::thread;
use watchlist_core::db::open_db;
use watchlist_core::{
    InviteConfig, InviteError, InviteKind, InviteRef, InviteService, InviteTarget, NewInvite,
};

fn connections(path: &Path, n: usize) -> Vec<Connection> {
    (0..n).map(|_| open_db(path).unwrap()).collect()
}

#[test]
fn concurrent_creates_for_one_tuple_yield_exactly_one_pending() {
    const WRITERS: usize = 8;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watchlist.db");
    let setup = open_db(&path).unwrap();
    let alice = add_user(&setup, "Alice");
    let bob = add_user(&setup, "Bob");

    let conns = connections(&path, WRITERS);
    let barrier = Barrier::new(WRITERS);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = conns
            .into_iter()
            .map(|conn| {
                let barrier = &barrier;
                scope.spawn(move || {
                    let service = InviteService::new(&conn, InviteConfig::default()).unwrap();
                    barrier.wait();
                    service.create(
                        alice,
                        NewInvite::new(InviteTarget::Friend { user_id: Some(bob) }),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|result| matches!(result, Err(InviteError::DuplicatePending(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, WRITERS - 1);
    assert_eq!(
        count(&setup, "SELECT COUNT(*) FROM invites WHERE status = 'pending';"),
        1
    );
}

#[test]
fn concurrent_accepts_of_one_code_materialize_once() {
    const ACCEPTERS: usize = 4;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watchlist.db");
    let setup = open_db(&path).unwrap();
    let alice = add_user(&setup, "Alice");
    let accepters: Vec<i64> = (0..ACCEPTERS)
        .map(|index| add_user(&setup, &format!("Friend {index}")))
        .collect();
    let invite = InviteService::new(&setup, InviteConfig::default())
        .unwrap()
        .create(alice, NewInvite::new(InviteTarget::Friend { user_id: None }))
        .unwrap();
    let code_ref = InviteRef::Code {
        kind: InviteKind::Friend,
        code: invite.code.clone(),
    };

    let conns = connections(&path, ACCEPTERS);
    let barrier = Barrier::new(ACCEPTERS);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = conns
            .into_iter()
            .zip(accepters.iter().copied())
            .map(|(conn, accepter)| {
                let barrier = &barrier;
                let code_ref = &code_ref;
                scope.spawn(move || {
                    let service = InviteService::new(&conn, InviteConfig::default()).unwrap();
                    barrier.wait();
                    service.accept(accepter, code_ref)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let resolved = results
        .iter()
        .filter(|result| matches!(result, Err(InviteError::AlreadyResolved { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(resolved, ACCEPTERS - 1);
    assert_eq!(count(&setup, "SELECT COUNT(*) FROM friendships;"), 1);
}

#[test]
fn same_actor_racing_accept_gets_one_success() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watchlist.db");
    let setup = open_db(&path).unwrap();
    let alice = add_user(&setup, "Alice");
    let bob = add_user(&setup, "Bob");
    let invite = InviteService::new(&setup, InviteConfig::default())
        .unwrap()
        .create(alice, NewInvite::new(InviteTarget::Friend { user_id: Some(bob) }))
        .unwrap();
    let by_id = InviteRef::Id(invite.id);

    let conns = connections(&path, 2);
    let barrier = Barrier::new(2);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = conns
            .into_iter()
            .map(|conn| {
                let barrier = &barrier;
                let by_id = &by_id;
                scope.spawn(move || {
                    let service = InviteService::new(&conn, InviteConfig::default()).unwrap();
                    barrier.wait();
                    service.accept(bob, by_id)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(InviteError::AlreadyResolved { .. }))));
    assert_eq!(count(&setup, "SELECT COUNT(*) FROM friendships;"), 1);
}
