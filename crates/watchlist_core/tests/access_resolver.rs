mod common;

use common::{add_user, invite_service, START_MS};
use std::sync::Arc;
use watchlist_core::db::open_db_in_memory;
use watchlist_core::{
    AccessLevel, AccessResolver, InviteRef, InviteTarget, ListCategory, ManualClock, NewInvite,
    NewUser, RelationshipService, SearchConfig, UserService,
};

#[test]
fn search_skips_short_queries_and_excludes_caller() {
    let conn = open_db_in_memory().unwrap();
    let alice = add_user(&conn, "Alice");
    let alan = add_user(&conn, "Alan");
    add_user(&conn, "Bob");
    let resolver = AccessResolver::new(&conn, SearchConfig::default());

    // With the table hidden, any store read would fail.
    conn.execute_batch("ALTER TABLE users RENAME TO users_hidden;")
        .unwrap();
    assert!(resolver.search_users(alice, "a").unwrap().is_empty());
    assert!(resolver.search_users(alice, "  a  ").unwrap().is_empty());
    conn.execute_batch("ALTER TABLE users_hidden RENAME TO users;")
        .unwrap();

    let matches = resolver.search_users(alice, "al").unwrap();
    let ids: Vec<i64> = matches.iter().map(|user| user.id).collect();
    assert_eq!(ids, vec![alan]);
}

#[test]
fn search_matches_handles_and_treats_wildcards_literally() {
    let conn = open_db_in_memory().unwrap();
    let caller = add_user(&conn, "Caller");
    let users = UserService::new(&conn, 100);
    let film = users
        .create_user(&NewUser {
            email: "film@example.com".to_string(),
            display_name: "Zed".to_string(),
            handle: Some("film_buff".to_string()),
            ..NewUser::default()
        })
        .unwrap();
    add_user(&conn, "Filmore");

    let resolver = AccessResolver::new(&conn, SearchConfig::default());
    let by_handle = resolver.search_users(caller, "m_b").unwrap();
    assert_eq!(by_handle.len(), 1);
    assert_eq!(by_handle[0].id, film.id);

    assert!(resolver.search_users(caller, "%%").unwrap().is_empty());

    let limited = AccessResolver::new(
        &conn,
        SearchConfig {
            min_query_chars: 2,
            max_results: 1,
        },
    );
    assert_eq!(limited.search_users(caller, "fil").unwrap().len(), 1);
}

#[test]
fn shared_list_kinds_reports_categories_and_degrades_on_failure() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(START_MS));
    let alice = add_user(&conn, "Alice");
    let bob = add_user(&conn, "Bob");
    let carol = add_user(&conn, "Carol");
    let resolver = AccessResolver::new(&conn, SearchConfig::default());
    let service = invite_service(&conn, &clock);

    assert!(resolver.shared_list_kinds(bob).is_empty());

    let list = UserService::new(&conn, 100)
        .create_list(alice, "Sci-Fi")
        .unwrap();
    let invite = service
        .create(
            alice,
            NewInvite::new(InviteTarget::ListDirect {
                list_id: list.id,
                user_id: bob,
                access: AccessLevel::Editor,
            }),
        )
        .unwrap();
    service.accept(bob, &InviteRef::Id(invite.id)).unwrap();

    assert_eq!(
        resolver.shared_list_kinds(alice),
        vec![ListCategory::Owned, ListCategory::Collaborative]
    );
    assert_eq!(resolver.shared_list_kinds(bob), vec![ListCategory::Collaborative]);
    assert!(resolver.shared_list_kinds(carol).is_empty());

    conn.execute_batch("DROP TABLE partnerships;").unwrap();
    assert!(resolver.shared_list_kinds(alice).is_empty());
}

#[test]
fn friends_who_share_counts_lists_and_partnerships_once() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(START_MS));
    let alice = add_user(&conn, "Alice");
    let bob = add_user(&conn, "Bob");
    let carol = add_user(&conn, "Carol");
    let dave = add_user(&conn, "Dave");
    let service = invite_service(&conn, &clock);
    let resolver = AccessResolver::new(&conn, SearchConfig::default());

    // Bob: partner (and therefore friend) with a shared list.
    let partner = service
        .create(
            alice,
            NewInvite::new(InviteTarget::Partner {
                user_id: Some(bob),
                list_name: None,
            }),
        )
        .unwrap();
    service.accept(bob, &InviteRef::Id(partner.id)).unwrap();

    // Carol: friend who collaborates on one of Carol's lists with Alice.
    let friendship = service
        .create(
            carol,
            NewInvite::new(InviteTarget::Friend {
                user_id: Some(alice),
            }),
        )
        .unwrap();
    service.accept(alice, &InviteRef::Id(friendship.id)).unwrap();
    let carols_list = UserService::new(&conn, 100)
        .create_list(carol, "Westerns")
        .unwrap();
    let grant = service
        .create(
            carol,
            NewInvite::new(InviteTarget::ListDirect {
                list_id: carols_list.id,
                user_id: alice,
                access: AccessLevel::Viewer,
            }),
        )
        .unwrap();
    service.accept(alice, &InviteRef::Id(grant.id)).unwrap();

    // Dave: plain friend, nothing shared.
    let plain = service
        .create(
            dave,
            NewInvite::new(InviteTarget::Friend {
                user_id: Some(alice),
            }),
        )
        .unwrap();
    service.accept(alice, &InviteRef::Id(plain.id)).unwrap();

    let sharing = resolver.friends_who_share(alice).unwrap();
    let mut ids: Vec<i64> = sharing.friends.iter().map(|friend| friend.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![bob, carol]);
    assert_eq!(sharing.total, 2);

    let friends = RelationshipService::new(&conn).list_friends(alice).unwrap();
    assert_eq!(friends.len(), 3);
}

#[test]
fn revocation_removes_access() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(START_MS));
    let alice = add_user(&conn, "Alice");
    let bob = add_user(&conn, "Bob");
    let carol = add_user(&conn, "Carol");
    let service = invite_service(&conn, &clock);
    let relationships = RelationshipService::new(&conn);
    let list = UserService::new(&conn, 100)
        .create_list(alice, "Anime")
        .unwrap();

    for user in [bob, carol] {
        let invite = service
            .create(
                alice,
                NewInvite::new(InviteTarget::ListDirect {
                    list_id: list.id,
                    user_id: user,
                    access: AccessLevel::Editor,
                }),
            )
            .unwrap();
        service.accept(user, &InviteRef::Id(invite.id)).unwrap();
    }
    assert_eq!(relationships.list_collaborators(list.id).unwrap().len(), 2);

    assert!(matches!(
        relationships.revoke_collaborator(bob, list.id, carol),
        Err(watchlist_core::InviteError::Forbidden(_))
    ));
    relationships.revoke_collaborator(alice, list.id, carol).unwrap();
    relationships.leave_list(bob, list.id).unwrap();
    assert!(matches!(
        relationships.leave_list(alice, list.id),
        Err(watchlist_core::InviteError::Forbidden(_))
    ));
    assert!(matches!(
        relationships.leave_list(bob, list.id),
        Err(watchlist_core::InviteError::NotFound)
    ));
    assert!(relationships.list_collaborators(list.id).unwrap().is_empty());

    let friend = service
        .create(
            alice,
            NewInvite::new(InviteTarget::Friend { user_id: Some(bob) }),
        )
        .unwrap();
    service.accept(bob, &InviteRef::Id(friend.id)).unwrap();
    relationships.remove_friend(bob, alice).unwrap();
    assert!(relationships.list_friends(alice).unwrap().is_empty());
    assert!(matches!(
        relationships.remove_friend(bob, alice),
        Err(watchlist_core::InviteError::NotFound)
    ));

    // A removed friend can be invited again.
    service
        .create(
            alice,
            NewInvite::new(InviteTarget::Friend { user_id: Some(bob) }),
        )
        .unwrap();
}

#[test]
fn partners_cannot_unfriend_each_other() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(START_MS));
    let alice = add_user(&conn, "Alice");
    let bob = add_user(&conn, "Bob");
    let service = invite_service(&conn, &clock);
    let relationships = RelationshipService::new(&conn);
    let resolver = AccessResolver::new(&conn, SearchConfig::default());

    let partner = service
        .create(
            alice,
            NewInvite::new(InviteTarget::Partner {
                user_id: Some(bob),
                list_name: None,
            }),
        )
        .unwrap();
    service.accept(bob, &InviteRef::Id(partner.id)).unwrap();

    for (actor, other) in [(alice, bob), (bob, alice)] {
        assert!(matches!(
            relationships.remove_friend(actor, other),
            Err(watchlist_core::InviteError::Forbidden(_))
        ));
    }

    let sharing = resolver.friends_who_share(alice).unwrap();
    assert_eq!(sharing.total, 1);
    assert_eq!(sharing.friends[0].id, bob);
    assert_eq!(
        resolver.shared_list_kinds(alice),
        vec![ListCategory::Owned, ListCategory::Partner]
    );
}
