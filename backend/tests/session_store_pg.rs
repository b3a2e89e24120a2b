use centralauth_backend::{
    models::{
        session::NewSession,
        user::{NewUser, User},
    },
    repositories::{PgStore, SessionStore, StoreError, UserStore},
    types::UserId,
    utils::{generate_session_token, hash_session_token},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

mod support;

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

async fn store() -> Option<PgStore> {
    match support::test_pool().await {
        Some(pool) => Some(PgStore::new(pool)),
        None => {
            eprintln!("Skipping PostgreSQL test: TEST_DATABASE_URL is not set");
            None
        }
    }
}

async fn seed_user(store: &PgStore) -> User {
    store
        .create_user(NewUser {
            email: format!("user-{}@example.com", Uuid::new_v4()),
            password_hash: "$argon2id$v=19$m=64,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            full_name: "Pg Test".to_string(),
            date_of_birth: None,
        })
        .await
        .expect("create user")
}

fn new_session(user_id: UserId, ttl: Duration) -> (String, NewSession) {
    let token = generate_session_token();
    let new_session = NewSession {
        user_id,
        token_hash: hash_session_token(&token),
        user_agent: Some("pg-test".to_string()),
        ip_address: Some("127.0.0.1".to_string()),
        expires_at: Utc::now() + ttl,
    };
    (token, new_session)
}

#[tokio::test]
async fn users_round_trip_and_duplicate_email_conflicts() {
    let _guard = integration_guard().await;
    let Some(store) = store().await else { return };

    let user = seed_user(&store).await;
    assert!(user.is_active);
    assert!(!user.email_verified);

    let found = store
        .get_user_by_email(&user.email)
        .await
        .expect("lookup")
        .expect("found");
    assert_eq!(found.id, user.id);
    assert!(store.get_user_by_id(user.id).await.expect("lookup").is_some());
    assert!(store
        .get_user_by_id(UserId::new())
        .await
        .expect("lookup")
        .is_none());

    let err = store
        .create_user(NewUser {
            email: user.email.clone(),
            password_hash: "x".to_string(),
            full_name: "Dup".to_string(),
            date_of_birth: None,
        })
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, StoreError::Conflict(c) if c == "users_email_key"));
}

#[tokio::test]
async fn duplicate_token_hash_is_conflict_and_keeps_original_row() {
    let _guard = integration_guard().await;
    let Some(store) = store().await else { return };
    let owner = seed_user(&store).await;
    let intruder = seed_user(&store).await;

    let (token, first) = new_session(owner.id, Duration::days(1));
    let mut second = first.clone();
    second.user_id = intruder.id;

    store.create_session(first).await.expect("first insert");
    let err = store.create_session(second).await.expect_err("collision");
    assert!(matches!(err, StoreError::Conflict(_)));

    let session = store
        .get_session_by_token(&hash_session_token(&token), Utc::now())
        .await
        .expect("lookup")
        .expect("found");
    assert_eq!(session.user_id, owner.id);
}

#[tokio::test]
async fn lookup_enforces_expiry_and_activity() {
    let _guard = integration_guard().await;
    let Some(store) = store().await else { return };
    let user = seed_user(&store).await;

    let (live_token, live) = new_session(user.id, Duration::days(1));
    let (stale_token, stale) = new_session(user.id, Duration::seconds(-5));
    store.create_session(live).await.expect("live");
    store.create_session(stale).await.expect("stale");

    let now = Utc::now();
    let live_hash = hash_session_token(&live_token);
    assert!(store
        .get_session_by_token(&live_hash, now)
        .await
        .expect("lookup")
        .is_some());
    assert!(store
        .get_session_by_token(&hash_session_token(&stale_token), now)
        .await
        .expect("lookup")
        .is_none());

    assert!(store.deactivate_session(&live_hash).await.expect("deactivate"));
    assert!(!store.deactivate_session(&live_hash).await.expect("again"));
    assert!(store
        .get_session_by_token(&live_hash, now)
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn bulk_revocation_counts_and_flips_only_the_owner() {
    let _guard = integration_guard().await;
    let Some(store) = store().await else { return };
    let alice = seed_user(&store).await;
    let bob = seed_user(&store).await;

    for _ in 0..3 {
        let (_, session) = new_session(alice.id, Duration::days(1));
        store.create_session(session).await.expect("alice session");
    }
    let (bob_token, bob_session) = new_session(bob.id, Duration::days(1));
    store.create_session(bob_session).await.expect("bob session");

    let now = Utc::now();
    assert_eq!(
        store
            .count_active_user_sessions(alice.id, now)
            .await
            .expect("count"),
        3
    );
    assert_eq!(
        store
            .deactivate_all_user_sessions(alice.id)
            .await
            .expect("revoke"),
        3
    );
    assert_eq!(
        store
            .deactivate_all_user_sessions(alice.id)
            .await
            .expect("revoke again"),
        0
    );
    assert!(store
        .get_session_by_token(&hash_session_token(&bob_token), now)
        .await
        .expect("lookup")
        .is_some());
}

#[tokio::test]
async fn purge_deletes_long_dead_sessions_only() {
    let _guard = integration_guard().await;
    let Some(store) = store().await else { return };
    let user = seed_user(&store).await;

    let (live_token, live) = new_session(user.id, Duration::days(1));
    let (_, expired) = new_session(user.id, Duration::days(-200));
    store.create_session(live).await.expect("live");
    store.create_session(expired).await.expect("expired");

    let purged = store
        .purge_sessions(Utc::now() - Duration::days(90))
        .await
        .expect("purge");
    assert!(purged >= 1);
    assert!(store
        .get_session_by_token(&hash_session_token(&live_token), Utc::now())
        .await
        .expect("lookup")
        .is_some());
}
