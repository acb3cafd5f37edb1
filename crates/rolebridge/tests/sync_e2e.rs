//! End-to-end sync: SQLite store, operation endpoint and an in-memory guild.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode};
use rolebridge::api::{ApiState, router};
use rolebridge::mock::{GuildCall, MockGuild};
use rolebridge::reconcile::{Reconciler, ReconcilerConfig};
use rolebridge::relay::Relay;
use rolebridge::store::SqliteStore;
use rolebridge_types::{AppRole, AppUser, GuildMember, GuildRole, Request};
use tower::ServiceExt as _;

const GUILD: u64 = 1;
const BOT: u64 = 99;
const MEMBER: u64 = 42;

const SUBSCRIBER: u64 = 10;
const MODERATOR: u64 = 20;
const BOOSTER: u64 = 30;
const ADMIN: u64 = 40;
const BRIDGE: u64 = 50;

async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open(":memory:").await.unwrap();
    for role in [
        AppRole::new("subscriber", "Subscriber").linked_to(SUBSCRIBER),
        AppRole::new("moderator", "Moderator").linked_to(MODERATOR),
        AppRole::new("booster", "Booster").linked_to(BOOSTER),
        AppRole::new("admin", "Admin").linked_to(ADMIN),
        AppRole::new("beta", "Beta tester"),
    ] {
        store.put_role(&role).await.unwrap();
    }
    store
        .put_user(
            &AppUser::new("u1")
                .with_platform_id(MEMBER)
                .with_role("subscriber")
                .with_role("booster")
                .with_role("admin")
                .with_role("beta"),
        )
        .await
        .unwrap();
    store
        .put_user(&AppUser::new("u2").with_role("subscriber"))
        .await
        .unwrap();
    store
}

fn guild() -> MockGuild {
    MockGuild::new(BOT)
        .with_role(GuildRole::new(SUBSCRIBER, "Subscriber", 2))
        .with_role(GuildRole::new(MODERATOR, "Moderator", 4))
        .with_role(GuildRole::new(BOOSTER, "Server Booster", 3).managed())
        .with_role(GuildRole::new(ADMIN, "Admin", 8))
        .with_role(GuildRole::new(BRIDGE, "Bridge", 5).managed())
        .with_member(GuildMember::new(BOT, vec![BRIDGE]))
        .with_member(GuildMember::new(MEMBER, vec![ADMIN, MODERATOR]))
}

async fn post(router: axum::Router, request: &Request) -> (StatusCode, String) {
    let request = HttpRequest::post("/")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(request).unwrap()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn app(store: SqliteStore, guild: &MockGuild) -> axum::Router {
    let reconciler = Reconciler::new(
        Arc::new(store),
        Arc::new(guild.clone()),
        ReconcilerConfig { guild_id: GUILD },
    );
    router(ApiState {
        reconciler: Arc::new(reconciler),
        relay: Relay::new(Arc::new(guild.clone()), HashMap::new()),
    })
}

#[tokio::test]
async fn sync_then_revoke_round_trip() {
    let guild = guild();
    let app = app(seeded_store().await, &guild);

    // Subscriber granted, Moderator revoked; Admin (above the bot) and the
    // managed Booster role are left alone.
    let (status, body) = post(app.clone(), &Request::sync_user("u1")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(guild.member_roles(MEMBER), Some(vec![ADMIN, SUBSCRIBER]));

    let (status, _) = post(app.clone(), &Request::sync_user("u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guild.write_calls().len(), 1);

    let (status, _) = post(app, &Request::revoke_user("u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guild.member_roles(MEMBER), Some(vec![ADMIN]));
    assert_eq!(
        guild.write_calls().last(),
        Some(&GuildCall::ReplaceRoles {
            user_id: MEMBER,
            roles: vec![ADMIN],
        })
    );
}

#[tokio::test]
async fn unlinked_user_is_a_silent_success() {
    let guild = guild();
    let app = app(seeded_store().await, &guild);

    let (status, body) = post(app, &Request::sync_user("u2")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(guild.calls().is_empty());
}

#[tokio::test]
async fn unknown_user_is_rejected() {
    let guild = guild();
    let app = app(seeded_store().await, &guild);

    let (status, body) = post(app, &Request::sync_user("u404")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("u404"));
}
