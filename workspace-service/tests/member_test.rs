mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

fn member_uri(ws: &str, action: &str) -> String {
    format!("/v1/workspace/member/{}/{}", ws, action)
}

#[tokio::test]
async fn test_add_remove_and_reactivate_member() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let bob = app.user("Bob", "bob@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;

    assert_eq!(app.add_member(&ws, &u, "bob@x.com", "MEMBER").await, StatusCode::OK);
    assert_eq!(app.count(&ws, &u).await, 2);

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("{}?email=bob@x.com", member_uri(&ws, "remove")),
            Some(&u),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Member removed successfully");
    assert_eq!(app.count(&ws, &u).await, 1);
    assert_eq!(app.role_in(&ws, &bob).await, None);

    // Re-adding restores the same membership with the new role.
    assert_eq!(app.add_member(&ws, &u, "bob@x.com", "ADMIN").await, StatusCode::OK);
    assert_eq!(app.count(&ws, &u).await, 2);
    assert_eq!(app.role_in(&ws, &bob).await.as_deref(), Some("ADMIN"));
}

#[tokio::test]
async fn test_add_member_failure_modes() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let bob = app.user("Bob", "bob@x.com").await;
    app.user("Carol", "carol@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "bob@x.com", "MEMBER").await;

    assert_eq!(
        app.add_member(&ws, &u, "bob@x.com", "MEMBER").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.add_member(&ws, &u, "ghost@x.com", "MEMBER").await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.add_member(&ws, &bob, "carol@x.com", "MEMBER").await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.add_member(&uuid::Uuid::new_v4().to_string(), &u, "carol@x.com", "MEMBER").await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_only_owner_can_grant_owner() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let ada = app.user("Ada", "ada@x.com").await;
    let dave = app.user("Dave", "dave@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "ada@x.com", "ADMIN").await;

    let (status, body) = app
        .post(
            &member_uri(&ws, "add"),
            Some(&ada),
            json!({ "email": "dave@x.com", "role": "OWNER" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only the owner can grant the OWNER role");

    assert_eq!(app.add_member(&ws, &u, "dave@x.com", "OWNER").await, StatusCode::OK);

    // Ownership moved: still exactly one owner.
    assert_eq!(app.role_in(&ws, &dave).await.as_deref(), Some("OWNER"));
    assert_eq!(app.role_in(&ws, &u).await.as_deref(), Some("ADMIN"));
    let (_, details) = app.get(&format!("/v1/workspaces/{}", ws), &ada).await;
    assert_eq!(details["owner"]["email"], "dave@x.com");
}

#[tokio::test]
async fn test_owner_can_never_be_removed() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let ada = app.user("Ada", "ada@x.com").await;
    let bob = app.user("Bob", "bob@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "ada@x.com", "ADMIN").await;
    app.add_member(&ws, &u, "bob@x.com", "MEMBER").await;

    let uri = format!("{}?email=aspen@x.com", member_uri(&ws, "remove"));
    for actor in [&u, &ada, &bob] {
        let (status, _) = app.request(Method::DELETE, &uri, Some(actor), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
    assert_eq!(app.role_in(&ws, &u).await.as_deref(), Some("OWNER"));
    assert_eq!(app.count(&ws, &u).await, 3);
}

#[tokio::test]
async fn test_admin_cannot_remove_admin() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let ada = app.user("Ada", "ada@x.com").await;
    app.user("Alan", "alan@x.com").await;
    app.user("Bob", "bob@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "ada@x.com", "ADMIN").await;
    app.add_member(&ws, &u, "alan@x.com", "ADMIN").await;
    app.add_member(&ws, &u, "bob@x.com", "MEMBER").await;

    let remove = |email: &str| format!("{}?email={}", member_uri(&ws, "remove"), email);

    let (status, _) = app
        .request(Method::DELETE, &remove("alan@x.com"), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::DELETE, &remove("bob@x.com"), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::DELETE, &remove("bob@x.com"), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.count(&ws, &u).await, 3);
}

#[tokio::test]
async fn test_change_role() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let ada = app.user("Ada", "ada@x.com").await;
    let bob = app.user("Bob", "bob@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "ada@x.com", "ADMIN").await;
    app.add_member(&ws, &u, "bob@x.com", "MEMBER").await;

    let uri = member_uri(&ws, "change-role");

    let (status, _) = app
        .post(&uri, Some(&ada), json!({ "email": "bob@x.com", "role": "ADMIN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.role_in(&ws, &bob).await.as_deref(), Some("ADMIN"));

    let (status, _) = app
        .post(&uri, Some(&ada), json!({ "email": "aspen@x.com", "role": "MEMBER" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&uri, Some(&ada), json!({ "email": "bob@x.com", "role": "OWNER" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&uri, Some(&u), json!({ "email": "bob@x.com", "role": "SUPERUSER" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leave() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let bob = app.user("Bob", "bob@x.com").await;
    let eve = app.user("Eve", "eve@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "bob@x.com", "MEMBER").await;

    let uri = member_uri(&ws, "leave");

    let (status, body) = app.request(Method::POST, &uri, Some(&u), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Owner cannot leave the workspace; transfer ownership first"
    );

    let (status, _) = app.request(Method::POST, &uri, Some(&eve), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request(Method::POST, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count(&ws, &u).await, 1);

    let (status, _) = app.request(Method::POST, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_transfer_ownership() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let bob = app.user("Bob", "bob@x.com").await;
    app.user("Carol", "carol@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;
    app.add_member(&ws, &u, "bob@x.com", "MEMBER").await;

    let transfer = |email: &str| {
        format!("{}?newOwnerEmail={}", member_uri(&ws, "transfer-ownership"), email)
    };

    let (status, _) = app
        .request(Method::POST, &transfer("aspen@x.com"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::POST, &transfer("carol@x.com"), Some(&u), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::POST, &transfer("ghost@x.com"), Some(&u), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::POST, &transfer("aspen@x.com"), Some(&u), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(Method::POST, &transfer("bob@x.com"), Some(&u), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Ownership transferred successfully");

    assert_eq!(app.role_in(&ws, &bob).await.as_deref(), Some("OWNER"));
    assert_eq!(app.role_in(&ws, &u).await.as_deref(), Some("ADMIN"));
    assert_eq!(app.count(&ws, &u).await, 2);

    // The former owner may now leave.
    let (status, _) = app
        .request(Method::POST, &member_uri(&ws, "leave"), Some(&u), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_count_members_requires_authentication() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;

    let (status, _) = app
        .request(Method::GET, &member_uri(&ws, "count-members"), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_member_requests_are_json_bad_requests() {
    let app = TestApp::new().await;
    let u = app.user("Aspen", "aspen@x.com").await;
    let ws = app.create_workspace(&u, "Eng", "TEAM").await;

    let (status, body) = app
        .request(Method::DELETE, &member_uri(&ws, "remove"), Some(&u), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Validation failed"));

    let (status, body) = app
        .request(
            Method::POST,
            &member_uri(&ws, "transfer-ownership"),
            Some(&u),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .get("/v1/workspace/member/12345/count-members", &u)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
