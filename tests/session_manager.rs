mod common;

use common::{envelope, user_json, Harness, TOKEN};
use neurocom_client::models::{ChangePasswordData, LoginCredentials, ProfileUpdate, UserSettings};
use neurocom_client::transport::{FormPart, Method, RequestBody};
use neurocom_client::{ConnectionTag, LoginState, SocketEvent, SocketRole};
use serde_json::json;

#[tokio::test]
async fn restore_without_token_is_anonymous_and_silent() {
    let h = Harness::new(None);
    let state = h.client.session().restore_session().await.unwrap();
    assert_eq!(state, LoginState::Anonymous);
    assert!(h.http.requests().is_empty());
    assert!(h.sockets.sockets().is_empty());
}

#[tokio::test]
async fn restore_with_valid_token_authenticates_and_opens_presence() {
    let h = Harness::logged_in().await;
    let session = h.client.session();

    assert_eq!(session.login_state(), LoginState::Authenticated);
    assert_eq!(session.user().unwrap().username, "ana");
    assert!(session.settings().unwrap().darkmode);

    let me = &h.http.requests_to("/user/me/")[0];
    assert_eq!(me.authorization.as_deref(), Some("Token tok-123"));

    let presence = h.sockets.presence();
    assert_eq!(presence.url, format!("ws://localhost:8000/ws/activity/?token={TOKEN}"));
    assert!(session.has_presence_feed());
}

#[tokio::test]
async fn rejected_token_is_dropped_and_session_is_anonymous() {
    let h = Harness::new(Some("stale"));
    h.http.reply(Method::Get, "/user/me/", 401, json!({"detail": "Invalid token."}).to_string());

    let err = h.client.session().restore_session().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Session is no longer valid: Invalid token.");
    assert_eq!(h.client.session().login_state(), LoginState::Anonymous);
    assert_eq!(h.token(), None);
    assert!(h.sockets.sockets().is_empty());
}

#[tokio::test]
async fn restore_failure_of_any_kind_ends_anonymous() {
    let h = Harness::new(Some(TOKEN));
    h.http.offline(Method::Get, "/user/me/");

    let err = h.client.session().restore_session().await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(h.client.session().login_state(), LoginState::Anonymous);
    assert_eq!(h.token(), None);
}

#[tokio::test]
async fn login_persists_token_and_user() {
    let h = Harness::new(None);
    h.http.ok(Method::Post, "/user/login/", json!({"token": "fresh", "user": user_json(7, "cy")}));

    let credentials = LoginCredentials { username: "cy".into(), password: "pw".into() };
    let user = h.client.session().login(&credentials).await.unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(h.token().as_deref(), Some("fresh"));
    assert_eq!(h.client.session().login_state(), LoginState::Authenticated);
    assert!(h.sockets.presence().url.ends_with("?token=fresh"));

    let request = &h.http.requests_to("/user/login/")[0];
    assert_eq!(request.authorization, None);
    assert_eq!(request.body, RequestBody::Json(json!({"username": "cy", "password": "pw"})));
}

#[tokio::test]
async fn failed_login_reports_field_errors_and_changes_nothing() {
    let h = Harness::new(None);
    h.client.session().restore_session().await.unwrap();
    h.http.reply(
        Method::Post,
        "/user/login/",
        400,
        json!({
            "success": false,
            "error_code": "invalid_credentials",
            "message": "Invalid credentials",
            "details": {
                "field_errors": [{"field": "password", "code": "invalid", "message": "Wrong password"}],
                "non_field_errors": ["Unable to log in"]
            }
        })
        .to_string(),
    );

    let credentials = LoginCredentials { username: "cy".into(), password: "nope".into() };
    let err = h.client.session().login(&credentials).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.status(), 400);
    assert_eq!(err.field_error("password"), Some("Wrong password"));
    assert_eq!(err.non_field_errors(), ["Unable to log in".to_string()]);
    assert_eq!(h.client.session().login_state(), LoginState::Anonymous);
    assert_eq!(h.token(), None);
    assert!(h.sockets.sockets().is_empty());
}

#[tokio::test]
async fn logout_clears_everything_even_when_the_call_fails() {
    let h = Harness::logged_in().await;
    h.http.offline(Method::Post, "/user/logout/");

    let err = h.client.session().logout().await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(h.client.session().login_state(), LoginState::Anonymous);
    assert_eq!(h.client.session().user(), None);
    assert_eq!(h.token(), None);
    assert!(h.sockets.presence().closed);
}

#[tokio::test]
async fn presence_feed_replaces_online_users() {
    let h = Harness::logged_in().await;
    let tag = h.sockets.presence().tag;

    h.push_frame(
        tag,
        json!({"type": "online_users", "online_users": [user_json(2, "bo"), user_json(3, "cy")]}),
    );
    assert_eq!(h.client.session().online_users(), vec![2, 3]);

    h.push_frame(tag, json!({"type": "online_users", "online_users": [user_json(3, "cy")]}));
    assert_eq!(h.client.session().online_users(), vec![3]);
    assert!(h.client.session().is_online(3));
    assert!(!h.client.session().is_online(2));

    // Unrelated or broken frames leave the list alone.
    h.push_frame(tag, json!({"type": "heartbeat"}));
    h.client.handle_socket_event(tag, SocketEvent::Text("not json".into()));
    assert_eq!(h.client.session().online_users(), vec![3]);
}

#[tokio::test]
async fn presence_feed_accepts_bare_ids() {
    let h = Harness::logged_in().await;
    let tag = h.sockets.presence().tag;

    h.push_frame(tag, json!({"type": "online_users", "online_users": [2, 3]}));

    assert_eq!(h.client.session().online_users(), vec![2, 3]);
}

#[tokio::test]
async fn events_of_a_closed_presence_socket_are_ignored() {
    let h = Harness::logged_in().await;
    let old = h.sockets.presence().tag;
    h.client.session().teardown();

    h.push_frame(old, json!({"type": "online_users", "online_users": [user_json(2, "bo")]}));
    assert!(h.client.session().online_users().is_empty());

    let bogus = ConnectionTag { role: SocketRole::Presence, generation: old.generation + 10 };
    h.push_frame(bogus, json!({"type": "online_users", "online_users": [user_json(2, "bo")]}));
    assert!(h.client.session().online_users().is_empty());
}

#[tokio::test]
async fn update_settings_merges_into_user() {
    let h = Harness::logged_in().await;
    let settings =
        UserSettings { darkmode: false, request_notifications: true, message_notifications: true };
    h.http.ok(Method::Put, "/user/update_settings/", serde_json::to_value(&settings).unwrap());

    let updated = h.client.session().update_settings(&settings).await.unwrap();

    assert_eq!(updated, settings);
    assert_eq!(h.client.session().settings(), Some(settings.clone()));
    assert_eq!(h.client.session().user().unwrap().settings, Some(settings));
}

#[tokio::test]
async fn update_profile_sends_a_form_and_keeps_settings() {
    let h = Harness::logged_in().await;
    let mut profile = user_json(1, "ana");
    profile["bio"] = json!("hello there");
    profile.as_object_mut().unwrap().remove("settings");
    h.http.ok(Method::Put, "/user/edit_profile/", profile);

    let update = ProfileUpdate { bio: Some("hello there".into()), ..ProfileUpdate::default() };
    let user = h.client.session().update_profile(&update).await.unwrap();

    assert_eq!(user.bio.as_deref(), Some("hello there"));
    assert!(user.settings.unwrap().darkmode);

    let request = &h.http.requests_to("/user/edit_profile/")[0];
    assert_eq!(
        request.body,
        RequestBody::Multipart(vec![FormPart::Text {
            name: "bio".into(),
            value: "hello there".into()
        }])
    );
}

#[tokio::test]
async fn change_password_returns_server_message() {
    let h = Harness::logged_in().await;
    h.http.reply(
        Method::Put,
        "/user/change_password/",
        200,
        json!({"success": true, "message": "Password changed successfully"}).to_string(),
    );

    let fields = ChangePasswordData {
        old_password: "old".into(),
        new_password: "new-secret".into(),
        confirm_new_password: "new-secret".into(),
    };
    let message = h.client.session().change_password(&fields).await.unwrap();
    assert_eq!(message, "Password changed successfully");
    assert_eq!(h.client.session().login_state(), LoginState::Authenticated);
}

#[tokio::test]
async fn delete_account_ends_the_session() {
    let h = Harness::logged_in().await;
    h.http.reply(Method::Delete, "/user/delete_account/", 200, envelope(json!({})));

    h.client.delete_account().await.unwrap();

    assert_eq!(h.client.session().login_state(), LoginState::Anonymous);
    assert_eq!(h.token(), None);
    assert!(h.sockets.presence().closed);
}

#[tokio::test]
async fn any_unauthorized_response_logs_the_user_out() {
    let h = Harness::logged_in().await;
    h.http.reply(
        Method::Put,
        "/user/update_settings/",
        401,
        json!({"detail": "Authentication credentials were not provided."}).to_string(),
    );

    let err = h.client.session().update_settings(&UserSettings::default()).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(h.client.session().login_state(), LoginState::Anonymous);
    assert_eq!(h.token(), None);
    assert!(h.sockets.presence().closed);
}
