mod common;

use common::*;
use fieldcap_forms::{MemoryStore, current_token, load_user};
use fieldcap_runtime::api::{LoginResponse, LoginUser};
use fieldcap_runtime::{LoginRequest, RuntimeError, auth};

fn request() -> LoginRequest {
    LoginRequest {
        username: "kim".into(),
        password: "pw".into(),
        company_id: "c1".into(),
    }
}

fn api_returning(response: LoginResponse) -> FakeApi {
    FakeApi {
        login: Some(response),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_login_stores_token() {
    let store = MemoryStore::new();
    let api = api_returning(LoginResponse {
        success: true,
        token: Some("fresh".into()),
        user: Some(active_user()),
        message: None,
    });

    let user = auth::login(&api, &store, &request()).await.unwrap();
    assert_eq!(user.username, "kim");
    assert_eq!(user.company_id.as_deref(), Some("c1"));
    assert_eq!(current_token(&store).await.unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_inactive_account_is_rejected() {
    let store = MemoryStore::new();
    let api = api_returning(LoginResponse {
        success: true,
        token: Some("fresh".into()),
        user: Some(LoginUser {
            is_active: Some(false),
            ..active_user()
        }),
        message: None,
    });

    let result = auth::login(&api, &store, &request()).await;
    assert!(matches!(result, Err(RuntimeError::Rejected(_))));
    assert!(load_user(&store).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_message_is_kept() {
    let store = MemoryStore::new();
    let api = api_returning(LoginResponse {
        success: false,
        message: Some("비밀번호가 올바르지 않습니다".into()),
        ..Default::default()
    });

    match auth::login(&api, &store, &request()).await {
        Err(RuntimeError::Rejected(message)) => {
            assert_eq!(message, "비밀번호가 올바르지 않습니다");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_logout_clears_user() {
    let store = signed_in_store().await;
    auth::logout(store.as_ref()).await.unwrap();
    assert_eq!(current_token(store.as_ref()).await.unwrap(), None);
}
