use fieldcap_forms::{SessionStore, UserRecord, clear_user, save_user};

use crate::api::{LoginRequest, RemoteApi};
use crate::types::{Result, RuntimeError};

/// Sign in and store the user record with its token
pub async fn login<A, S>(api: &A, store: &S, request: &LoginRequest) -> Result<UserRecord>
where
    A: RemoteApi,
    S: SessionStore,
{
    let response = api.login(request).await?;
    let rejected = |fallback: &str| {
        RuntimeError::Rejected(response.message.clone().unwrap_or_else(|| fallback.to_string()))
    };

    if !response.success {
        return Err(rejected("Login failed"));
    }
    let user = response.user.clone().ok_or_else(|| rejected("Login response has no user"))?;
    if user.is_active != Some(true) {
        return Err(rejected("Account is not active"));
    }
    let token = response
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| rejected("Login response has no token"))?;

    let record = UserRecord {
        id: user.id,
        username: user.username,
        name: user.name,
        role: user.role,
        company_id: user.company_id,
        token: Some(token),
    };
    save_user(store, &record).await?;

    log::info!("Signed in as {}", record.username);
    Ok(record)
}

/// Forget the signed-in user
pub async fn logout<S: SessionStore>(store: &S) -> Result<()> {
    clear_user(store).await?;
    log::info!("Signed out");
    Ok(())
}
