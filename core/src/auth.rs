//! Email/password sign-in against Firebase's Identity Toolkit REST API.
//!
//! The identity client is an ordinary value built at start-up and handed to
//! [`AuthSession`]; nothing here is global.

use std::cell::RefCell;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{ApiRequest, Transport};
use crate::errors::{AppError, Result};

pub const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
    #[serde(skip)]
    pub id_token: String,
}

/// Account operations of an identity service.
#[async_trait(?Send)]
pub trait IdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn send_verification(&self, id_token: &str) -> Result<()>;

    /// Re-reads the account, picking up a verification done elsewhere.
    async fn lookup(&self, id_token: &str) -> Result<AuthUser>;

    async fn update_display_name(&self, id_token: &str, display_name: &str) -> Result<()>;
}

/// User-facing text for a provider error code, when there is a friendlier one.
pub fn auth_message(code: &str) -> Option<&'static str> {
    match code {
        "user-not-found" => Some("No user found with this email."),
        "wrong-password" => Some("Incorrect password."),
        "email-already-in-use" => Some("Email already registered."),
        "invalid-email" => Some("Please provide a valid email."),
        "weak-password" => Some("Password is too weak (min 6 characters)."),
        _ => None,
    }
}

/// Identity Toolkit reports `EMAIL_NOT_FOUND`, `WEAK_PASSWORD : detail`, ...
fn normalize_code(raw: &str) -> String {
    let code = raw.split(" : ").next().unwrap_or(raw).trim();
    match code {
        "EMAIL_NOT_FOUND" => "user-not-found".to_string(),
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "wrong-password".to_string(),
        "EMAIL_EXISTS" => "email-already-in-use".to_string(),
        "INVALID_EMAIL" => "invalid-email".to_string(),
        "WEAK_PASSWORD" => "weak-password".to_string(),
        other => other.to_lowercase().replace('_', "-"),
    }
}

/// Turns an Identity Toolkit error body into [`AppError::Auth`]; other
/// failures pass through untouched.
fn into_auth_error(err: AppError) -> AppError {
    let AppError::Http { body, .. } = &err else {
        return err;
    };
    let Some(raw) = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
    else {
        return err;
    };
    let code = normalize_code(&raw);
    let message = auth_message(&code).map(str::to_string).unwrap_or(raw);
    AppError::Auth { code, message }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

/// Firebase Authentication over REST. `T` points at [`IDENTITY_TOOLKIT_BASE`].
pub struct FirebaseAuth<T> {
    transport: T,
    api_key: String,
}

impl<T: Transport> FirebaseAuth<T> {
    pub fn new(transport: T, api_key: impl Into<String>) -> Self {
        Self { transport, api_key: api_key.into() }
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value> {
        let request = ApiRequest::post(format!("/accounts:{method}"))
            .query("key", self.api_key.as_str())
            .json(body);
        self.transport.execute(request).await.map_err(into_auth_error)
    }

    async fn token_call(&self, method: &str, email: &str, password: &str) -> Result<AuthUser> {
        let body = self
            .call(method, json!({"email": email, "password": password, "returnSecureToken": true}))
            .await?;
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| AppError::decode(method, e))?;
        Ok(AuthUser {
            uid: token.local_id,
            email: token.email,
            display_name: token.display_name.filter(|n| !n.is_empty()),
            email_verified: false,
            id_token: token.id_token,
        })
    }
}

#[async_trait(?Send)]
impl<T: Transport> IdentityProvider for FirebaseAuth<T> {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = self.token_call("signInWithPassword", email, password).await?;
        // the token response does not say whether the address is verified
        match self.lookup(&user.id_token).await {
            Ok(account) => Ok(account),
            Err(e) => {
                warn!("Account lookup after sign-in failed: {e}");
                Ok(user)
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.token_call("signUp", email, password).await
    }

    async fn send_verification(&self, id_token: &str) -> Result<()> {
        self.call("sendOobCode", json!({"requestType": "VERIFY_EMAIL", "idToken": id_token}))
            .await
            .map(|_| ())
    }

    async fn lookup(&self, id_token: &str) -> Result<AuthUser> {
        let body = self.call("lookup", json!({"idToken": id_token})).await?;
        let response: LookupResponse =
            serde_json::from_value(body).map_err(|e| AppError::decode("lookup", e))?;
        let account = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::decode("lookup", "no account in response"))?;
        Ok(AuthUser {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|n| !n.is_empty()),
            email_verified: account.email_verified,
            id_token: id_token.to_string(),
        })
    }

    async fn update_display_name(&self, id_token: &str, display_name: &str) -> Result<()> {
        self.call(
            "update",
            json!({"idToken": id_token, "displayName": display_name, "returnSecureToken": false}),
        )
        .await
        .map(|_| ())
    }
}

/// The signed-in user, if any, plus the account actions the UI offers.
pub struct AuthSession<P> {
    provider: P,
    user: RefCell<Option<AuthUser>>,
}

impl<P: IdentityProvider> AuthSession<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, user: RefCell::new(None) }
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user.borrow().as_ref().map(|u| u.uid.clone())
    }

    pub fn is_verified(&self) -> bool {
        self.user.borrow().as_ref().is_some_and(|u| u.email_verified)
    }

    fn check_credentials(email: &str, password: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(AppError::empty_field("email"));
        }
        if password.is_empty() {
            return Err(AppError::empty_field("password"));
        }
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        Self::check_credentials(email, password)?;
        let user = self.provider.sign_in(email.trim(), password).await?;
        info!("Signed in as {}", user.uid);
        *self.user.borrow_mut() = Some(user.clone());
        Ok(user)
    }

    /// Creates the account and sends the verification email. Failing to send
    /// the email or to set the display name does not undo the sign-up.
    pub async fn sign_up(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<AuthUser> {
        Self::check_credentials(email, password)?;
        let mut user = self.provider.sign_up(email.trim(), password).await?;
        info!("Created account {}", user.uid);

        if let Err(e) = self.provider.send_verification(&user.id_token).await {
            warn!("Sending the verification email failed: {e}");
        }
        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            match self.provider.update_display_name(&user.id_token, name).await {
                Ok(()) => user.display_name = Some(name.to_string()),
                Err(e) => debug!("Display name not set: {e}"),
            }
        }
        *self.user.borrow_mut() = Some(user.clone());
        Ok(user)
    }

    pub async fn send_verification(&self) -> Result<()> {
        let token = self
            .user
            .borrow()
            .as_ref()
            .map(|u| u.id_token.clone())
            .ok_or(AppError::NotSignedIn)?;
        self.provider.send_verification(&token).await
    }

    /// Refreshes the signed-in user; `None` when nobody is signed in.
    pub async fn reload(&self) -> Result<Option<AuthUser>> {
        let Some(token) = self.user.borrow().as_ref().map(|u| u.id_token.clone()) else {
            return Ok(None);
        };
        let user = self.provider.lookup(&token).await?;
        *self.user.borrow_mut() = Some(user.clone());
        Ok(Some(user))
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.user.borrow_mut().take() {
            info!("Signed out {}", user.uid);
        }
    }
}
