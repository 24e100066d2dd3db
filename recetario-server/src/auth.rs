//! Family-wide authentication: one shared password, one long-lived cookie.
//! There is no per-user identity; holding the cookie means being family.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sha2::Digest;

pub const SESSION_COOKIE: &str = "family_session";

fn family_password() -> Option<String> {
    dotenvy::var("FAMILY_PASSWORD").ok()
}

/// The value stored in the cookie: a digest of the shared secret, so the
/// password itself never travels after login.
fn session_token() -> Option<String> {
    let secret = family_password()?;
    let mut hasher = sha2::Sha256::new();
    hasher.update(b"recetario-session-v1:");
    hasher.update(secret.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

/// Compare through a second hash so the comparison time does not depend
/// on where the strings first differ.
fn digests_match(a: &str, b: &str) -> bool {
    sha2::Sha256::digest(a.as_bytes()) == sha2::Sha256::digest(b.as_bytes())
}

pub fn verify_password(submitted: &str) -> bool {
    match family_password() {
        Some(secret) => digests_match(submitted, &secret),
        None => false,
    }
}

/// The cookie issued after a successful login.
pub fn session_cookie() -> Option<Cookie<'static>> {
    let token = session_token()?;
    Some(
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .permanent()
            .build(),
    )
}

/// Request guard for every page route outside the allow-list (login,
/// static assets, health). Unauthenticated requests land on the login page.
pub struct FamilySession;

#[async_trait]
impl<S> FromRequestParts<S> for FamilySession
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extracting the cookie jar is infallible
        let jar = CookieJar::from_request_parts(parts, state).await.unwrap();
        let expected = session_token().ok_or_else(|| Redirect::to("/login"))?;
        match jar.get(SESSION_COOKIE) {
            Some(cookie) if digests_match(cookie.value(), &expected) => Ok(FamilySession),
            _ => Err(Redirect::to("/login")),
        }
    }
}
