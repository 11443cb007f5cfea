//! Session-binding cookie.
//!
//! The membership token reaches the browser in the `x-auth-token` cookie as
//! `{token}.{hex(hmac)}`. The HMAC key is derived per room with HKDF-SHA256
//! from the configured session secret, so a cookie minted for one room never
//! verifies against another and a forged token is rejected before any store
//! lookup.

use axum::http::{header, HeaderMap};
use cookie::{Cookie, SameSite};
use ring::{hkdf, hmac};
use secrecy::{ExposeSecret, SecretString};

/// Cookie carrying the signed membership token.
pub const SESSION_COOKIE_NAME: &str = "x-auth-token";

/// HKDF info string for per-room key derivation.
const KEY_INFO: &[u8] = b"room-session-binding";

/// Signs and verifies membership tokens for the session cookie.
#[derive(Clone)]
pub struct SessionSigner {
    secret: SecretString,
    secure: bool,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("secret", &"[REDACTED]")
            .field("secure", &self.secure)
            .finish()
    }
}

impl SessionSigner {
    /// Create a signer. `secure` controls the cookie's `Secure` attribute.
    pub fn new(secret: SecretString, secure: bool) -> Self {
        Self { secret, secure }
    }

    /// Derive the room-specific HMAC key.
    ///
    /// ```text
    /// room_key = HKDF-SHA256(ikm: secret, salt: room_id, info: "room-session-binding")
    /// ```
    fn room_key(&self, room_id: &str) -> hmac::Key {
        let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, room_id.as_bytes());
        let prk = salt.extract(self.secret.expose_secret().as_bytes());
        let info = [KEY_INFO];

        match prk.expand(&info, hmac::HMAC_SHA256) {
            Ok(okm) => hmac::Key::from(okm),
            // HMAC_SHA256 output length is far below the HKDF limit, so
            // expand cannot fail here; fall back to the undiluted secret.
            Err(_) => hmac::Key::new(
                hmac::HMAC_SHA256,
                self.secret.expose_secret().as_bytes(),
            ),
        }
    }

    /// Produce the cookie value for `token` in `room_id`.
    pub fn sign(&self, room_id: &str, token: &str) -> String {
        let tag = hmac::sign(&self.room_key(room_id), token.as_bytes());
        format!("{token}.{}", hex::encode(tag.as_ref()))
    }

    /// Verify a cookie value and return the token it carries.
    ///
    /// Returns `None` for malformed values and bad signatures.
    pub fn verify(&self, room_id: &str, value: &str) -> Option<String> {
        let (token, signature) = value.rsplit_once('.')?;
        if token.is_empty() {
            return None;
        }

        let provided = hex::decode(signature).ok()?;
        hmac::verify(&self.room_key(room_id), token.as_bytes(), &provided).ok()?;
        Some(token.to_string())
    }

    /// Build the `Set-Cookie` value carrying `token`.
    pub fn cookie(&self, room_id: &str, token: &str) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, self.sign(room_id, token)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .build()
    }

    /// Extract and verify the caller's token from request headers.
    pub fn token_from_headers(&self, room_id: &str, headers: &HeaderMap) -> Option<String> {
        let raw = cookie_value(headers, SESSION_COOKIE_NAME)?;
        self.verify(room_id, &raw)
    }
}

/// Value of the cookie named `name` across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
