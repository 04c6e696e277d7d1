//! HMAC-signed custom tokens and message signatures.
//!
//! A custom token is `base64url(claims).base64url(hmac)`, where the claims
//! are JSON with the user ID, email, issue time and expiry. The same signer
//! also authenticates object download URLs; callers prefix their messages
//! so a signature for one use never verifies for the other.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use stockroom_core::{Email, UserId};

type HmacSha256 = Hmac<Sha256>;

/// How long a custom token stays valid.
pub const TOKEN_TTL: TimeDelta = TimeDelta::hours(1);

const TOKEN_PREFIX: &[u8] = b"token:";

/// Errors from signing or verifying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not two base64url parts around a `.`, or the claims are not JSON.
    #[error("malformed token")]
    Malformed,
    /// The signature does not match.
    #[error("invalid signature")]
    BadSignature,
    /// The token is past its expiry.
    #[error("token expired")]
    Expired,
    /// The signing key was rejected by the MAC.
    #[error("invalid signing key")]
    Key,
}

/// Claims carried by a custom token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User the token signs in as.
    pub uid: UserId,
    /// That user's email at mint time.
    pub email: Email,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Signs and verifies with the server secret.
#[derive(Clone)]
pub struct TokenSigner {
    key: SecretString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer from the server secret.
    #[must_use]
    pub const fn new(key: SecretString) -> Self {
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes()).map_err(|_| TokenError::Key)
    }

    /// HMAC-SHA256 of `message`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the key is rejected.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Check `signature` against `message` in constant time.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::BadSignature` on mismatch.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), TokenError> {
        let mut mac = self.mac()?;
        mac.update(message);
        mac.verify_slice(signature)
            .map_err(|_| TokenError::BadSignature)
    }

    /// Mint a custom token for a user, valid for [`TOKEN_TTL`].
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the key is rejected.
    pub fn mint(&self, uid: UserId, email: &Email) -> Result<String, TokenError> {
        self.mint_at(uid, email, Utc::now())
    }

    /// Mint a custom token as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the key is rejected.
    pub fn mint_at(
        &self,
        uid: UserId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            uid,
            email: email.clone(),
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(&token_message(&encoded))?;
        Ok(format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify a custom token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, forged or expired.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_token_at(token, Utc::now())
    }

    /// Verify a custom token as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, forged or expired.
    pub fn verify_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let (encoded, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        self.verify(&token_message(encoded), &signature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn token_message(encoded_claims: &str) -> Vec<u8> {
    [TOKEN_PREFIX, encoded_claims.as_bytes()].concat()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer(key: &str) -> TokenSigner {
        TokenSigner::new(SecretString::from(key.to_owned()))
    }

    fn email() -> Email {
        Email::parse("cashier@store.test").unwrap()
    }

    #[test]
    fn test_mint_and_verify() {
        let s = signer("k7$Qp2!vX9@mL4#zR8&wN1*tB6^yC3%d");
        let token = s.mint(UserId::new(7), &email()).unwrap();
        let claims = s.verify_token(&token).unwrap();
        assert_eq!(claims.uid, UserId::new(7));
        assert_eq!(claims.email, email());
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL.num_seconds());
    }

    #[test]
    fn test_rejects_other_key() {
        let token = signer("first-key-0123456789abcdefghijkl")
            .mint(UserId::new(1), &email())
            .unwrap();
        assert_eq!(
            signer("other-key-0123456789abcdefghijkl").verify_token(&token),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_rejects_tampered_claims() {
        let s = signer("k7$Qp2!vX9@mL4#zR8&wN1*tB6^yC3%d");
        let token = s.mint(UserId::new(1), &email()).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            br#"{"uid":2,"email":"boss@store.test","iat":0,"exp":99999999999}"#,
        );
        assert_eq!(
            s.verify_token(&format!("{forged_claims}.{sig}")),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_expiry() {
        let s = signer("k7$Qp2!vX9@mL4#zR8&wN1*tB6^yC3%d");
        let issued = Utc::now() - TimeDelta::hours(2);
        let token = s.mint_at(UserId::new(1), &email(), issued).unwrap();
        assert_eq!(s.verify_token(&token), Err(TokenError::Expired));
        assert!(
            s.verify_token_at(&token, issued + TimeDelta::minutes(59))
                .is_ok()
        );
    }

    #[test]
    fn test_malformed() {
        let s = signer("k7$Qp2!vX9@mL4#zR8&wN1*tB6^yC3%d");
        assert_eq!(s.verify_token("no-dot"), Err(TokenError::Malformed));
        assert_eq!(s.verify_token("a.!!!"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_message_signature_is_not_a_token_signature() {
        let s = signer("k7$Qp2!vX9@mL4#zR8&wN1*tB6^yC3%d");
        let claims = URL_SAFE_NO_PAD.encode(
            br#"{"uid":1,"email":"cashier@store.test","iat":0,"exp":99999999999}"#,
        );
        let raw_sig = URL_SAFE_NO_PAD.encode(s.sign(claims.as_bytes()).unwrap());
        assert_eq!(
            s.verify_token(&format!("{claims}.{raw_sig}")),
            Err(TokenError::BadSignature)
        );
    }
}
