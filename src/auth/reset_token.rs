use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{
    auth::claims::{ResetClaims, TokenPurpose},
    config::ResetTokenConfig,
    error::{AppError, AppResult},
    state::AppState,
};

/// How long a reset link stays usable.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Signs and checks self-contained password reset tokens. Nothing is
/// persisted, so a token stays valid for its whole window even after use.
#[derive(Clone)]
pub struct ResetTokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl FromRef<AppState> for ResetTokenKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.reset_token)
    }
}

impl ResetTokenKeys {
    pub fn new(cfg: &ResetTokenConfig) -> Self {
        let ResetTokenConfig { secret, issuer } = cfg;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.clone(),
        }
    }

    pub fn issue(&self, email: &str) -> AppResult<String> {
        self.issue_at(email, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, email: &str, issued_at: OffsetDateTime) -> AppResult<String> {
        let exp = issued_at + Duration::seconds(RESET_TOKEN_TTL_SECS);
        let claims = ResetClaims {
            sub: email.to_string(),
            iat: issued_at.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            purpose: TokenPurpose::PasswordReset,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(e.into()))?;
        debug!(%email, "reset token signed");
        Ok(token)
    }

    /// Returns the email the token was issued for.
    pub fn verify(&self, token: &str) -> AppResult<String> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<ResetClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => {
                    warn!(error = %e, "reset token rejected");
                    AppError::TokenInvalid
                }
            }
        })?;

        if data.claims.purpose != TokenPurpose::PasswordReset {
            return Err(AppError::TokenInvalid);
        }
        debug!(email = %data.claims.sub, "reset token verified");
        Ok(data.claims.sub)
    }
}
