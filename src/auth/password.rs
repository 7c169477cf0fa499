use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

const HASH_PREFIX: &str = "$argon2";

/// A stored password. Accounts created before hashing was introduced still
/// carry their password verbatim until their next successful login.
///
/// A legacy password that is itself a well-formed argon2 PHC string would be
/// read as `Hashed`; no real password is expected to look like that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Hashed(String),
    Legacy(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Rejected,
    Accepted,
    /// Matched a legacy credential; the caller must store this hash in its place.
    AcceptedLegacy(Credential),
}

impl Credential {
    pub fn parse(stored: &str) -> Self {
        let well_formed = PasswordHash::new(stored)
            .map(|h| h.hash.is_some())
            .unwrap_or(false);
        if stored.starts_with(HASH_PREFIX) && well_formed {
            Credential::Hashed(stored.to_string())
        } else {
            Credential::Legacy(stored.to_string())
        }
    }

    pub fn hash(plain: &str) -> anyhow::Result<Self> {
        hash_password(plain).map(Credential::Hashed)
    }

    pub fn as_stored(&self) -> &str {
        match self {
            Credential::Hashed(s) | Credential::Legacy(s) => s,
        }
    }

    pub fn verify(&self, presented: &str) -> anyhow::Result<Verification> {
        match self {
            Credential::Hashed(hash) => Ok(if verify_password(presented, hash)? {
                Verification::Accepted
            } else {
                Verification::Rejected
            }),
            Credential::Legacy(plain) => {
                if plain == presented {
                    Ok(Verification::AcceptedLegacy(Credential::hash(presented)?))
                } else {
                    Ok(Verification::Rejected)
                }
            }
        }
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
