use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use secrecy::{ExposeSecret, Secret};

use warden_core::{CredentialHasher, HasherError};

/// Argon2id work-factor parameters. The defaults match the interactive
/// profile; production values come from configuration.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_kib: 15000,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Salted Argon2id hashing for passwords and token secrets.
///
/// Hashing and verification are CPU-bound by design, so both run under
/// `spawn_blocking` with the caller's span carried along; the async
/// executor never stalls on the work factor.
#[derive(Debug, Clone)]
pub struct Argon2CredentialHasher {
    settings: Argon2Settings,
}

impl Argon2CredentialHasher {
    pub fn new(settings: Argon2Settings) -> Self {
        Self { settings }
    }
}

impl Default for Argon2CredentialHasher {
    fn default() -> Self {
        Self::new(Argon2Settings::default())
    }
}

fn build_argon2(settings: Argon2Settings) -> Result<Argon2<'static>, String> {
    let params = Params::new(
        settings.memory_kib,
        settings.iterations,
        settings.parallelism,
        None,
    )
    .map_err(|e| e.to_string())?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2CredentialHasher {
    #[tracing::instrument(name = "Computing credential hash", skip_all)]
    async fn hash(&self, secret: &Secret<String>) -> Result<Secret<String>, HasherError> {
        let secret = secret.clone();
        let settings = self.settings;
        let current_span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            current_span.in_scope(|| {
                let salt = SaltString::generate(rand_core::OsRng);
                build_argon2(settings)
                    .map_err(HasherError::Hash)?
                    .hash_password(secret.expose_secret().as_bytes(), &salt)
                    .map(|hash| Secret::from(hash.to_string()))
                    .map_err(|e| HasherError::Hash(e.to_string()))
            })
        })
        .await
        .map_err(|e| HasherError::Hash(e.to_string()))?
    }

    #[tracing::instrument(name = "Verifying credential hash", skip_all)]
    async fn verify(
        &self,
        candidate: &Secret<String>,
        hash: &Secret<String>,
    ) -> Result<bool, HasherError> {
        let candidate = candidate.clone();
        let hash = hash.clone();
        let settings = self.settings;
        let current_span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            current_span.in_scope(|| {
                let parsed = PasswordHash::new(hash.expose_secret())
                    .map_err(|e| HasherError::Verify(e.to_string()))?;
                let argon2 = build_argon2(settings).map_err(HasherError::Verify)?;
                match argon2.verify_password(candidate.expose_secret().as_bytes(), &parsed) {
                    Ok(()) => Ok(true),
                    Err(argon2::password_hash::Error::Password) => Ok(false),
                    Err(e) => Err(HasherError::Verify(e.to_string())),
                }
            })
        })
        .await
        .map_err(|e| HasherError::Verify(e.to_string()))?
    }
}
