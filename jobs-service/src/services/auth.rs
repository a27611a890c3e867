use service_core::error::AppError;
use std::sync::{Arc, OnceLock};

use crate::{
    dtos::auth::{AuthResponse, Identity, LoginRequest, RegisterRequest},
    models::{normalize_email, User},
    services::{JwtService, Store},
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

/// Hash checked against when the handle is unknown, so that both login
/// failure paths pay for one argon2 verification.
static DUMMY_HASH: OnceLock<PasswordHashString> = OnceLock::new();

fn dummy_hash() -> Result<PasswordHashString, anyhow::Error> {
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash.clone());
    }
    let hash = hash_password(&Password::new("dummy-password".to_string()))?;
    Ok(DUMMY_HASH.get_or_init(|| hash).clone())
}

async fn hash_blocking(password: Password) -> Result<PasswordHashString, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalError(e.into()))?
        .map_err(AppError::InternalError)
}

async fn verify_blocking(
    password: Password,
    hash: Option<PasswordHashString>,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || -> Result<bool, anyhow::Error> {
        match hash {
            Some(hash) => verify_password(&password, &hash),
            None => {
                verify_password(&password, &dummy_hash()?)?;
                Ok(false)
            }
        }
    })
    .await
    .map_err(|e| AppError::InternalError(e.into()))?
    .map_err(AppError::InternalError)
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let password_hash = hash_blocking(Password::new(req.secret)).await?;

        let user = User::new(req.display_name, &req.handle, password_hash.into_string());
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");

        let token = self.jwt.issue(&user.id, &user.name)?;
        Ok(AuthResponse {
            identity: Identity::from(&user),
            token,
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&req.handle);
        let user = self.store.find_user_by_email(&email).await?;

        let hash = user
            .as_ref()
            .map(|u| PasswordHashString::new(u.password_hash.clone()));
        let valid = verify_blocking(Password::new(req.secret), hash).await?;

        let user = match user {
            Some(user) if valid => user,
            _ => {
                tracing::info!("Login failed: invalid credentials");
                return Err(AppError::InvalidCredentials);
            }
        };

        tracing::info!(user_id = %user.id, "User logged in");

        let token = self.jwt.issue(&user.id, &user.name)?;
        Ok(AuthResponse {
            identity: Identity::from(&user),
            token,
        })
    }
}
