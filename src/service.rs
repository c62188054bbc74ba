use std::sync::{Arc, OnceLock};

use crate::auth::AuthGuard;
use crate::entity::user;
use crate::pagination::{PageWindow, UserList};
use crate::password::{self, validate_password};
use crate::repository::{NewAddress, NewUser, StoreError, UserRepository};
use crate::types::{Address, AddressInput, AuthPayload, LoginInput, User, UserInput};
use crate::ApiError;

pub const EMAIL_TAKEN_MESSAGE: &str = "Email already registered.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials.";
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found.";
pub const INVALID_USER_ID_MESSAGE: &str = "Invalid user id.";

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Hash verified against when the login email is unknown
fn dummy_hash() -> crate::Result<&'static str> {
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash);
    }
    let hash = password::hash_password("no-such-user-0")?;
    Ok(DUMMY_HASH.get_or_init(|| hash))
}

/// Business logic behind every resolver
///
/// Protected operations call the guard before anything else, so a caller
/// without a valid token never reaches the repository.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    guard: AuthGuard,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, guard: AuthGuard) -> Self {
        Self { repository, guard }
    }

    pub fn repository(&self) -> Arc<dyn UserRepository> {
        self.repository.clone()
    }

    /// Create a new user (protected)
    #[tracing::instrument(skip_all, fields(email = %input.email))]
    pub async fn create_user(&self, token: Option<&str>, input: UserInput) -> crate::Result<User> {
        self.guard.check(token)?;
        validate_password(&input.password)?;

        let plain = input.password;
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
            .await
            .map_err(ApiError::internal)??;

        let email = input.email.clone();
        let new_user = NewUser {
            name: input.name,
            email: input.email,
            password_hash,
            birth_date: input.birth_date.map(|d| d.0),
            addresses: input.addresses.into_iter().map(NewAddress::from).collect(),
        };

        match self.repository.create(new_user).await {
            Ok(created) => {
                tracing::info!(user_id = created.id, "created user");
                Ok(created.into())
            }
            Err(StoreError::UniqueViolation(constraint)) => {
                // confirm which record conflicts before blaming the email
                if self.repository.find_by_email(&email).await?.is_some() {
                    Err(ApiError::Input(EMAIL_TAKEN_MESSAGE.to_string()))
                } else {
                    Err(ApiError::internal(format!("unique constraint violated: {}", constraint)))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Authenticate by email and password
    ///
    /// Unknown email and wrong password fail identically.
    #[tracing::instrument(skip_all, fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> crate::Result<AuthPayload> {
        let invalid = || ApiError::Auth(INVALID_CREDENTIALS_MESSAGE.to_string());

        let stored = self.repository.find_by_email(&input.email).await?;

        let plain = input.password;
        let hash = stored.as_ref().map(|u| u.password.clone());
        let matches = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => password::verify_password(&plain, &hash),
            // unknown emails cost one verification too
            None => password::verify_password(&plain, dummy_hash()?).map(|_| false),
        })
        .await
        .map_err(ApiError::internal)??;

        let Some(stored) = stored.filter(|_| matches) else {
            tracing::warn!("login failed");
            return Err(invalid());
        };

        let token = self.guard.issue(stored.id, input.remember_me.unwrap_or(false))?;
        tracing::info!(user_id = stored.id, "user logged in");

        Ok(AuthPayload {
            user: stored.into(),
            token,
        })
    }

    /// Fetch one user by id (protected)
    #[tracing::instrument(skip(self, token))]
    pub async fn user(&self, token: Option<&str>, id: &str) -> crate::Result<User> {
        self.guard.check(token)?;
        let stored = self.find_user(id).await?;
        Ok(stored.into())
    }

    /// Fetch a page of users ordered by name (protected)
    #[tracing::instrument(skip(self, token))]
    pub async fn users(&self, token: Option<&str>, num_users: Option<i32>, skip: Option<i32>) -> crate::Result<UserList> {
        self.guard.check(token)?;
        let window = PageWindow::from_args(num_users, skip)?;

        let (page, total) = self.repository.page(window).await?;
        tracing::debug!(returned = page.len(), total, "read user page");

        Ok(UserList::new(
            page.into_iter().map(User::from).collect(),
            window,
            total,
        ))
    }

    /// Attach a new address to an existing user (protected)
    #[tracing::instrument(skip(self, token, input))]
    pub async fn add_address(&self, token: Option<&str>, user_id: &str, input: AddressInput) -> crate::Result<Address> {
        self.guard.check(token)?;
        let owner = self.find_user(user_id).await?;

        let created = self.repository.add_address(owner.id, input.into()).await?;
        tracing::info!(user_id = owner.id, address_id = created.id, "added address");

        Ok(created.into())
    }

    async fn find_user(&self, id: &str) -> crate::Result<user::Model> {
        let id: i32 = id
            .parse()
            .map_err(|_| ApiError::Input(INVALID_USER_ID_MESSAGE.to_string()))?;

        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))
    }
}
