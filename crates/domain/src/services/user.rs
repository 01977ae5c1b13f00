//! Account sign-up, login and Telegram chat linking.

use std::sync::Arc;

use tracing::{info, warn};

use shared::jwt::JwtConfig;
use shared::password::{hash_password, verify_password};
use shared::validation::normalize_handle;

use crate::error::DomainError;
use crate::models::{
    LoginRequest, LoginResponse, NewUser, ProfileResponse, ProfileUpdate, PublicUserResponse,
    SignUpRequest, UpdateProfileRequest, User, UserResponse,
};
use crate::ports::{RepositoryError, UserRepository};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    jwt: JwtConfig,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtConfig) -> Self {
        Self { users, jwt }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User, DomainError> {
        let password_hash = hash_password(&request.password)
            .map_err(|e| DomainError::Validation(e.to_string()))?;

        let new_user = NewUser {
            username: request.username.trim().to_string(),
            password_hash,
            email: request.email,
            phone: request.phone,
            full_name: request.full_name,
            user_type: request.user_type,
            telegram_user: request
                .telegram_user
                .as_deref()
                .map(normalize_handle)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
        };

        let user = match self.users.create(new_user).await {
            Ok(user) => user,
            Err(RepositoryError::Conflict(_)) => {
                return Err(DomainError::Conflict(
                    "username or telegram user already taken".to_string(),
                ))
            }
            Err(e) => return Err(DomainError::repository("creating user", e)),
        };

        info!(user_id = user.id, user_type = %user.user_type, "User signed up");
        Ok(user)
    }

    pub async fn log_in(&self, request: LoginRequest) -> Result<LoginResponse, DomainError> {
        let user = self
            .users
            .find_by_username(request.username.trim())
            .await
            .map_err(|e| DomainError::repository("loading user", e))?
            .ok_or(DomainError::InvalidCredentials)?;

        let matches = verify_password(&request.password, &user.password_hash).unwrap_or(false);
        if !matches {
            warn!(user_id = user.id, "Failed login attempt");
            return Err(DomainError::InvalidCredentials);
        }

        let (access_token, _jti) = self
            .jwt
            .generate_access_token(user.id, user.user_type.as_str())
            .map_err(|e| DomainError::Validation(e.to_string()))?;

        info!(user_id = user.id, "User logged in");
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_token_expiry_secs,
            user: UserResponse::from(user),
        })
    }

    pub async fn find(&self, user_id: i64) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(|e| DomainError::repository("loading user", e))?
            .ok_or(DomainError::UserNotFound)
    }

    pub async fn profile(&self, user_id: i64) -> Result<ProfileResponse, DomainError> {
        self.find(user_id).await.map(ProfileResponse::from)
    }

    /// Applies the caller's profile changes. A new Telegram handle unlinks the old chat.
    pub async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, DomainError> {
        let update = ProfileUpdate {
            username: request
                .username
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            email: request.email,
            phone: request.phone,
            full_name: request.full_name,
            telegram_user: request.telegram_user.map(|handle| {
                Some(normalize_handle(&handle).to_string()).filter(|h| !h.is_empty())
            }),
        };

        let user = match self.users.update_profile(user_id, update).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(DomainError::UserNotFound),
            Err(RepositoryError::Conflict(_)) => {
                return Err(DomainError::Conflict(
                    "username or telegram user already taken".to_string(),
                ))
            }
            Err(e) => return Err(DomainError::repository("updating profile", e)),
        };

        info!(user_id = user.id, "Profile updated");
        Ok(ProfileResponse::from(user))
    }

    pub async fn list_users(&self) -> Result<Vec<PublicUserResponse>, DomainError> {
        let users = self
            .users
            .list_all()
            .await
            .map_err(|e| DomainError::repository("listing users", e))?;
        Ok(users.into_iter().map(PublicUserResponse::from).collect())
    }

    pub async fn public_user(&self, user_id: i64) -> Result<PublicUserResponse, DomainError> {
        self.find(user_id).await.map(PublicUserResponse::from)
    }

    /// Deletes an account with its memberships and payments. Managers of an
    /// apartment must delete or hand over the apartment first.
    pub async fn delete_user(&self, manager_id: i64, user_id: i64) -> Result<(), DomainError> {
        let deleted = match self.users.delete(user_id).await {
            Ok(deleted) => deleted,
            Err(RepositoryError::Conflict(_)) => {
                return Err(DomainError::Conflict(
                    "user still manages an apartment".to_string(),
                ))
            }
            Err(e) => return Err(DomainError::repository("deleting user", e)),
        };
        if !deleted {
            return Err(DomainError::UserNotFound);
        }

        info!(user_id = manager_id, deleted_user_id = user_id, "User deleted");
        Ok(())
    }

    /// Links a Telegram chat to the user owning `handle`. Returns whether one matched.
    pub async fn link_telegram_chat(&self, handle: &str, chat_id: i64) -> Result<bool, DomainError> {
        let linked = self
            .users
            .set_telegram_chat_id(normalize_handle(handle), chat_id)
            .await
            .map_err(|e| DomainError::repository("linking telegram chat", e))?;
        if linked {
            info!(handle = %handle, "Telegram chat linked");
        } else {
            warn!(handle = %handle, "Telegram chat for unknown user");
        }
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;
    use crate::services::testing::InMemoryRepositories;
    use fake::faker::internet::en::Username;
    use fake::Fake;

    fn service() -> (Arc<InMemoryRepositories>, UserService) {
        let repos = Arc::new(InMemoryRepositories::new());
        let jwt = JwtConfig::new("user-service-test-secret", 900, 0).unwrap();
        (repos.clone(), UserService::new(repos, jwt))
    }

    fn signup(username: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            password: "resident-password".to_string(),
            email: None,
            phone: None,
            full_name: Some("Test Resident".to_string()),
            user_type: UserType::Resident,
            telegram_user: Some("@resident_tg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_sign_up_hashes_password_and_strips_at() {
        let (repos, service) = service();
        let username: String = Username().fake();

        let user = service.sign_up(signup(&username)).await.unwrap();
        assert_ne!(user.password_hash, "resident-password");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_eq!(user.telegram_user.as_deref(), Some("resident_tg"));
        assert!(repos.user(user.id).is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (_, service) = service();
        service.sign_up(signup("alice")).await.unwrap();

        let mut again = signup("alice");
        again.telegram_user = None;
        assert!(matches!(service.sign_up(again).await, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_log_in_issues_token() {
        let (_, service) = service();
        let user = service.sign_up(signup("alice")).await.unwrap();

        let response = service
            .log_in(LoginRequest {
                username: "alice".to_string(),
                password: "resident-password".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.user.id, user.id);

        let claims = service.jwt.validate_token(&response.access_token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.user_type, "resident");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (_, service) = service();
        service.sign_up(signup("alice")).await.unwrap();

        let wrong_password = service
            .log_in(LoginRequest {
                username: "alice".to_string(),
                password: "nope-nope-nope".to_string(),
            })
            .await;
        assert!(matches!(wrong_password, Err(DomainError::InvalidCredentials)));

        let unknown = service
            .log_in(LoginRequest {
                username: "bob".to_string(),
                password: "resident-password".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(DomainError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_link_telegram_chat() {
        let (repos, service) = service();
        let user = service.sign_up(signup("alice")).await.unwrap();

        assert!(service.link_telegram_chat("@resident_tg", 555).await.unwrap());
        assert_eq!(repos.user(user.id).unwrap().telegram_chat_id, Some(555));
        assert!(!service.link_telegram_chat("someone_else", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_changes_fields_and_resets_chat() {
        let (repos, service) = service();
        let user = service.sign_up(signup("alice")).await.unwrap();
        repos.set_chat_id(user.id, 777);
        assert!(service.profile(user.id).await.unwrap().telegram_connected);

        let unchanged_handle = UpdateProfileRequest {
            full_name: Some("Alice Smith".to_string()),
            telegram_user: Some("@resident_tg".to_string()),
            ..Default::default()
        };
        let profile = service.update_profile(user.id, unchanged_handle).await.unwrap();
        assert_eq!(profile.user.full_name.as_deref(), Some("Alice Smith"));
        assert!(profile.telegram_connected);

        let new_handle = UpdateProfileRequest {
            telegram_user: Some("@alice_new".to_string()),
            ..Default::default()
        };
        let profile = service.update_profile(user.id, new_handle).await.unwrap();
        assert_eq!(profile.user.telegram_user.as_deref(), Some("alice_new"));
        assert!(!profile.telegram_connected);
        assert_eq!(repos.user(user.id).unwrap().telegram_chat_id, None);
    }

    #[tokio::test]
    async fn test_update_profile_taken_username_conflicts() {
        let (_, service) = service();
        service.sign_up(signup("alice")).await.unwrap();
        let mut bob = signup("bobby");
        bob.telegram_user = None;
        let bob = service.sign_up(bob).await.unwrap();

        let steal = UpdateProfileRequest {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile(bob.id, steal).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            service.update_profile(9_999, UpdateProfileRequest::default()).await,
            Err(DomainError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete_users() {
        let (repos, service) = service();
        let manager = repos.add_user("manager", UserType::Manager, None);
        let apartment = repos.add_apartment(manager.id);
        let resident = service.sign_up(signup("alice")).await.unwrap();
        repos.add_member(resident.id, apartment.id);

        let listed = service.list_users().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(service.public_user(resident.id).await.unwrap().username, "alice");

        service.delete_user(manager.id, resident.id).await.unwrap();
        assert!(repos.user(resident.id).is_none());
        assert!(repos.membership(resident.id, apartment.id).is_none());
        assert!(matches!(
            service.delete_user(manager.id, resident.id).await,
            Err(DomainError::UserNotFound)
        ));

        let still_managing = service.delete_user(manager.id, manager.id).await;
        assert!(matches!(still_managing, Err(DomainError::Conflict(_))));
    }
}
