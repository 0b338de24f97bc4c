//! Request client context.
//!
//! Resolves the bearer credential into a user profile once per request.
//! Session issuance is owned by the account service; this side only hashes
//! the presented token and looks it up. Authorization is enforced here, in
//! one place, through the `require_*` guards — handlers never re-fetch
//! role state.

use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::orm::{sessions, users};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{Error, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use sea_orm::{entity::*, query::*};

/// Roles with moderation powers.
const ROLE_MODERATOR: &str = "moderator";
const ROLE_ADMIN: &str = "admin";

/// Client context passed to routes. `client` is None for guests and for
/// requests whose token did not resolve.
#[derive(Clone, Debug, Default)]
pub struct ClientCtx {
    client: Option<users::Model>,
}

impl ClientCtx {
    fn guest() -> Self {
        Self { client: None }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.client.as_ref().map(|u| u.id)
    }

    pub fn get_user(&self) -> Option<&users::Model> {
        self.client.as_ref()
    }

    pub fn is_user(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_moderator(&self) -> bool {
        matches!(
            self.client.as_ref().map(|u| u.role.as_str()),
            Some(ROLE_MODERATOR) | Some(ROLE_ADMIN)
        )
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.client.as_ref().map(|u| u.role.as_str()), Some(ROLE_ADMIN))
    }

    /// Require a resolved user. Returns the user id.
    pub fn require_login(&self) -> Result<i32, ModerationError> {
        self.get_id().ok_or(ModerationError::Unauthenticated)
    }

    /// Require the moderator or admin role. Returns the user id.
    pub fn require_moderator(&self) -> Result<i32, ModerationError> {
        let id = self.require_login()?;
        if !self.is_moderator() {
            return Err(ModerationError::Forbidden(
                "Moderator role required".to_string(),
            ));
        }
        Ok(id)
    }

    /// Require the admin role. Returns the user id.
    pub fn require_admin(&self) -> Result<i32, ModerationError> {
        let id = self.require_login()?;
        if !self.is_admin() {
            return Err(ModerationError::Forbidden("Admin role required".to_string()));
        }
        Ok(id)
    }

    /// Require ownership of a resource. Returns the user id.
    pub fn require_ownership(&self, resource_user_id: i32) -> Result<i32, ModerationError> {
        let id = self.require_login()?;
        if id != resource_user_id {
            return Err(ModerationError::Forbidden(
                "You don't own this resource".to_string(),
            ));
        }
        Ok(id)
    }

    #[cfg(test)]
    pub fn for_user(user: users::Model) -> Self {
        Self { client: Some(user) }
    }
}

/// Extract the bearer token from the Authorization header.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve a bearer token against the sessions table. Unknown or expired
/// tokens resolve to a guest context; the `require_*` guards turn that
/// into 401 where it matters.
async fn authenticate_token(token: &str) -> Option<users::Model> {
    let db = get_db_pool();
    let token_hash = blake3::hash(token.as_bytes()).to_string();
    let now = Utc::now().naive_utc();

    let session = sessions::Entity::find()
        .filter(sessions::Column::TokenHash.eq(token_hash))
        .filter(sessions::Column::ExpiresAt.gt(now))
        .one(db)
        .await
        .ok()??;

    users::Entity::find_by_id(session.user_id)
        .one(db)
        .await
        .ok()?
}

/// This implementation is what provides the `client: ClientCtx` parameter
/// in route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);

        Box::pin(async move {
            match token {
                Some(token) => match authenticate_token(&token).await {
                    Some(user) => Ok(ClientCtx {
                        client: Some(user),
                    }),
                    None => Ok(ClientCtx::guest()),
                },
                None => Ok(ClientCtx::guest()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> users::Model {
        let now = Utc::now().naive_utc();
        users::Model {
            id: 1,
            name: "tester".to_string(),
            email: None,
            role: role.to_string(),
            trust_score: 70,
            violations: 0,
            report_count: 0,
            is_banned: false,
            banned_reason: None,
            banned_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_guest_has_no_id() {
        let ctx = ClientCtx::guest();
        assert!(!ctx.is_user());
        assert!(ctx.require_login().is_err());
    }

    #[test]
    fn test_member_is_not_moderator() {
        let ctx = ClientCtx::for_user(user("member"));
        assert!(ctx.require_login().is_ok());
        assert!(ctx.require_moderator().is_err());
        assert!(ctx.require_admin().is_err());
    }

    #[test]
    fn test_moderator_roles() {
        let ctx = ClientCtx::for_user(user("moderator"));
        assert!(ctx.require_moderator().is_ok());
        assert!(ctx.require_admin().is_err());

        let ctx = ClientCtx::for_user(user("admin"));
        assert!(ctx.require_moderator().is_ok());
        assert!(ctx.require_admin().is_ok());
    }

    #[test]
    fn test_ownership() {
        let ctx = ClientCtx::for_user(user("member"));
        assert!(ctx.require_ownership(1).is_ok());
        assert!(ctx.require_ownership(2).is_err());
    }
}
