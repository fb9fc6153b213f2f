//! Caller identity as supplied by the identity service

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Resident,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims issued by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    /// Hostel the caller belongs to (from the room directory)
    pub hostel_id: i32,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Sign claims into a token (the identity service does this in production)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    // Authorization checks
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Admin rights required".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role >= Role::Staff {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff rights required".to_string()))
        }
    }

    /// Resolve the user an operation is performed for.
    /// Acting on behalf of someone else requires staff rights.
    pub fn acting_for(&self, user_id: Option<i32>) -> Result<i32, AppError> {
        match user_id {
            Some(id) if id != self.user_id => {
                self.require_staff()?;
                Ok(id)
            }
            _ => Ok(self.user_id),
        }
    }

    /// Resolve the hostel an operation is scoped to.
    /// Only admins may look at other hostels.
    pub fn hostel_scope(&self, hostel_id: Option<i32>) -> Result<i32, AppError> {
        match hostel_id {
            Some(id) if id != self.hostel_id => {
                self.require_admin()?;
                Ok(id)
            }
            _ => Ok(self.hostel_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        UserClaims {
            sub: "u7".to_string(),
            user_id: 7,
            role,
            hostel_id: 1,
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = claims(Role::Staff).create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.role, Role::Staff);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_acting_for_others_needs_staff() {
        assert_eq!(claims(Role::Resident).acting_for(None).unwrap(), 7);
        assert_eq!(claims(Role::Resident).acting_for(Some(7)).unwrap(), 7);
        assert!(claims(Role::Resident).acting_for(Some(8)).is_err());
        assert_eq!(claims(Role::Staff).acting_for(Some(8)).unwrap(), 8);
    }

    #[test]
    fn test_hostel_scope() {
        assert_eq!(claims(Role::Resident).hostel_scope(None).unwrap(), 1);
        assert!(claims(Role::Staff).hostel_scope(Some(2)).is_err());
        assert_eq!(claims(Role::Admin).hostel_scope(Some(2)).unwrap(), 2);
    }
}
