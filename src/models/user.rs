//! User model, roles and authentication claims

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

use crate::error::AppError;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as text)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// User account as seen by the loan ledger (no credentials)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub role: Role,
    /// Set and unique for students only
    pub registration_number: Option<String>,
    /// Set and unique for staff only
    pub email: Option<String>,
}

impl User {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Student descriptor, if this user is a student with a registration number
    pub fn student_info(&self) -> Option<StudentInfo> {
        if !self.is_student() {
            return None;
        }
        self.registration_number
            .as_ref()
            .map(|registration_number| StudentInfo {
                id: self.id,
                name: self.name.clone(),
                registration_number: registration_number.clone(),
            })
    }
}

/// Minimal student descriptor returned by ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentInfo {
    pub id: i32,
    pub name: String,
    pub registration_number: String,
}

/// JWT claims for authenticated users.
///
/// Tokens are issued by the authentication service; this server only
/// verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
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

    /// Librarian-only operations (checkout, return, loan listings)
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Not authorized as an admin".to_string()))
        }
    }

    pub fn require_student(&self) -> Result<(), AppError> {
        if self.role == Role::Student {
            Ok(())
        } else {
            Err(AppError::Authorization("Student account required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn claims(role: Role) -> UserClaims {
        let now = Utc::now();
        UserClaims {
            sub: "7".to_string(),
            user_id: 7,
            role,
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Student".parse::<Role>(), Ok(Role::Student));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("librarian".parse::<Role>().is_err());
    }

    #[test]
    fn test_token_roundtrip_and_wrong_secret() {
        let token = claims(Role::Admin).create_token("secret").unwrap();

        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.role, Role::Admin);

        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_requirements() {
        assert!(claims(Role::Admin).require_admin().is_ok());
        assert!(claims(Role::Student).require_admin().is_err());
        assert!(claims(Role::User).require_admin().is_err());
        assert!(claims(Role::Student).require_student().is_ok());
        assert!(claims(Role::Admin).require_student().is_err());
    }

    #[test]
    fn test_student_info_only_for_students() {
        let mut user = User {
            id: 3,
            name: "Nimal".to_string(),
            role: Role::Student,
            registration_number: Some("S1".to_string()),
            email: None,
        };
        assert_eq!(user.student_info().unwrap().registration_number, "S1");

        user.role = Role::Admin;
        assert!(user.student_info().is_none());
    }
}
