//! JWT 令牌服务
//!
//! 签发与校验 access/refresh 令牌对（HS256）。refresh 只用于续签，
//! 带 `token_type` 声明防止互相顶替。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::JwtConfig;

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";
const ISSUER: &str = "flash-server";

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID
    pub user_id: i64,
    /// 用户名
    pub username: String,
    /// 令牌类型: access | refresh
    pub token_type: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
}

/// 认证后的当前用户，由中间件注入请求扩展
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    ExpiredToken,

    #[error("wrong token type")]
    WrongTokenType,

    #[error("token generation failed: {0}")]
    GenerationFailed(String),
}

/// JWT 令牌服务
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }

    /// 签发 access 与 refresh 令牌对
    pub fn generate_token_pair(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<(String, String), JwtError> {
        let access = self.generate(user_id, username, TOKEN_TYPE_ACCESS, self.access_ttl_secs)?;
        let refresh = self.generate(user_id, username, TOKEN_TYPE_REFRESH, self.refresh_ttl_secs)?;
        Ok((access, refresh))
    }

    fn generate(
        &self,
        user_id: i64,
        username: &str,
        token_type: &str,
        ttl_secs: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            username: username.to_owned(),
            token_type: token_type.to_owned(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_owned(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                _ => JwtError::InvalidToken(e.to_string()),
            })
    }

    /// 校验 access 令牌
    pub fn validate_access(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate(token)?;
        if claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// 校验 refresh 令牌并续签新的 access 令牌
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, JwtError> {
        let claims = self.validate(refresh_token)?;
        if claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(JwtError::WrongTokenType);
        }
        self.generate(
            claims.user_id,
            &claims.username,
            TOKEN_TYPE_ACCESS,
            self.access_ttl_secs,
        )
    }

    /// 从 `Authorization: Bearer <token>` 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret-at-least-32-bytes-long!!".into(),
            access_ttl_secs: 60,
            refresh_ttl_secs: 3600,
        })
    }

    #[test]
    fn test_token_pair_round_trip() {
        let svc = service();
        let (access, refresh) = svc.generate_token_pair(42, "alice").unwrap();

        let claims = svc.validate_access(&access).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "alice");

        // refresh 不能当 access 用
        assert!(matches!(
            svc.validate_access(&refresh),
            Err(JwtError::WrongTokenType)
        ));
    }

    #[test]
    fn test_refresh_yields_access() {
        let svc = service();
        let (_, refresh) = svc.generate_token_pair(7, "bob").unwrap();
        let access = svc.refresh_access(&refresh).unwrap();
        let claims = svc.validate_access(&access).unwrap();
        assert_eq!(claims.user_id, 7);
    }

    #[test]
    fn test_access_cannot_refresh() {
        let svc = service();
        let (access, _) = svc.generate_token_pair(7, "bob").unwrap();
        assert!(matches!(
            svc.refresh_access(&access),
            Err(JwtError::WrongTokenType)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let (access, _) = svc.generate_token_pair(1, "mallory").unwrap();
        let mut tampered = access.clone();
        tampered.push('x');
        assert!(svc.validate_access(&tampered).is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(
            JwtService::extract_from_header("Bearer abc.def.ghi"),
            Some("abc.def.ghi")
        );
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
    }
}
