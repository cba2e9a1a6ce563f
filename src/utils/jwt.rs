use crate::config::JwtConfig;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const ACCESS_TOKEN_TYPE: &str = "access";

// JWT Claims 结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub role: String,       // 用户角色
    pub token_type: String, // token类型
    pub exp: usize,         // Expiration time (时间戳)
    pub iat: usize,         // Issued at (签发时间)
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// JWT 签发与校验，由配置构建
#[derive(Clone)]
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: chrono::Duration,
}

impl JwtUtils {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: chrono::Duration::minutes(config.access_token_expiry),
        }
    }

    /// Access Token 有效期（秒）
    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_token_expiry.num_seconds()
    }

    // 生成 Access Token
    pub fn generate_access_token(
        &self,
        user_id: i64,
        role: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.generate_token_with_expiry(user_id, role, ACCESS_TOKEN_TYPE, self.access_token_expiry)
    }

    // 生成带自定义过期时间的 Token
    pub fn generate_token_with_expiry(
        &self,
        user_id: i64,
        role: &str,
        token_type: &str,
        expiry_duration: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let expiration = now + expiry_duration;

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            token_type: token_type.to_string(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    // 验证 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
    }

    // 验证 Access Token
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let claims = self.verify_token(token)?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str) -> JwtUtils {
        JwtUtils::from_config(&JwtConfig {
            secret: secret.to_string(),
            access_token_expiry: 30,
        })
    }

    #[test]
    fn test_access_token_verifies() {
        let jwt = jwt("test-secret");
        let token = jwt.generate_access_token(42, "teacher").unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.role, "teacher");
        assert_eq!(jwt.access_token_ttl_secs(), 30 * 60);
    }

    #[test]
    fn test_rejects_other_secret_and_type() {
        let token = jwt("one").generate_access_token(1, "admin").unwrap();
        assert!(jwt("two").verify_access_token(&token).is_err());

        let jwt = jwt("one");
        let other = jwt
            .generate_token_with_expiry(1, "admin", "refresh", chrono::Duration::minutes(5))
            .unwrap();
        assert!(jwt.verify_access_token(&other).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = jwt("secret");
        let token = jwt
            .generate_token_with_expiry(1, "admin", "access", chrono::Duration::minutes(-10))
            .unwrap();
        assert!(jwt.verify_access_token(&token).is_err());
    }
}
