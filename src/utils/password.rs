use crate::config::Argon2Config;
use crate::errors::AppError;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

/// 哈希密码
pub fn hash_password(password: &str, config: &Argon2Config) -> Result<String, AppError> {
    let params = Params::new(
        config.memory_cost,
        config.time_cost,
        config.parallelism,
        None,
    )
    .map_err(|e| AppError::validation(format!("Argon2 参数错误: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::validation(format!("密码哈希失败: {e}")))?;
    Ok(hash.to_string())
}

/// 验证密码（参数从哈希串中读取）
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let config = Argon2Config {
            memory_cost: 8 * 1024,
            time_cost: 1,
            parallelism: 1,
        };
        let hash = hash_password("Docente2025", &config).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Docente2025", &hash));
        assert!(!verify_password("docente2025", &hash));
        assert!(!verify_password("Docente2025", "not-a-hash"));
    }

    #[test]
    fn test_invalid_params() {
        let config = Argon2Config {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
        };
        assert!(hash_password("whatever", &config).is_err());
    }
}
