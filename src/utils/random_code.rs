use rand::Rng;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%";

fn random_from(charset: &[u8], length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

/// 生成随机字母数字串
pub fn generate_random_code(length: usize) -> String {
    random_from(ALPHANUMERIC, length)
}

/// 生成随机密码（保证包含大小写字母与数字）
pub fn generate_random_password(length: usize) -> String {
    loop {
        let password = random_from(PASSWORD_CHARSET, length.max(8));
        if password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_lowercase())
            && password.chars().any(|c| c.is_ascii_digit())
        {
            return password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validate::validate_password;

    #[test]
    fn test_random_code() {
        let code = generate_random_code(32);
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, generate_random_code(32));
    }

    #[test]
    fn test_random_password_meets_policy() {
        for _ in 0..20 {
            assert!(validate_password(&generate_random_password(16)).is_ok());
        }
    }
}
