use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}$").expect("Invalid email regex")
});

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    // 邮箱格式校验：必须包含 @ 和 .
    if !EMAIL_RE.is_match(email) {
        return Err("Email format is invalid");
    }
    Ok(())
}

/// 校验姓名：去除空白后 2..=100 个字符
pub fn validate_full_name(full_name: &str) -> Result<(), &'static str> {
    let count = full_name.trim().chars().count();
    if !(2..=100).contains(&count) {
        return Err("Full name length must be between 2 and 100 characters");
    }
    Ok(())
}

/// 校验作业标题
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    let count = title.trim().chars().count();
    if count == 0 {
        return Err("Title must not be empty");
    }
    if count > 200 {
        return Err("Title must be at most 200 characters");
    }
    Ok(())
}

// 常见弱密码，比较时忽略大小写
const WEAK_PASSWORDS: [&str; 8] = [
    "password1",
    "12345678",
    "123456789",
    "qwerty123",
    "admin123",
    "abcd1234",
    "docente123",
    "escuela123",
];

type PasswordRule = (fn(&str) -> bool, &'static str);

// 每条规则返回 true 表示通过
const PASSWORD_RULES: [PasswordRule; 4] = [
    (
        |p| p.chars().count() >= 8,
        "Password must be at least 8 characters long",
    ),
    (
        |p| p.chars().any(|c| c.is_ascii_uppercase()),
        "Password must contain at least one uppercase letter",
    ),
    (
        |p| p.chars().any(|c| c.is_ascii_lowercase()),
        "Password must contain at least one lowercase letter",
    ),
    (
        |p| p.chars().any(|c| c.is_ascii_digit()),
        "Password must contain at least one digit",
    ),
];

/// 列出密码未满足的策略项
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let mut problems: Vec<&'static str> = PASSWORD_RULES
        .iter()
        .filter(|(passes, _)| !passes(password))
        .map(|(_, message)| *message)
        .collect();

    if WEAK_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        problems.push("Password is too common, please choose a stronger password");
    }
    problems
}

/// 校验密码策略，失败时合并所有问题
pub fn validate_password(password: &str) -> Result<(), String> {
    let problems = password_problems(password);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(validate_email("maria.perez@escuela.edu.mx").is_ok());
        assert!(validate_email("maria.perez@escuela").is_err());
        assert!(validate_email("sin-arroba.mx").is_err());
    }

    #[test]
    fn test_full_name_and_title() {
        assert!(validate_full_name("José Núñez").is_ok());
        assert!(validate_full_name("  J ").is_err());
        assert!(validate_title("Planeación didáctica").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("SecureP@ss1").is_ok());
        assert!(validate_password("Planeacion2025").is_ok());

        assert_eq!(
            password_problems("Ab1"),
            vec!["Password must be at least 8 characters long"]
        );
        assert_eq!(
            password_problems("abcd1234x"),
            vec!["Password must contain at least one uppercase letter"]
        );
        assert_eq!(
            password_problems("ABCD1234X"),
            vec!["Password must contain at least one lowercase letter"]
        );
        assert_eq!(
            password_problems("AbcdEfghi"),
            vec!["Password must contain at least one digit"]
        );
    }

    #[test]
    fn test_common_password() {
        let problems = password_problems("Docente123");
        assert_eq!(
            problems,
            vec!["Password is too common, please choose a stronger password"]
        );
        let err = validate_password("abc").unwrap_err();
        assert!(err.contains("; "));
    }
}
