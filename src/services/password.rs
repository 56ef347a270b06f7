pub struct PasswordService;

impl PasswordService {
    pub fn hash(plain: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(plain, crate::config::Config::bcrypt_cost())
    }

    pub fn verify(plain: &str, hashed: &str) -> bool {
        bcrypt::verify(plain, hashed).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = PasswordService::hash("hunter2").unwrap();
        assert!(PasswordService::verify("hunter2", &hashed));
        assert!(!PasswordService::verify("hunter3", &hashed));
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!PasswordService::verify("anything", "not-a-bcrypt-hash"));
    }
}
