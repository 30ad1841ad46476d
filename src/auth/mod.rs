mod password;
mod token;

pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, is_valid_email, verify_password};
pub use token::{Claims, DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS, TokenError, TokenSigner};
