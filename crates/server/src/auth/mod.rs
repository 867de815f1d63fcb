//! 认证：密码哈希与签名的 Bearer 令牌。

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{TokenError, TokenIssuer, TokenKind, TokenPair};
