pub mod claims;
pub mod service;

pub use claims::AccessClaims;
pub use service::{
    cleanup_expired_tokens, generate_tokens, permission_from_token, refresh_tokens,
    validate_access_token, IssuedTokens, TokenError, TokenValidation, UserProfile,
};
