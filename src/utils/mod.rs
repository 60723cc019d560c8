pub mod jwt;

pub use jwt::{decode_jwt, encode_access_token};
