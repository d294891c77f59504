pub mod jwt;

pub use jwt::{caller_id, encode_access_token};
