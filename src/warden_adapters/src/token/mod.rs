pub mod jwt_issuer;

pub use jwt_issuer::{JwtIssuerConfig, JwtTokenIssuer};
