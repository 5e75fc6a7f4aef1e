//! Access token claims and validation.

pub mod claims;
pub mod validator;

pub use claims::{Audience, Claims};
pub use validator::TokenValidator;
