pub mod guard;
pub mod token;

pub use guard::AuthenticatedUser;
pub use token::{TokenError, TokenManager};
