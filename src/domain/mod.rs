pub mod entities;
pub mod errors;

pub use entities::User;
pub use errors::UserError;
