// Re-export all model types
pub use self::contact::*;
pub use self::errors::*;
pub use self::garage::*;
pub use self::payment::*;
pub use self::record::*;
pub use self::upload::*;
pub use self::user::*;
pub use self::validation::*;
pub use self::zone::*;

mod contact;
mod errors;
mod garage;
mod payment;
mod record;
mod upload;
mod user;
mod validation;
mod zone;
