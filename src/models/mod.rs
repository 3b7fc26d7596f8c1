mod order;
mod user;

pub use order::*;
pub use user::*;
