pub mod jwt;
pub mod pairing;

pub use jwt::*;
pub use pairing::{Pairing, plan_cycle};
