pub mod assignment;
pub mod class;
pub mod common;
pub mod event;
pub mod pagination;
pub mod participant;
pub mod present;
pub mod statistics;
pub mod user;

pub use assignment::*;
pub use class::*;
pub use common::*;
pub use event::*;
pub use pagination::*;
pub use participant::*;
pub use present::*;
pub use statistics::*;
pub use user::*;
