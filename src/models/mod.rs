pub mod user;
pub mod company;
pub mod job;
pub mod application;

pub use user::*;
pub use company::*;
pub use job::*;
pub use application::*;
