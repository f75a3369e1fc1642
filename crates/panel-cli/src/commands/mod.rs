pub mod assign;
pub mod audit;
pub mod dispatch;
pub mod item;
pub mod review;
pub mod shared;
pub mod stats;
pub mod user;
