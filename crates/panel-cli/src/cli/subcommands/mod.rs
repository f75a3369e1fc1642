pub mod assign;
pub mod item;
pub mod review;
pub mod user;

pub use assign::AssignCommands;
pub use item::ItemCommands;
pub use review::ReviewCommands;
pub use user::UserCommands;
