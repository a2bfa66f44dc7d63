pub mod menu;
pub mod online_user;
pub mod permission;
pub mod refresh_token;
pub mod role;
pub mod user;

pub use menu::{Menu, MenuType};
pub use online_user::OnlineUser;
pub use permission::Permission;
pub use refresh_token::RefreshToken;
pub use role::Role;
pub use user::User;
