use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    /// Grouping node; hidden from users when nothing beneath it is visible
    Directory,
    Menu,
    /// In-page action; never part of the navigation tree
    Button,
}

impl MenuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuType::Directory => "directory",
            MenuType::Menu => "menu",
            MenuType::Button => "button",
        }
    }
}

impl fmt::Display for MenuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown menu type '{0}' (expected directory, menu or button)")]
pub struct UnknownMenuType(pub String);

impl FromStr for MenuType {
    type Err = UnknownMenuType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "directory" | "dir" => Ok(MenuType::Directory),
            "menu" => Ok(MenuType::Menu),
            "button" => Ok(MenuType::Button),
            _ => Err(UnknownMenuType(s.to_string())),
        }
    }
}

impl TryFrom<String> for MenuType {
    type Error = UnknownMenuType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Menu {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub path: Option<String>,
    pub component: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
    #[sqlx(try_from = "String")]
    pub menu_type: MenuType,
    /// Permission required to see this entry; `None` means visible to every signed-in user
    pub permission_code: Option<String>,
    pub hidden: bool,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}
