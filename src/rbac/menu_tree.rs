use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::permissions::PermissionSet;
use crate::database::models::{Menu, MenuType};

#[derive(Debug, Clone, Serialize)]
pub struct MenuNode {
    #[serde(flatten)]
    pub menu: Menu,
    pub children: Vec<MenuNode>,
}

/// Assemble flat rows into a forest.
///
/// Roots are rows without a parent. Rows whose parent is not in `menus` are
/// unreachable and dropped. Every `children` array is ordered by
/// `(sort_order, name)`.
pub fn build_menu_tree(menus: Vec<Menu>) -> Vec<MenuNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<Menu>> = HashMap::new();
    for menu in menus {
        by_parent.entry(menu.parent_id).or_default().push(menu);
    }
    attach_children(None, &mut by_parent)
}

fn attach_children(parent: Option<Uuid>, by_parent: &mut HashMap<Option<Uuid>, Vec<Menu>>) -> Vec<MenuNode> {
    let Some(mut level) = by_parent.remove(&parent) else {
        return Vec::new();
    };
    level.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));

    level
        .into_iter()
        .map(|menu| {
            let children = attach_children(Some(menu.id), by_parent);
            MenuNode { menu, children }
        })
        .collect()
}

/// Navigation tree for one user.
///
/// Keeps enabled, non-button entries that need no permission or whose
/// permission is granted, builds the tree, then removes directories left
/// without children.
pub fn filter_user_menus(menus: Vec<Menu>, permissions: &PermissionSet) -> Vec<MenuNode> {
    let visible = menus
        .into_iter()
        .filter(|m| m.enabled && m.menu_type != MenuType::Button)
        .filter(|m| match m.permission_code.as_deref() {
            None | Some("") => true,
            Some(code) => permissions.has(code),
        })
        .collect();

    prune_empty_directories(build_menu_tree(visible))
}

fn prune_empty_directories(nodes: Vec<MenuNode>) -> Vec<MenuNode> {
    nodes
        .into_iter()
        .filter_map(|mut node| {
            node.children = prune_empty_directories(node.children);
            if node.menu.menu_type == MenuType::Directory && node.children.is_empty() {
                None
            } else {
                Some(node)
            }
        })
        .collect()
}

/// True when moving `id` under `new_parent` would make it its own ancestor
pub fn would_create_cycle(menus: &[Menu], id: Uuid, new_parent: Option<Uuid>) -> bool {
    let parents: HashMap<Uuid, Option<Uuid>> = menus.iter().map(|m| (m.id, m.parent_id)).collect();

    let mut visited = HashSet::new();
    let mut cursor = new_parent;
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        // Existing data already loops; refuse rather than spin.
        if !visited.insert(current) {
            return true;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}
