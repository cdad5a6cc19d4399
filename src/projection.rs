use crate::app::NavigationState;
use crate::classify::{format_type, matches_search, matches_tab};
use crate::model::{EntityCache, ResourceTab, ViewKind};

pub const PLACEHOLDER_CELL: &str = "-";
const GROUP_STATUS: &str = "Available";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnHint {
    pub title: &'static str,
    pub width: u16,
}

/// Rows and column layout for the active view.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Projection {
    pub columns: Vec<ColumnHint>,
    pub rows: Vec<Vec<String>>,
    /// Set when `rows` holds a single informational row instead of data.
    pub empty_message: Option<String>,
}

impl Projection {
    /// Rows that stand for real entities.
    pub fn data_len(&self) -> usize {
        if self.empty_message.is_some() {
            0
        } else {
            self.rows.len()
        }
    }
}

pub fn build_rows(state: &NavigationState, cache: &EntityCache, width: u16) -> Projection {
    match state.view {
        ViewKind::Subscriptions => subscription_rows(cache, width),
        ViewKind::ResourceGroups => resource_group_rows(state, cache, width),
        ViewKind::Resources => resource_rows(state, cache, width),
    }
}

fn columns(width: u16, layout: [(&'static str, u32); 3]) -> Vec<ColumnHint> {
    layout
        .into_iter()
        .map(|(title, percent)| ColumnHint {
            title,
            width: (u32::from(width) * percent / 100) as u16,
        })
        .collect()
}

fn subscription_rows(cache: &EntityCache, width: u16) -> Projection {
    let rows = cache
        .subscriptions()
        .iter()
        .map(|subscription| {
            vec![
                subscription.display_name.clone(),
                subscription.id.clone(),
                subscription.state.label().to_string(),
            ]
        })
        .collect();

    Projection {
        columns: columns(width, [("Name", 40), ("ID", 40), ("State", 20)]),
        rows,
        empty_message: None,
    }
}

fn resource_group_rows(state: &NavigationState, cache: &EntityCache, width: u16) -> Projection {
    let rows = state
        .selected_subscription_id
        .as_deref()
        .map(|subscription_id| cache.resource_groups(subscription_id))
        .unwrap_or(&[])
        .iter()
        .map(|group| {
            vec![
                group.name.clone(),
                group.location.clone(),
                GROUP_STATUS.to_string(),
            ]
        })
        .collect();

    Projection {
        columns: columns(width, [("Name", 50), ("Location", 30), ("Status", 20)]),
        rows,
        empty_message: None,
    }
}

fn resource_rows(state: &NavigationState, cache: &EntityCache, width: u16) -> Projection {
    // A query committed with Enter keeps filtering after search mode ends;
    // only cancel clears it.
    let query = state.search_query.as_str();
    let mut rows = match state.resource_group_key() {
        Some(key) => cache
            .resources(&key)
            .iter()
            .filter(|resource| matches_tab(&resource.resource_type, state.active_tab))
            .filter(|resource| matches_search(&resource.name, query))
            .map(|resource| {
                vec![
                    resource.name.clone(),
                    format_type(&resource.resource_type),
                    resource.status().to_string(),
                ]
            })
            .collect::<Vec<_>>(),
        None => Vec::new(),
    };

    let mut empty_message = None;
    if rows.is_empty() {
        let message = if query.is_empty() {
            empty_tab_message(state.active_tab)
        } else {
            format!("No matches for '{query}'")
        };
        rows.push(vec![
            message.clone(),
            PLACEHOLDER_CELL.to_string(),
            PLACEHOLDER_CELL.to_string(),
        ]);
        empty_message = Some(message);
    }

    Projection {
        columns: columns(width, [("Name", 40), ("Type", 40), ("Status", 20)]),
        rows,
        empty_message,
    }
}

fn empty_tab_message(tab: ResourceTab) -> String {
    match tab {
        ResourceTab::All => "No resources found in this resource group".to_string(),
        tab => format!(
            "No {} found in this resource group",
            tab.title().to_ascii_lowercase()
        ),
    }
}
