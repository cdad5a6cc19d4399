use crate::classify::preselect_tab;
use crate::fetch::{FetchEvent, FetchRequest};
use crate::input::Action;
use crate::model::{EntityCache, ResourceGroupKey, ResourceTab, ViewKind};
use crate::projection::{Projection, build_rows};
use chrono::{DateTime, Local};
use tracing::{debug, warn};

/// Rows taken by the header, tab bar, footer and table chrome.
const TABLE_CHROME_ROWS: u16 = 8;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Fetch(FetchRequest),
}

/// Where the user is in the hierarchy and how the current view is filtered.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NavigationState {
    pub view: ViewKind,
    pub selected_subscription_id: Option<String>,
    pub selected_resource_group: Option<String>,
    pub active_tab: ResourceTab,
    pub search_mode: bool,
    pub search_query: String,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            view: ViewKind::Subscriptions,
            selected_subscription_id: None,
            selected_resource_group: None,
            active_tab: ResourceTab::All,
            search_mode: false,
            search_query: String::new(),
            loading: false,
            last_error: None,
        }
    }
}

impl NavigationState {
    pub fn resource_group_key(&self) -> Option<ResourceGroupKey> {
        let subscription_id = self.selected_subscription_id.as_deref()?;
        let resource_group = self.selected_resource_group.as_deref()?;
        Some(ResourceGroupKey::new(subscription_id, resource_group))
    }

    /// The view and the drill-down path agree with each other.
    pub fn is_consistent(&self) -> bool {
        let subscription = self
            .selected_subscription_id
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        let group = self
            .selected_resource_group
            .as_deref()
            .is_some_and(|name| !name.is_empty());
        match self.view {
            ViewKind::Subscriptions => {
                self.selected_subscription_id.is_none() && self.selected_resource_group.is_none()
            }
            ViewKind::ResourceGroups => subscription && self.selected_resource_group.is_none(),
            ViewKind::Resources => subscription && group,
        }
    }

    fn clear_search(&mut self) {
        self.search_mode = false;
        self.search_query.clear();
    }
}

pub struct App {
    running: bool,
    nav: NavigationState,
    cache: EntityCache,
    pending: Option<FetchRequest>,
    preselect_on_arrival: bool,
    selected: usize,
    viewport_width: u16,
    viewport_height: u16,
    status: String,
    show_help: bool,
    last_refreshed: Option<DateTime<Local>>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Starts on the subscription list with its fetch already outstanding;
    /// the runtime issues [`App::initial_command`] before the first event.
    pub fn new() -> Self {
        Self {
            running: true,
            nav: NavigationState {
                loading: true,
                ..NavigationState::default()
            },
            cache: EntityCache::default(),
            pending: Some(FetchRequest::Subscriptions),
            preselect_on_arrival: false,
            selected: 0,
            viewport_width: 80,
            viewport_height: 24,
            status: "Loading subscriptions…".to_string(),
            show_help: false,
            last_refreshed: None,
        }
    }

    pub fn initial_command(&self) -> AppCommand {
        self.pending
            .clone()
            .map(AppCommand::Fetch)
            .unwrap_or(AppCommand::None)
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        if self.nav.search_mode {
            InputMode::Search
        } else {
            InputMode::Normal
        }
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn pending(&self) -> Option<&FetchRequest> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn last_refreshed(&self) -> Option<String> {
        self.last_refreshed
            .map(|at| at.format("%H:%M:%S").to_string())
    }

    pub fn projection(&self) -> Projection {
        build_rows(&self.nav, &self.cache, self.viewport_width)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let len = self.projection().data_len();
        (len > 0).then(|| self.selected.min(len - 1))
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        let command = self.reduce(action);
        debug_assert!(self.nav.is_consistent(), "{:?}", self.nav);
        command
    }

    fn reduce(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp | Action::Quit) {
            self.show_help = false;
            return AppCommand::None;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::NextTab => self.switch_to_tab(self.nav.active_tab.next()),
            Action::PrevTab => self.switch_to_tab(self.nav.active_tab.prev()),
            Action::SelectTab(digit) => match ResourceTab::from_digit(digit) {
                Some(tab) => self.switch_to_tab(tab),
                None => AppCommand::None,
            },
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_selection(self.page_step());
                AppCommand::None
            }
            Action::PageUp => {
                self.move_selection(-self.page_step());
                AppCommand::None
            }
            Action::Top => {
                self.selected = 0;
                AppCommand::None
            }
            Action::Bottom => {
                self.selected = self.projection().data_len().saturating_sub(1);
                AppCommand::None
            }
            Action::Select => self.enter_selected(),
            Action::Back => {
                self.go_back();
                AppCommand::None
            }
            Action::Refresh => self.refresh(),
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::StartSearch => {
                if self.nav.view != ViewKind::Resources {
                    self.status = "Search is available in the resources view".to_string();
                    return AppCommand::None;
                }
                self.nav.search_mode = true;
                self.nav.search_query.clear();
                self.selected = 0;
                self.status = "Search mode (enter to keep, esc to cancel)".to_string();
                AppCommand::None
            }
            Action::SubmitSearch => {
                if self.nav.search_mode {
                    self.nav.search_mode = false;
                    self.status = if self.nav.search_query.is_empty() {
                        "Search cleared".to_string()
                    } else {
                        format!("Filtering by '{}'", self.nav.search_query)
                    };
                }
                AppCommand::None
            }
            Action::CancelSearch => {
                self.nav.clear_search();
                self.selected = 0;
                self.status = "Search cancelled".to_string();
                AppCommand::None
            }
            Action::Backspace => {
                if self.nav.search_mode {
                    self.nav.search_query.pop();
                    self.selected = 0;
                }
                AppCommand::None
            }
            Action::InputChar(c) => {
                if self.nav.search_mode {
                    self.nav.search_query.push(c);
                    self.selected = 0;
                }
                AppCommand::None
            }
        }
    }

    pub fn handle_fetch_event(&mut self, event: FetchEvent) {
        let request = event.request();
        let current = self.pending.as_ref() == Some(&request);

        let summary = match event {
            FetchEvent::SubscriptionsFetched(subscriptions) => {
                let summary = format!("Loaded {} subscriptions", subscriptions.len());
                self.cache.set_subscriptions(subscriptions);
                summary
            }
            FetchEvent::ResourceGroupsFetched {
                subscription_id,
                groups,
            } => {
                let summary = format!("Loaded {} resource groups", groups.len());
                self.cache.set_resource_groups(subscription_id, groups);
                summary
            }
            FetchEvent::ResourcesFetched { key, resources } => {
                if current && self.preselect_on_arrival && self.nav.view == ViewKind::Resources {
                    self.nav.active_tab = preselect_tab(&resources);
                    self.preselect_on_arrival = false;
                    self.selected = 0;
                }
                let summary = format!(
                    "Loaded {} resources in {}",
                    resources.len(),
                    key.resource_group
                );
                self.cache.set_resources(key, resources);
                summary
            }
            FetchEvent::FetchFailed { request, error } => {
                if !current {
                    warn!(
                        "dropping failure for superseded fetch of {}: {error}",
                        request.describe()
                    );
                    return;
                }
                self.settle();
                self.nav.last_error = Some(error.message().to_string());
                self.status = format!("Fetching {} failed", request.describe());
                return;
            }
        };

        if current {
            self.settle();
            self.nav.last_error = None;
            self.last_refreshed = Some(Local::now());
            self.status = summary;
        } else {
            warn!("cached superseded result for {}", request.describe());
        }
        self.clamp_selection();
    }

    fn settle(&mut self) {
        self.pending = None;
        self.preselect_on_arrival = false;
        self.nav.loading = false;
    }

    fn issue(&mut self, request: FetchRequest) -> AppCommand {
        self.nav.loading = true;
        self.pending = Some(request.clone());
        AppCommand::Fetch(request)
    }

    fn enter_selected(&mut self) -> AppCommand {
        let Some(index) = self.selected_index() else {
            return AppCommand::None;
        };

        match self.nav.view {
            ViewKind::Subscriptions => {
                let Some(subscription) = self.cache.subscriptions().get(index) else {
                    return AppCommand::None;
                };
                if subscription.id.trim().is_empty() {
                    self.status = "Selected subscription has no id".to_string();
                    return AppCommand::None;
                }
                let subscription_id = subscription.id.clone();
                self.status = format!("Loading resource groups of {}", subscription.display_name);
                self.nav.selected_subscription_id = Some(subscription_id.clone());
                self.nav.view = ViewKind::ResourceGroups;
                self.nav.clear_search();
                self.selected = 0;
                self.issue(FetchRequest::resource_groups(subscription_id))
            }
            ViewKind::ResourceGroups => {
                let Some(subscription_id) = self.nav.selected_subscription_id.clone() else {
                    return AppCommand::None;
                };
                let Some(group) = self.cache.resource_groups(&subscription_id).get(index) else {
                    return AppCommand::None;
                };
                if group.name.trim().is_empty() {
                    self.status = "Selected resource group has no name".to_string();
                    return AppCommand::None;
                }
                let group_name = group.name.clone();
                self.status = format!("Loading resources of {group_name}");
                self.nav.selected_resource_group = Some(group_name.clone());
                self.nav.active_tab = ResourceTab::All;
                self.nav.view = ViewKind::Resources;
                self.nav.clear_search();
                self.selected = 0;
                self.preselect_on_arrival = true;
                self.issue(FetchRequest::resources(subscription_id, group_name))
            }
            ViewKind::Resources => AppCommand::None,
        }
    }

    fn go_back(&mut self) {
        match self.nav.view {
            ViewKind::Subscriptions => {
                self.status = "At top level".to_string();
                return;
            }
            ViewKind::ResourceGroups => {
                let previous = self.nav.selected_subscription_id.take();
                self.nav.view = ViewKind::Subscriptions;
                self.selected = previous
                    .and_then(|id| {
                        self.cache
                            .subscriptions()
                            .iter()
                            .position(|subscription| subscription.id == id)
                    })
                    .unwrap_or(0);
                self.status = "Back to subscriptions".to_string();
            }
            ViewKind::Resources => {
                if !self.nav.search_query.is_empty() {
                    self.nav.clear_search();
                    self.selected = 0;
                    self.status = "Search cleared".to_string();
                    return;
                }
                let previous = self.nav.selected_resource_group.take();
                self.nav.view = ViewKind::ResourceGroups;
                self.nav.active_tab = ResourceTab::All;
                self.selected = match (previous, self.nav.selected_subscription_id.as_deref()) {
                    (Some(name), Some(subscription_id)) => self
                        .cache
                        .resource_groups(subscription_id)
                        .iter()
                        .position(|group| group.name == name)
                        .unwrap_or(0),
                    _ => 0,
                };
                self.status = "Back to resource groups".to_string();
            }
        }

        self.nav.clear_search();
        if let Some(abandoned) = self.pending.take() {
            debug!("leaving view with {} outstanding", abandoned.describe());
        }
        self.preselect_on_arrival = false;
        self.nav.loading = false;
    }

    fn refresh(&mut self) -> AppCommand {
        let request = match self.nav.view {
            ViewKind::Subscriptions => Some(FetchRequest::Subscriptions),
            ViewKind::ResourceGroups => self
                .nav
                .selected_subscription_id
                .clone()
                .map(FetchRequest::resource_groups),
            ViewKind::Resources => self
                .nav
                .resource_group_key()
                .map(|key| FetchRequest::Resources { key }),
        };

        match request {
            Some(request) => {
                self.status = format!("Refreshing {}", request.describe());
                self.preselect_on_arrival = false;
                self.issue(request)
            }
            None => AppCommand::None,
        }
    }

    fn switch_to_tab(&mut self, tab: ResourceTab) -> AppCommand {
        if self.nav.view != ViewKind::Resources || self.nav.search_mode {
            return AppCommand::None;
        }
        self.nav.active_tab = tab;
        self.preselect_on_arrival = false;
        self.selected = 0;
        self.status = format!("Showing {}", tab.title());
        AppCommand::None
    }

    fn page_step(&self) -> isize {
        self.viewport_height.saturating_sub(TABLE_CHROME_ROWS).max(1) as isize
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.projection().data_len();
        if len == 0 {
            self.selected = 0;
            return;
        }

        let max_index = len.saturating_sub(1) as isize;
        let current = self.selected.min(max_index as usize) as isize;
        self.selected = (current + delta).clamp(0, max_index) as usize;
    }

    fn clamp_selection(&mut self) {
        let len = self.projection().data_len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}
