//! Offset pagination for the user list

use async_graphql::{Context, ErrorExtensions, Object};

use crate::dataloaders::AddressLoader;
use crate::types::User;
use crate::ApiError;

/// Page window requested by `users(numUsers, skip)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub num_users: u64,
    pub skip: u64,
}

impl PageWindow {
    pub const DEFAULT_NUM_USERS: u64 = 10;

    /// Build a window from the raw GraphQL arguments
    pub fn from_args(num_users: Option<i32>, skip: Option<i32>) -> crate::Result<Self> {
        let num_users = match num_users {
            None => Self::DEFAULT_NUM_USERS,
            Some(n) => u64::try_from(n)
                .map_err(|_| ApiError::Input("'numUsers' must be non-negative".to_string()))?,
        };

        let skip = match skip {
            None => 0,
            Some(s) => u64::try_from(s)
                .map_err(|_| ApiError::Input("'skip' must be non-negative".to_string()))?,
        };

        Ok(Self { num_users, skip })
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            num_users: Self::DEFAULT_NUM_USERS,
            skip: 0,
        }
    }
}

/// Page information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PageInfo {
    /// Flags for a page of `returned` rows out of `total`
    pub fn compute(window: PageWindow, returned: usize, total: u64) -> Self {
        Self {
            has_previous_page: window.skip > 0 && returned > 0,
            has_next_page: window.skip.saturating_add(window.num_users) < total,
        }
    }
}

/// One page of users
#[derive(Debug, Clone)]
pub struct UserList {
    pub list: Vec<User>,
    pub total_users: u64,
    pub page_info: PageInfo,
}

impl UserList {
    pub fn new(list: Vec<User>, window: PageWindow, total_users: u64) -> Self {
        let page_info = PageInfo::compute(window, list.len(), total_users);
        Self {
            list,
            total_users,
            page_info,
        }
    }
}

fn clamp_i32(n: u64) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[Object]
impl UserList {
    async fn list(&self, ctx: &Context<'_>) -> async_graphql::Result<&[User]> {
        // one query for every address on the page instead of one per user
        if ctx.look_ahead().field("addresses").exists() {
            if let Some(loader) = ctx.data_opt::<AddressLoader>() {
                let keys = self.list.iter().map(|u| u.key).collect();
                loader.load_many(keys).await.map_err(|e| e.extend())?;
            }
        }
        Ok(&self.list)
    }

    /// Number of users on this page
    async fn users(&self) -> i32 {
        clamp_i32(self.list.len() as u64)
    }

    async fn total_users(&self) -> i32 {
        clamp_i32(self.total_users)
    }

    async fn has_previous_page(&self) -> bool {
        self.page_info.has_previous_page
    }

    async fn has_next_page(&self) -> bool {
        self.page_info.has_next_page
    }
}
