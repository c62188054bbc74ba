//! GraphQL schema: query and mutation roots

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Object, Schema, ID};

use crate::auth::get_token;
use crate::dataloaders::AddressLoader;
use crate::pagination::UserList;
use crate::service::UserService;
use crate::types::{Address, AddressInput, AuthPayload, LoginInput, User, UserInput};

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(service: UserService) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

fn service<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a UserService> {
    ctx.data::<UserService>()
}

/// Forget a user's cached addresses after writing to them
async fn invalidate_addresses(ctx: &Context<'_>, user_id: i32) {
    if let Some(loader) = ctx.data_opt::<AddressLoader>() {
        loader.clear(&user_id).await;
    }
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn hello(&self) -> &'static str {
        "Hello world!"
    }

    /// Get a user by ID
    async fn user(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<User> {
        service(ctx)?
            .user(get_token(ctx), &id)
            .await
            .map_err(|e| e.extend())
    }

    /// Get a page of users ordered by name
    async fn users(
        &self,
        ctx: &Context<'_>,
        num_users: Option<i32>,
        skip: Option<i32>,
    ) -> async_graphql::Result<UserList> {
        service(ctx)?
            .users(get_token(ctx), num_users, skip)
            .await
            .map_err(|e| e.extend())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_user(&self, ctx: &Context<'_>, data: UserInput) -> async_graphql::Result<User> {
        let created = service(ctx)?
            .create_user(get_token(ctx), data)
            .await
            .map_err(|e| e.extend())?;

        invalidate_addresses(ctx, created.key).await;
        Ok(created)
    }

    async fn login(&self, ctx: &Context<'_>, data: LoginInput) -> async_graphql::Result<AuthPayload> {
        service(ctx)?.login(data).await.map_err(|e| e.extend())
    }

    async fn add_address(
        &self,
        ctx: &Context<'_>,
        user_id: ID,
        data: AddressInput,
    ) -> async_graphql::Result<Address> {
        let created = service(ctx)?
            .add_address(get_token(ctx), &user_id, data)
            .await
            .map_err(|e| e.extend())?;

        invalidate_addresses(ctx, created.owner).await;
        Ok(created)
    }
}
