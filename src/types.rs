//! GraphQL types

use async_graphql::{ComplexObject, Context, ErrorExtensions, InputObject, Scalar, ScalarType, SimpleObject, Value, ID};
use chrono::{DateTime, NaiveDate};

use crate::dataloaders::AddressLoader;
use crate::entity::{address, user};
use crate::repository::NewAddress;

/// Calendar date scalar, rendered as `YYYY-MM-DD`
///
/// Accepts a plain date or an RFC 3339 timestamp, whose date part is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date(pub NaiveDate);

#[Scalar]
impl ScalarType for Date {
    fn parse(value: Value) -> async_graphql::InputValueResult<Self> {
        if let Value::String(s) = value {
            if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                return Ok(Date(date));
            }
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| Date(dt.date_naive()))
                .map_err(|e| format!("Invalid Date: {}", e).into())
        } else {
            Err("Expected string for Date".into())
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.format("%Y-%m-%d").to_string())
    }
}

/// Public user shape; the password hash never leaves the service
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
#[graphql(complex)]
pub struct User {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub birth_date: Option<Date>,
    #[graphql(skip)]
    pub(crate) key: i32,
}

#[ComplexObject]
impl User {
    async fn addresses(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Address>> {
        let loader = ctx.data::<AddressLoader>()?;
        let addresses = loader.load(self.key).await.map_err(|e| e.extend())?;

        Ok(addresses
            .unwrap_or_default()
            .into_iter()
            .map(Address::from)
            .collect())
    }
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            name: model.name,
            email: model.email,
            birth_date: model.birth_date.map(Date),
            key: model.id,
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: ID,
    pub cep: i32,
    pub street: String,
    pub street_number: i32,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    #[graphql(skip)]
    pub(crate) owner: i32,
}

impl From<address::Model> for Address {
    fn from(model: address::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            cep: model.cep,
            street: model.street,
            street_number: model.street_number,
            complement: model.complement,
            neighborhood: model.neighborhood,
            city: model.city,
            state: model.state,
            owner: model.user_id,
        }
    }
}

/// Returned by `login`
#[derive(SimpleObject, Debug, Clone)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub birth_date: Option<Date>,
    /// Addresses created together with the user
    #[graphql(default)]
    pub addresses: Vec<AddressInput>,
}

#[derive(InputObject, Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub remember_me: Option<bool>,
}

#[derive(InputObject, Debug, Clone)]
pub struct AddressInput {
    pub cep: i32,
    pub street: String,
    pub street_number: i32,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl From<AddressInput> for NewAddress {
    fn from(input: AddressInput) -> Self {
        Self {
            cep: input.cep,
            street: input.street,
            street_number: input.street_number,
            complement: input.complement,
            neighborhood: input.neighborhood,
            city: input.city,
            state: input.state,
        }
    }
}
