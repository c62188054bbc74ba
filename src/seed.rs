//! Fake user generation for local databases

use chrono::{Duration, NaiveDate};
use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

use crate::entity::user;
use crate::password::{hash_password, validate_password};
use crate::repository::{NewUser, UserRepository};
use crate::ApiError;

pub const DEFAULT_SEED_COUNT: usize = 50;

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Daniel", "Eduarda", "Felipe", "Gabriela", "Hugo", "Isabela", "João",
    "Larissa", "Marcos", "Natália", "Otávio", "Paula", "Rafael", "Sofia", "Thiago", "Vitória", "Yuri",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Cardoso", "Costa", "Ferreira", "Gomes", "Lima", "Martins", "Oliveira",
    "Pereira", "Ribeiro", "Rocha", "Santos", "Silva", "Souza",
];

const DOMAINS: &[&str] = &["example.com", "example.org", "mail.test"];

fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

/// Random password that passes the password policy
fn fake_password<R: Rng>(rng: &mut R) -> String {
    let letter = rng.random_range(b'a'..=b'z') as char;
    let digit = rng.random_range(b'0'..=b'9') as char;
    format!("{}{}{}", Alphanumeric.sample_string(rng, 8), letter, digit)
}

fn fake_users(count: usize) -> crate::Result<Vec<NewUser>> {
    let (Some(earliest), Some(latest)) = (
        NaiveDate::from_ymd_opt(1950, 1, 1),
        NaiveDate::from_ymd_opt(2000, 1, 1),
    ) else {
        return Err(ApiError::internal("invalid birth date range"));
    };
    let span = (latest - earliest).num_days();

    let mut rng = rand::rng();
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let first = pick(&mut rng, FIRST_NAMES);
        let last = pick(&mut rng, LAST_NAMES);
        let password = fake_password(&mut rng);
        validate_password(&password)?;

        users.push(NewUser {
            name: format!("{} {}", first, last),
            // index suffix keeps emails unique within a run
            email: format!("{}.{}{}@{}", first, last, i + 1, pick(&mut rng, DOMAINS)).to_lowercase(),
            password_hash: hash_password(&password)?,
            birth_date: Some(earliest + Duration::days(rng.random_range(0..=span))),
            addresses: Vec::new(),
        });
    }

    Ok(users)
}

/// Replace every stored user with `count` fake ones
pub async fn seed_users(repository: &dyn UserRepository, count: usize) -> crate::Result<Vec<user::Model>> {
    repository.clear().await?;

    let users = tokio::task::spawn_blocking(move || fake_users(count))
        .await
        .map_err(ApiError::internal)??;

    let mut created = Vec::with_capacity(users.len());
    for user in users {
        created.push(repository.create(user).await?);
    }

    tracing::info!(count = created.len(), "seeded users");
    Ok(created)
}
