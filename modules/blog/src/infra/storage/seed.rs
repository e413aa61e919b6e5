//! Small demo data set for a fresh database.

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, Set};
use tracing::info;
use uuid::Uuid;

use super::entity::{category, post, user};

const USERS: &[(&str, &str)] = &[
    ("ann@example.com", "Ann Lee"),
    ("bo@example.com", "Bo Park"),
    ("cy@example.com", "Cy Moreno"),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("Pets", "Animals we live with"),
    ("Travel", "Places and the roads between them"),
    ("Cooking", "Recipes and kitchen notes"),
];

const TITLES: &[&str] = &[
    "Why my cat ignores me",
    "A week in Lisbon",
    "Sourdough for the impatient",
    "Training a stubborn dog",
    "Night trains of Europe",
    "One-pan dinners",
    "The cat who came back",
    "Packing light",
    "Knife skills 101",
    "Adopting an older pet",
    "Border crossings",
    "Soup season",
];

/// Insert demo rows unless the database already has users. Returns whether
/// anything was written.
pub async fn seed_demo_data<C: ConnectionTrait>(db: &C) -> Result<bool, DbErr> {
    if user::Entity::find().count(db).await? > 0 {
        info!("database not empty, skipping demo seed");
        return Ok(false);
    }

    let now = Utc::now();
    let user_ids: Vec<Uuid> = USERS.iter().map(|_| Uuid::new_v4()).collect();
    let category_ids: Vec<Uuid> = CATEGORIES.iter().map(|_| Uuid::new_v4()).collect();

    user::Entity::insert_many(USERS.iter().zip(&user_ids).map(|((email, name), id)| {
        user::ActiveModel {
            id: Set(*id),
            email: Set((*email).to_string()),
            display_name: Set((*name).to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }))
    .exec_without_returning(db)
    .await?;

    category::Entity::insert_many(CATEGORIES.iter().zip(&category_ids).map(
        |((name, description), id)| category::ActiveModel {
            id: Set(*id),
            name: Set((*name).to_string()),
            description: Set(Some((*description).to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        },
    ))
    .exec_without_returning(db)
    .await?;

    post::Entity::insert_many(TITLES.iter().enumerate().map(|(i, title)| {
        let created = now - Duration::days(i as i64);
        post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set((*title).to_string()),
            content: Set(format!("{title}. Notes and photos to follow.")),
            published: Set(i % 4 != 3),
            views: Set((i as i64 + 1) * 17),
            author_id: Set(user_ids[i % user_ids.len()]),
            category_id: Set(Some(category_ids[i % category_ids.len()])),
            created_at: Set(created),
            updated_at: Set(created),
        }
    }))
    .exec_without_returning(db)
    .await?;

    info!(
        users = USERS.len(),
        categories = CATEGORIES.len(),
        posts = TITLES.len(),
        "seeded demo data"
    );
    Ok(true)
}
