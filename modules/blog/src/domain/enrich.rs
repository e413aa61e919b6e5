//! Display names for listed posts, loaded once per page.

use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::contract::model::{Post, PostView};
use crate::infra::storage::entity::{category, user};

#[derive(Debug, Default)]
pub struct PostLookups {
    authors: HashMap<Uuid, String>,
    categories: HashMap<Uuid, String>,
}

impl PostLookups {
    pub fn view(&self, post: Post) -> PostView {
        PostView {
            author_name: self.authors.get(&post.author_id).cloned(),
            category_name: post
                .category_id
                .and_then(|id| self.categories.get(&id).cloned()),
            post,
        }
    }
}

/// One query per related table for the whole page, issued concurrently.
pub async fn load_post_lookups<C>(db: &C, posts: &[Post]) -> Result<PostLookups, DbErr>
where
    C: ConnectionTrait,
{
    if posts.is_empty() {
        return Ok(PostLookups::default());
    }

    let author_ids: Vec<Uuid> = posts
        .iter()
        .map(|p| p.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let category_ids: Vec<Uuid> = posts
        .iter()
        .filter_map(|p| p.category_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db);
    let categories = async {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await
    };
    let (authors, categories) = tokio::try_join!(authors, categories)?;

    Ok(PostLookups {
        authors: authors
            .into_iter()
            .map(|u| (u.id, u.display_name))
            .collect(),
        categories: categories.into_iter().map(|c| (c.id, c.name)).collect(),
    })
}
