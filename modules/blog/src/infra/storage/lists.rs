//! Filter/sort allow-lists and global-search fields for every listable entity.

use query_core::{FilterType, SearchConfig};
use query_db::{FieldKind, FieldMap, Join, ListSpec};
use sea_orm::{RelationDef, RelationTrait};

use super::entity::{category, post, user};

fn post_author() -> RelationDef {
    post::Relation::Author.def()
}

fn post_category() -> RelationDef {
    post::Relation::Category.def()
}

pub const POST_AUTHOR: Join = Join::new("author", post_author);
pub const POST_CATEGORY: Join = Join::new("category", post_category);

pub fn users() -> ListSpec<user::Entity> {
    let fields = FieldMap::<user::Entity>::new()
        .insert("id", user::Column::Id, FieldKind::Uuid)
        .insert("email", user::Column::Email, FieldKind::String)
        .insert("displayName", user::Column::DisplayName, FieldKind::String)
        .insert("createdAt", user::Column::CreatedAt, FieldKind::DateTimeUtc)
        .insert("updatedAt", user::Column::UpdatedAt, FieldKind::DateTimeUtc);

    ListSpec::new(fields).with_search(SearchConfig::new(["displayName", "email"]))
}

pub fn categories() -> ListSpec<category::Entity> {
    let fields = FieldMap::<category::Entity>::new()
        .insert("id", category::Column::Id, FieldKind::Uuid)
        .insert("name", category::Column::Name, FieldKind::String)
        .insert("description", category::Column::Description, FieldKind::String)
        .insert("createdAt", category::Column::CreatedAt, FieldKind::DateTimeUtc)
        .insert("updatedAt", category::Column::UpdatedAt, FieldKind::DateTimeUtc);

    ListSpec::new(fields).with_search(SearchConfig::new(["name", "description"]))
}

pub fn posts() -> ListSpec<post::Entity> {
    let fields = FieldMap::<post::Entity>::new()
        .insert("id", post::Column::Id, FieldKind::Uuid)
        .insert("title", post::Column::Title, FieldKind::String)
        .insert("content", post::Column::Content, FieldKind::String)
        .insert("published", post::Column::Published, FieldKind::Bool)
        .insert("views", post::Column::Views, FieldKind::I64)
        .insert_as(
            "authorId",
            post::Column::AuthorId,
            FieldKind::Uuid,
            FilterType::Lookup,
        )
        .insert_as(
            "categoryId",
            post::Column::CategoryId,
            FieldKind::Uuid,
            FilterType::Lookup,
        )
        .insert("createdAt", post::Column::CreatedAt, FieldKind::DateTimeUtc)
        .insert("updatedAt", post::Column::UpdatedAt, FieldKind::DateTimeUtc)
        .insert_related::<user::Entity>(
            "author.displayName",
            POST_AUTHOR,
            user::Column::DisplayName,
            FieldKind::String,
        )
        .insert_related::<user::Entity>(
            "author.email",
            POST_AUTHOR,
            user::Column::Email,
            FieldKind::String,
        )
        .insert_related::<category::Entity>(
            "category.name",
            POST_CATEGORY,
            category::Column::Name,
            FieldKind::String,
        )
        .alias("authorName", "author.displayName")
        .alias("categoryName", "category.name");

    ListSpec::new(fields).with_search(SearchConfig::new([
        "title",
        "content",
        "author.displayName",
    ]))
}
