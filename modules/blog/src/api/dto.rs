use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::contract::model::{
    Category, CategoryPatch, NewCategory, NewPost, NewUser, PostPatch, PostView, User, UserPatch,
};

/// Absent stays `None`; an explicit `null` becomes `Some(None)`.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserReq {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryReq {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryReq {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub views: i64,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostReq {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostReq {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(r: CreateUserReq) -> Self {
        Self {
            email: r.email,
            display_name: r.display_name,
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(r: UpdateUserReq) -> Self {
        Self {
            email: r.email,
            display_name: r.display_name,
        }
    }
}

impl From<Category> for CategoryDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<CreateCategoryReq> for NewCategory {
    fn from(r: CreateCategoryReq) -> Self {
        Self {
            name: r.name,
            description: r.description,
        }
    }
}

impl From<UpdateCategoryReq> for CategoryPatch {
    fn from(r: UpdateCategoryReq) -> Self {
        Self {
            name: r.name,
            description: r.description,
        }
    }
}

impl From<PostView> for PostDto {
    fn from(v: PostView) -> Self {
        let p = v.post;
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            published: p.published,
            views: p.views,
            author_id: p.author_id,
            author_name: v.author_name,
            category_id: p.category_id,
            category_name: v.category_name,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<CreatePostReq> for NewPost {
    fn from(r: CreatePostReq) -> Self {
        Self {
            title: r.title,
            content: r.content,
            published: r.published,
            category_id: r.category_id,
        }
    }
}

impl From<UpdatePostReq> for PostPatch {
    fn from(r: UpdatePostReq) -> Self {
        Self {
            title: r.title,
            content: r.content,
            published: r.published,
            category_id: r.category_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_absent_differ_in_patches() {
        let absent: UpdatePostReq = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.category_id, None);

        let cleared: UpdatePostReq = serde_json::from_str(r#"{"categoryId":null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));

        let cleared: UpdateCategoryReq = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
    }
}
