mod common;

use anyhow::Result;
use axum::http::StatusCode;
use blog::seed_demo_data;
use serde_json::json;
use tracing_test::traced_test;
use uuid::Uuid;

use common::{json_request, setup};

#[tokio::test]
async fn user_lifecycle() -> Result<()> {
    let app = setup().await?;

    let (status, created) = app
        .call(json_request(
            "POST",
            "/api/v1/users",
            Some(json!({ "email": "ann@example.com", "displayName": "Ann Lee" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["displayName"], "Ann Lee");

    let (status, _) = app
        .call(json_request(
            "POST",
            "/api/v1/users",
            Some(json!({ "email": "ann@example.com", "displayName": "Other Ann" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = app
        .call(json_request(
            "PUT",
            &format!("/api/v1/users/{id}"),
            Some(json!({ "displayName": "Ann B. Lee" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["displayName"], "Ann B. Lee");
    assert_eq!(updated["email"], "ann@example.com");

    let (status, _) = app
        .call(json_request("DELETE", &format!("/api/v1/users/{id}"), None, None))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .call(json_request("GET", &format!("/api/v1/users/{id}"), None, None))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn user_emails_stay_out_of_the_logs() -> Result<()> {
    let app = setup().await?;
    let body = json!({ "email": "private.ann@example.com", "displayName": "Ann Lee" });

    let (status, created) = app
        .call(json_request("POST", "/api/v1/users", Some(body.clone()), None))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();

    let (status, _) = app
        .call(json_request("POST", "/api/v1/users", Some(body), None))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(json_request(
            "PUT",
            &format!("/api/v1/users/{id}"),
            Some(json!({ "email": "still.private@example.com" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::OK);

    assert!(logs_contain(&format!("Created user: {id}")));
    assert!(logs_contain("Failed to create user"));
    assert!(!logs_contain("private.ann@example.com"));
    assert!(!logs_contain("still.private@example.com"));
    Ok(())
}

#[tokio::test]
async fn user_validation() -> Result<()> {
    let app = setup().await?;

    for payload in [
        json!({ "email": "not-an-email", "displayName": "Ann" }),
        json!({ "email": "ann@example.com", "displayName": "   " }),
    ] {
        let (status, body) = app
            .call(json_request("POST", "/api/v1/users", Some(payload), None))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/v1/users",
            Some(json!({ "email": "ann@example.com" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    Ok(())
}

#[tokio::test]
async fn only_the_author_may_change_a_post() -> Result<()> {
    let app = setup().await?;

    let ann = app.blog.users.create(blog::contract::NewUser {
        email: "ann@example.com".into(),
        display_name: "Ann Lee".into(),
    })
    .await?
    .id;
    let bo = app.blog.users.create(blog::contract::NewUser {
        email: "bo@example.com".into(),
        display_name: "Bo Stone".into(),
    })
    .await?
    .id;

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/v1/posts",
            Some(json!({ "title": "Hello", "content": "First post" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, post) = app
        .call(json_request(
            "POST",
            "/api/v1/posts",
            Some(json!({ "title": "Hello", "content": "First post" })),
            Some(ann),
        ))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["authorId"], ann.to_string());
    assert_eq!(post["authorName"], "Ann Lee");
    let uri = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let (status, _) = app
        .call(json_request("PUT", &uri, Some(json!({ "title": "Mine now" })), Some(bo)))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(json_request("DELETE", &uri, None, Some(bo))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .call(json_request(
            "PUT",
            &uri,
            Some(json!({ "title": "Hello again", "published": true })),
            Some(ann),
        ))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Hello again");
    assert_eq!(updated["published"], true);

    let (status, _) = app.call(json_request("DELETE", &uri, None, Some(ann))).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(json_request("GET", &uri, None, None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn post_category_can_be_set_and_cleared() -> Result<()> {
    let app = setup().await?;
    let ann = common::insert_user(&app.db, "ann@example.com", "Ann Lee").await?;

    let (status, category) = app
        .call(json_request(
            "POST",
            "/api/v1/categories",
            Some(json!({ "name": "Pets", "description": "Animals" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/v1/posts",
            Some(json!({ "title": "Cats", "content": "...", "categoryId": Uuid::new_v4() })),
            Some(ann),
        ))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, post) = app
        .call(json_request(
            "POST",
            "/api/v1/posts",
            Some(json!({ "title": "Cats", "content": "...", "categoryId": category_id })),
            Some(ann),
        ))
        .await?;
    assert_eq!(post["categoryName"], "Pets");
    let uri = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let (_, post) = app
        .call(json_request("PUT", &uri, Some(json!({ "categoryId": null })), Some(ann)))
        .await?;
    assert!(post["categoryId"].is_null());
    assert!(post["categoryName"].is_null());
    assert_eq!(post["title"], "Cats");
    Ok(())
}

#[tokio::test]
async fn category_names_are_unique() -> Result<()> {
    let app = setup().await?;
    let create = |name: &str| {
        json_request("POST", "/api/v1/categories", Some(json!({ "name": name })), None)
    };

    let (status, pets) = app.call(create("Pets")).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, travel) = app.call(create("Travel")).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.call(create("Pets")).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let uri = format!("/api/v1/categories/{}", travel["id"].as_str().unwrap());
    let (status, _) = app
        .call(json_request("PUT", &uri, Some(json!({ "name": "Pets" })), None))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, renamed) = app
        .call(json_request(
            "PUT",
            &format!("/api/v1/categories/{}", pets["id"].as_str().unwrap()),
            Some(json!({ "name": "Pets", "description": "Animals" })),
            None,
        ))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["description"], "Animals");
    Ok(())
}

#[tokio::test]
async fn deleting_a_user_removes_their_posts() -> Result<()> {
    let app = setup().await?;
    assert!(seed_demo_data(&app.db).await?);
    assert!(!seed_demo_data(&app.db).await?);

    let (_, before) = app.fetch(json!({ "entityType": "posts" })).await?;
    let total = before["total"].as_u64().unwrap();
    let (_, users) = app.fetch(json!({ "entityType": "users", "limit": 1 })).await?;
    let user_id = users["data"]["users"][0]["id"].as_str().unwrap().to_string();

    let (_, own) = app
        .fetch(json!({
            "entityType": "posts",
            "filterOptions": { "authorId": { "operator": "in", "value": [user_id] } }
        }))
        .await?;
    let own = own["filteredTotal"].as_u64().unwrap();
    assert!(own > 0);

    let (status, _) = app
        .call(json_request("DELETE", &format!("/api/v1/users/{user_id}"), None, None))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, after) = app.fetch(json!({ "entityType": "posts" })).await?;
    assert_eq!(after["total"].as_u64().unwrap(), total - own);
    Ok(())
}

#[tokio::test]
async fn list_config_reflects_module_settings() -> Result<()> {
    let app = common::setup_with(blog::BlogConfig {
        default_page_size: 25,
        max_page_size: 50,
        ..Default::default()
    })
    .await?;

    let (status, body) = app
        .call(json_request("GET", "/api/v1/list-config", None, None))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["defaultPageSize"], 25);
    assert_eq!(body["maxPageSize"], 50);
    assert_eq!(body["searchDebounceMs"], 300);

    let (status, body) = app
        .fetch(json!({ "entityType": "users", "limit": 60 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PAGINATION");

    let (_, body) = app.fetch(json!({ "entityType": "users" })).await?;
    assert_eq!(body["limit"], 25);
    Ok(())
}
