mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn document_end_to_end_flow() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, user_id, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    // Create via JSON
    let res = client
        .post(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "Doc A", "content": "hello" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    let id = created["id"].as_i64().expect("document id");
    assert_eq!(created["title"], "Doc A");
    assert_eq!(created["content"], "hello");
    assert_eq!(created["category_id"], Value::Null);
    // Owner stamped from the token, not the body
    assert_eq!(created["user_id"].as_i64(), Some(user_id));
    assert!(created["created_at"].as_str().is_some());

    // Get returns what was submitted
    let res = client
        .get(format!("{}/documents/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await?;
    assert_eq!(fetched["title"], "Doc A");
    assert_eq!(fetched["content"], "hello");

    // Update replaces the mutable fields
    let res = client
        .put(format!("{}/documents/{}", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "title": "Doc A2", "content": "hello again" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await?;
    assert_eq!(updated["title"], "Doc A2");
    assert_eq!(updated["user_id"].as_i64(), Some(user_id));

    // Delete, then the id is gone
    let res = client
        .delete(format!("{}/documents/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/documents/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(format!("{}/documents/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_filters_by_category_and_null_sentinel() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, _, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/categories", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": common::unique("Filtered") }))
        .send()
        .await?;
    let category: Value = res.json().await?;
    let category_id = category["id"].as_i64().expect("category id");

    let tagged_title = common::unique("tagged");
    let untagged_title = common::unique("untagged");
    for (title, cat) in [(&tagged_title, Some(category_id)), (&untagged_title, None)] {
        let res = client
            .post(format!("{}/documents", server.base_url))
            .bearer_auth(&token)
            .json(&json!({ "title": title, "content": "x", "category_id": cat }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    // Concrete id: only the tagged document
    let res = client
        .get(format!("{}/documents?category_id={}", server.base_url, category_id))
        .bearer_auth(&token)
        .send()
        .await?;
    let docs: Vec<Value> = res.json().await?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["title"], tagged_title.as_str());

    // "null" sentinel: uncategorized only
    let res = client
        .get(format!("{}/documents?category_id=null", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let docs: Vec<Value> = res.json().await?;
    assert!(docs.iter().all(|d| d["category_id"].is_null()));
    assert!(docs.iter().any(|d| d["title"] == untagged_title.as_str()));

    // Absent: both present, newest first
    let res = client
        .get(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let docs: Vec<Value> = res.json().await?;
    let position = |title: &str| docs.iter().position(|d| d["title"] == title);
    let tagged_pos = position(&tagged_title).expect("tagged doc listed");
    let untagged_pos = position(&untagged_title).expect("untagged doc listed");
    // The untagged document was created later, so newest-first puts it earlier
    assert!(untagged_pos < tagged_pos, "expected newest-first ordering");

    // Garbage filter value is a client error
    let res = client
        .get(format!("{}/documents?category_id=banana", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn multipart_upload_and_download_round_trip() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, _, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("title", "With attachment")
        .text("content", "see attached")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"file payload".to_vec()).file_name("notes.txt"),
        );

    let res = client
        .post(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let doc: Value = res.json().await?;
    let id = doc["id"].as_i64().expect("document id");
    let file_path = doc["file_path"].as_str().expect("file path");
    assert!(file_path.contains("_notes.txt"));

    let res = client
        .get(format!("{}/documents/{}/download", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("notes.txt"));
    assert_eq!(res.bytes().await?.as_ref(), &b"file payload"[..]);
    Ok(())
}

#[tokio::test]
async fn download_without_file_is_not_found() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, _, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "no file here" }))
        .send()
        .await?;
    let doc: Value = res.json().await?;
    let id = doc["id"].as_i64().expect("document id");

    let res = client
        .get(format!("{}/documents/{}/download", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "document has no uploaded file");

    // Missing id gets the other 404 message
    let res = client
        .get(format!("{}/documents/999999999/download", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "document not found");
    Ok(())
}

#[tokio::test]
async fn oversized_upload_is_rejected() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, _, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    // One byte past the 10 MB body cap
    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    let form = reqwest::multipart::Form::new()
        .text("title", "too big")
        .part(
            "file",
            reqwest::multipart::Part::bytes(oversized).file_name("huge.bin"),
        );

    let res = client
        .post(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn failed_create_leaves_no_orphaned_upload() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, _, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    // A category id that cannot exist makes the insert fail on the foreign
    // key after the blob has already been written.
    let marker = common::unique("orphan");
    let form = reqwest::multipart::Form::new()
        .text("title", "doomed")
        .text("category_id", "999999999")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"never kept".to_vec())
                .file_name(format!("{marker}.txt")),
        );

    let res = client
        .post(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert!(
        res.status().is_server_error(),
        "expected the insert to fail, got {}",
        res.status()
    );

    // The compensating cleanup must have removed the blob again
    let orphaned = std::fs::read_dir(&server.upload_dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|e| e.file_name().to_string_lossy().contains(&marker))
        })
        .unwrap_or(false);
    assert!(!orphaned, "upload directory kept a blob for the failed create");
    Ok(())
}

#[tokio::test]
async fn multipart_create_without_file_succeeds() -> Result<()> {
    let Some(server) = common::try_server().await else { return Ok(()) };
    let (token, _, _) = common::register_and_login(&server.base_url).await?;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("title", "form only")
        .text("content", "no attachment");

    let res = client
        .post(format!("{}/documents", server.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let doc: Value = res.json().await?;
    assert_eq!(doc["title"], "form only");
    assert_eq!(doc["file_path"], "");
    Ok(())
}
