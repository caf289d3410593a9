mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

// End-to-end backup/restore flows. These need a live Postgres with the
// schema loaded; they skip (return early) when /health reports no database.

async fn register_org(base_url: &str, client: &reqwest::Client) -> Result<(String, String)> {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_nanos();
    let email = format!("owner+{}@example.com", nonce);

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({
            "organization_name": format!("Test Realty {}", nonce),
            "email": email,
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED, "register failed");

    let body = res.json::<Value>().await?;
    let token = body["token"].as_str().unwrap().to_string();
    Ok((token, email))
}

async fn seed_data(base_url: &str, client: &reqwest::Client, token: &str) -> Result<()> {
    for name in ["Ana Silva", "Rui Costa"] {
        let res = client
            .post(format!("{}/api/agents", base_url))
            .bearer_auth(token)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED, "agent create failed");
    }

    for (amount, kind) in [("1500.00", "income"), ("250.50", "expense")] {
        let res = client
            .post(format!("{}/api/transactions", base_url))
            .bearer_auth(token)
            .json(&json!({ "amount": amount, "kind": kind }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED, "transaction create failed");
    }

    Ok(())
}

async fn list_ids(
    base_url: &str,
    client: &reqwest::Client,
    token: &str,
    path: &str,
) -> Result<Vec<String>> {
    let res = client
        .get(format!("{}{}", base_url, path))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let mut ids: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    Ok(ids)
}

#[tokio::test]
async fn export_restore_round_trip_preserves_sets() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: no database available");
        return Ok(());
    }
    let client = reqwest::Client::new();

    let (token, email) = register_org(&server.base_url, &client).await?;
    seed_data(&server.base_url, &client, &token).await?;

    let agents_before = list_ids(&server.base_url, &client, &token, "/api/agents").await?;
    let transactions_before =
        list_ids(&server.base_url, &client, &token, "/api/transactions").await?;

    // Export
    let res = client
        .get(format!("{}/api/backup/export", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("agency-backup-"), "bad filename: {}", disposition);

    let snapshot = res.json::<Value>().await?;
    assert_eq!(snapshot["metadata"]["version"], "1.0");
    assert_eq!(snapshot["metadata"]["exported_by"], email);
    assert_eq!(snapshot["agents"].as_array().unwrap().len(), 2);

    // Drift: an extra transaction after the export
    let res = client
        .post(format!("{}/api/transactions", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "amount": "99.00", "kind": "expense" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Restore rewinds to the snapshot
    let res = client
        .post(format!("{}/api/backup/restore", server.base_url))
        .bearer_auth(&token)
        .json(&snapshot)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true, "restore body: {}", body);

    let agents_after = list_ids(&server.base_url, &client, &token, "/api/agents").await?;
    let transactions_after =
        list_ids(&server.base_url, &client, &token, "/api/transactions").await?;

    assert_eq!(agents_before, agents_after);
    assert_eq!(transactions_before, transactions_after);
    Ok(())
}

#[tokio::test]
async fn restore_twice_keeps_single_settings_row() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: no database available");
        return Ok(());
    }
    let client = reqwest::Client::new();

    let (token, _) = register_org(&server.base_url, &client).await?;

    let snapshot = client
        .get(format!("{}/api/backup/export", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;

    for _ in 0..2 {
        let res = client
            .post(format!("{}/api/backup/restore", server.base_url))
            .bearer_auth(&token)
            .json(&snapshot)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    // Settings endpoint maps one-to-one onto the org; a duplicate row would
    // surface as a query error here
    let res = client
        .get(format!("{}/api/settings", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn foreign_snapshot_is_rejected_without_mutation() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: no database available");
        return Ok(());
    }
    let client = reqwest::Client::new();

    // Org A with data, org B empty
    let (token_a, _) = register_org(&server.base_url, &client).await?;
    seed_data(&server.base_url, &client, &token_a).await?;
    let (token_b, _) = register_org(&server.base_url, &client).await?;

    let snapshot_a = client
        .get(format!("{}/api/backup/export", server.base_url))
        .bearer_auth(&token_a)
        .send()
        .await?
        .json::<Value>()
        .await?;

    // B cannot restore A's snapshot
    let res = client
        .post(format!("{}/api/backup/restore", server.base_url))
        .bearer_auth(&token_b)
        .json(&snapshot_a)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // and B's data is untouched
    let agents_b = list_ids(&server.base_url, &client, &token_b, "/api/agents").await?;
    assert!(agents_b.is_empty());

    // as is A's
    let agents_a = list_ids(&server.base_url, &client, &token_a, "/api/agents").await?;
    assert_eq!(agents_a.len(), 2);
    Ok(())
}

#[tokio::test]
async fn malformed_snapshot_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: no database available");
        return Ok(());
    }
    let client = reqwest::Client::new();

    let (token, _) = register_org(&server.base_url, &client).await?;

    let res = client
        .post(format!("{}/api/backup/restore", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "organization": {}, "settings": {} })) // no metadata
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.contains("metadata"), "unexpected error: {}", body);
    Ok(())
}
