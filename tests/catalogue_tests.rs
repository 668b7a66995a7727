// tests/catalogue_tests.rs

mod common;

use serde_json::{Value, json};

#[tokio::test]
async fn bulk_preview_then_create_reports_duplicates() {
    let Some(app) = common::spawn_app().await else { return };
    let (_, admin) = app.admin().await;
    let anime_id = app.anime_with_episodes(&admin, 2).await;

    let preview = app
        .client
        .post(app.url(&format!("/api/admin/anime/{}/episodes/preview", anime_id)))
        .bearer_auth(&admin)
        .json(&json!({
            "start": 1,
            "end": 4,
            "sourceTemplate": "https://embed.example.com/v/{number}",
            "titleOverrides": "\n\nThe Turning Point\n"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(preview.status().as_u16(), 200);
    let drafts: Vec<Value> = preview.json().await.unwrap();

    assert_eq!(drafts.len(), 4);
    assert_eq!(drafts[0]["title"], "Episode 1");
    assert_eq!(drafts[2]["title"], "The Turning Point");
    assert_eq!(drafts[3]["sourceUrl"], "https://embed.example.com/v/4");

    // Preview stores nothing
    let stored: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/anime/{}/episodes", anime_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);

    // 1 and 2 already exist
    let report: Value = app
        .client
        .post(app.url(&format!("/api/admin/anime/{}/episodes/bulk", anime_id)))
        .bearer_auth(&admin)
        .json(&json!({ "episodes": drafts }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["succeeded"], 2);
    assert_eq!(report["failed"], 2);
    let failed: Vec<i64> = report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["item"].as_i64().unwrap())
        .collect();
    assert_eq!(failed, vec![1, 2]);

    let detail: Value = app
        .client
        .get(app.url(&format!("/api/anime/{}", anime_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["episodeCount"], 4);

    let third: Value = app
        .client
        .get(app.url(&format!("/api/anime/{}/episodes/3", anime_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(third["title"], "The Turning Point");
}

#[tokio::test]
async fn bulk_preview_rejects_bad_ranges() {
    let Some(app) = common::spawn_app().await else { return };
    let (_, admin) = app.admin().await;
    let anime_id = app.anime_with_episodes(&admin, 0).await;

    let preview = |body: Value| {
        let request = app
            .client
            .post(app.url(&format!("/api/admin/anime/{}/episodes/preview", anime_id)))
            .bearer_auth(&admin)
            .json(&body);
        async move { request.send().await.unwrap().status().as_u16() }
    };

    let template = "https://embed.example.com/{number}";
    assert_eq!(preview(json!({ "start": 5, "end": 2, "sourceTemplate": template })).await, 400);
    assert_eq!(preview(json!({ "start": 1, "end": 501, "sourceTemplate": template })).await, 400);
    assert_eq!(preview(json!({ "start": 1, "end": 3 })).await, 400);
    assert_eq!(
        preview(json!({ "start": 1, "end": 2, "sourceTemplate": template, "titleOverrides": "a\nb\nc" })).await,
        400
    );
}

#[tokio::test]
async fn catalogue_filters_and_sorts() {
    let Some(app) = common::spawn_app().await else { return };
    let (_, admin) = app.admin().await;

    let marker = common::unique_name("cat");
    let mut created = Vec::new();
    for (suffix, genres, status, year, rating) in [
        ("Alpha", vec!["Mecha"], "completed", 2001, 7.0),
        ("Beta", vec!["Mecha", "Drama"], "ongoing", 2023, 9.1),
        ("Gamma", vec!["Romance"], "ongoing", 2023, 8.0),
    ] {
        let body: Value = app
            .client
            .post(app.url("/api/admin/anime"))
            .bearer_auth(&admin)
            .json(&json!({
                "title": format!("{} {}", marker, suffix),
                "genres": genres,
                "status": status,
                "releaseYear": year,
                "rating": rating,
                "description": "<p>Fine</p><script>alert(1)</script>"
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        created.push(body["id"].as_i64().unwrap());
    }

    let search = |query: String| {
        let request = app.client.get(app.url(&format!("/api/anime?q={}&{}", marker, query)));
        async move { request.send().await.unwrap().json::<Vec<Value>>().await.unwrap() }
    };
    let titles = |list: &[Value]| -> Vec<String> {
        list.iter()
            .map(|a| a["title"].as_str().unwrap().rsplit(' ').next().unwrap().to_string())
            .collect()
    };

    assert_eq!(titles(&search("sort=title".into()).await), ["Alpha", "Beta", "Gamma"]);
    assert_eq!(titles(&search("sort=rating".into()).await), ["Beta", "Gamma", "Alpha"]);
    assert_eq!(titles(&search("genre=mecha&sort=title".into()).await), ["Alpha", "Beta"]);
    assert_eq!(
        titles(&search("status=ongoing&year=2023&sort=title".into()).await),
        ["Beta", "Gamma"]
    );
    assert_eq!(search("sort=title&limit=1&offset=2".into()).await.len(), 1);

    let romance = search("genre=romance".into()).await;
    let gamma = &romance[0];
    assert_eq!(gamma["description"], "<p>Fine</p>");
    assert_eq!(gamma["genres"], json!(["romance"]));

    let bad_sort = app.client.get(app.url("/api/anime?sort=sideways")).send().await.unwrap();
    assert_eq!(bad_sort.status().as_u16(), 400);

    let deleted = app
        .client
        .delete(app.url(&format!("/api/admin/anime/{}", created[0])))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
    let gone = app
        .client
        .get(app.url(&format!("/api/anime/{}", created[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}
