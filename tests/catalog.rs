use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use workflow_index::analyze::analyze;
use workflow_index::cache::ManualClock;
use workflow_index::config::Config;
use workflow_index::models::{Complexity, TriggerType};
use workflow_index::search::QueryRequest;
use workflow_index::store::SortKey;
use workflow_index::{Catalog, IndexError};

struct TestEnv {
    _tmp: TempDir,
    corpus: PathBuf,
    config: Config,
}

fn setup() -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("workflows");
    fs::create_dir_all(&corpus).unwrap();
    let config = Config::in_dir(tmp.path().join("data/index.sqlite"), &corpus);
    TestEnv {
        _tmp: tmp,
        corpus,
        config,
    }
}

fn workflow_json(name: &str, types: &[&str], active: bool) -> String {
    let nodes: Vec<serde_json::Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| serde_json::json!({"name": format!("node {}", i), "type": t, "parameters": {}}))
        .collect();
    serde_json::json!({
        "name": name,
        "active": active,
        "nodes": nodes,
        "connections": {},
        "settings": {"executionOrder": "v1"}
    })
    .to_string()
}

fn write(corpus: &Path, filename: &str, content: &str) {
    fs::write(corpus.join(filename), content).unwrap();
}

fn query(text: &str) -> QueryRequest {
    QueryRequest {
        query: text.to_string(),
        ..Default::default()
    }
}

const WEBHOOK: &str = "n8n-nodes-base.webhook";
const CRON: &str = "n8n-nodes-base.cron";
const SLACK: &str = "n8n-nodes-base.slack";
const HUBSPOT: &str = "n8n-nodes-base.hubspot";
const TELEGRAM: &str = "n8n-nodes-base.telegram";
const SET: &str = "n8n-nodes-base.set";

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let env = setup();
    write(&env.corpus, "0001_a.json", &workflow_json("Alpha", &[WEBHOOK, SLACK], true));
    write(&env.corpus, "0002_b.json", &workflow_json("Beta", &[CRON, HUBSPOT], false));
    write(&env.corpus, "0003_c.json", &workflow_json("Gamma", &[SET], false));

    let catalog = Catalog::init(&env.config).await.unwrap();
    let first = catalog.reindex(false).await.unwrap();
    assert_eq!(first.processed, 3);
    assert_eq!(first.skipped, 0);
    assert_eq!(first.total, 3);

    let second = catalog.reindex(false).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, second.total);
    assert_eq!(second.errors, 0);

    let forced = catalog.reindex(true).await.unwrap();
    assert_eq!(forced.processed, 3);
    assert_eq!(forced.skipped, 0);
}

#[tokio::test]
async fn test_malformed_document_does_not_abort() {
    let env = setup();
    write(&env.corpus, "0001_ok.json", &workflow_json("Fine", &[SLACK], true));
    write(&env.corpus, "0002_broken.json", "{ \"nodes\": [ ");
    write(&env.corpus, "0003_ok.json", &workflow_json("Also Fine", &[HUBSPOT], true));

    let catalog = Catalog::init(&env.config).await.unwrap();
    let report = catalog.reindex(false).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.total, 3);

    let err = catalog.get("0002_broken.json").await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_missing_corpus_is_fatal() {
    let env = setup();
    fs::remove_dir_all(&env.corpus).unwrap();
    let catalog = Catalog::init(&env.config).await.unwrap();
    let err = catalog.reindex(false).await.unwrap_err();
    assert!(matches!(err, IndexError::Corpus { .. }));
}

#[tokio::test]
async fn test_round_trip_matches_direct_analysis() {
    let env = setup();
    let content = workflow_json(
        "Lead Sync",
        &[CRON, HUBSPOT, SLACK, "n8n-nodes-base.googleSheets", SET, SET],
        true,
    );
    write(&env.corpus, "0042_lead_sync.json", &content);

    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    let direct = analyze("0042_lead_sync.json", content.as_bytes(), Utc::now()).unwrap();
    let stored = catalog.get("0042_lead_sync.json").await.unwrap();
    assert_eq!(stored.integrations, direct.integrations);
    assert_eq!(stored.trigger_type, direct.trigger_type);
    assert_eq!(stored.complexity, direct.complexity);
    assert_eq!(stored.digest, direct.digest);
    assert_eq!(stored.description, direct.description);
    assert_eq!(stored.trigger_type, TriggerType::Scheduled);
    assert_eq!(stored.complexity, Complexity::Medium);
}

#[tokio::test]
async fn test_shadow_follows_updates_and_deletes() {
    let env = setup();
    write(&env.corpus, "0001_animal.json", &workflow_json("Zebra Pipeline", &[SLACK], true));
    write(&env.corpus, "0002_other.json", &workflow_json("Other Pipeline", &[SLACK], true));

    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();
    assert_eq!(catalog.query(&query("zebra")).await.unwrap().total, 1);

    write(&env.corpus, "0001_animal.json", &workflow_json("Okapi Pipeline", &[SLACK], true));
    let report = catalog.reindex(false).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);

    assert_eq!(catalog.query(&query("zebra")).await.unwrap().total, 0);
    let okapi = catalog.query(&query("okapi")).await.unwrap();
    assert_eq!(okapi.total, 1);
    assert_eq!(okapi.documents[0].filename, "0001_animal.json");
    assert_eq!(catalog.query(&query("pipeline")).await.unwrap().total, 2);

    assert!(catalog.store().delete("0001_animal.json").await.unwrap());
    assert_eq!(catalog.query(&query("okapi")).await.unwrap().total, 0);
    assert!(catalog.store().fetch("0001_animal.json").await.unwrap().is_none());
    assert!(!catalog.store().delete("0001_animal.json").await.unwrap());
    assert_eq!(catalog.query(&query("pipeline")).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_pagination_covers_every_match_once() {
    let env = setup();
    for i in 0..23 {
        let mut types = vec![WEBHOOK];
        types.extend(std::iter::repeat(SLACK).take(i % 4));
        write(
            &env.corpus,
            &format!("{:04}_flow.json", i),
            &workflow_json(&format!("Flow {:02}", 22 - i), &types, i % 2 == 0),
        );
    }

    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    for sort in [SortKey::Name, SortKey::NodeCount, SortKey::AnalyzedAt] {
        for limit in [1, 5, 7, 100] {
            let mut seen = Vec::new();
            let mut offset = 0;
            loop {
                let page = catalog
                    .query(&QueryRequest {
                        limit,
                        offset,
                        sort,
                        ..Default::default()
                    })
                    .await
                    .unwrap();
                assert_eq!(page.total, 23);
                assert_eq!(page.pages, 23u64.div_ceil(limit as u64));
                if page.documents.is_empty() {
                    break;
                }
                seen.extend(page.documents.into_iter().map(|d| d.filename));
                offset += limit;
            }
            let unique: HashSet<&String> = seen.iter().collect();
            assert_eq!(seen.len(), 23, "sort {:?} limit {}", sort, limit);
            assert_eq!(unique.len(), 23, "sort {:?} limit {}", sort, limit);
        }
    }

    let by_name = catalog
        .query(&QueryRequest {
            limit: 3,
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<&str> = by_name.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Flow 00", "Flow 01", "Flow 02"]);
}

#[tokio::test]
async fn test_repeated_queries_are_stable() {
    let env = setup();
    for i in 0..10 {
        write(
            &env.corpus,
            &format!("{:04}_same.json", i),
            &workflow_json("Same Name", &[WEBHOOK, SLACK], true),
        );
    }
    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    let request = QueryRequest {
        limit: 4,
        offset: 2,
        sort: SortKey::NodeCount,
        ..Default::default()
    };
    let a: Vec<String> = catalog.query(&request).await.unwrap().documents.into_iter().map(|d| d.filename).collect();
    let b: Vec<String> = catalog.query(&request).await.unwrap().documents.into_iter().map(|d| d.filename).collect();
    assert_eq!(a, b);
    assert_eq!(a, vec!["0002_same.json", "0003_same.json", "0004_same.json", "0005_same.json"]);
}

#[tokio::test]
async fn test_telegram_webhook_pages() {
    let env = setup();
    for i in 0..12 {
        write(
            &env.corpus,
            &format!("{:04}_bot.json", i),
            &workflow_json(&format!("Bot {}", i), &[WEBHOOK, TELEGRAM], true),
        );
    }
    for i in 12..16 {
        write(
            &env.corpus,
            &format!("{:04}_report.json", i),
            &workflow_json(&format!("Report {}", i), &[CRON, SLACK], true),
        );
    }

    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    let request = QueryRequest {
        query: "telegram webhook".to_string(),
        limit: 10,
        offset: 0,
        ..Default::default()
    };
    let first = catalog.query(&request).await.unwrap();
    assert_eq!(first.total, 12);
    assert_eq!(first.pages, first.total.div_ceil(10));
    assert_eq!(first.documents.len(), 10);

    let beyond = catalog
        .query(&QueryRequest {
            offset: first.total as i64,
            ..request.clone()
        })
        .await
        .unwrap();
    assert!(beyond.documents.is_empty());
    assert_eq!(beyond.total, first.total);
}

#[tokio::test]
async fn test_phrase_and_filters() {
    let env = setup();
    let categories = env.corpus.parent().unwrap().join("categories.json");
    fs::write(
        &categories,
        r#"{"Communication": ["0001_a.json", "0003_c.json"], "Empty": []}"#,
    )
    .unwrap();
    let mut config = env.config.clone();
    config.categories.path = Some(categories);

    write(&env.corpus, "0001_a.json", &workflow_json("Slack Relay", &[WEBHOOK, SLACK, HUBSPOT], true));
    write(&env.corpus, "0002_b.json", &workflow_json("Slack Digest", &[CRON, SLACK], false));
    let mut big = vec![CRON, SLACK];
    big.extend(std::iter::repeat(SET).take(18));
    write(&env.corpus, "0003_c.json", &workflow_json("Relay Slack Archive", &big, true));

    let catalog = Catalog::init(&config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    let phrase = catalog.query(&query("\"slack relay\"")).await.unwrap();
    assert_eq!(phrase.total, 1);
    assert_eq!(phrase.documents[0].filename, "0001_a.json");

    let scheduled = catalog
        .query(&QueryRequest {
            trigger: Some(TriggerType::Scheduled),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(scheduled.total, 2);

    let high = catalog
        .query(&QueryRequest {
            complexity: Some(Complexity::High),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(high.total, 1);
    assert_eq!(high.documents[0].filename, "0003_c.json");

    let active = catalog
        .query(&QueryRequest {
            query: "slack".to_string(),
            active_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.total, 2);

    let both = catalog
        .query(&QueryRequest {
            integrations: vec!["Slack".to_string(), "Hubspot".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(both.total, 1);
    assert_eq!(both.documents[0].filename, "0001_a.json");

    let folded = catalog
        .query(&QueryRequest {
            integrations: vec!["slack".to_string(), "HUBSPOT".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(folded.total, 1);
    assert_eq!(folded.documents[0].filename, "0001_a.json");

    let in_category = catalog
        .query(&QueryRequest {
            category: Some("Communication".to_string()),
            trigger: Some(TriggerType::Scheduled),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_category.total, 1);
    assert_eq!(in_category.documents[0].filename, "0003_c.json");

    for category in ["Empty", "Nonexistent"] {
        let none = catalog
            .query(&QueryRequest {
                category: Some(category.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(none.total, 0);
        assert_eq!(none.pages, 0);
    }

    let summaries = catalog.categories();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "Communication");
    assert_eq!(summaries[0].count, 2);
}

#[tokio::test]
async fn test_out_of_range_parameters() {
    let env = setup();
    let catalog = Catalog::init(&env.config).await.unwrap();

    for (limit, offset, field) in [(0, 0, "limit"), (101, 0, "limit"), (10, -1, "offset")] {
        let err = catalog
            .query(&QueryRequest {
                limit,
                offset,
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            IndexError::Validation { field: f, .. } => assert_eq!(f, field),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    let err = catalog.find_similar("x.json", 1.5).await.unwrap_err();
    assert_eq!(err.code(), "validation_error");
}

#[tokio::test]
async fn test_similarity_ranking() {
    let env = setup();
    write(&env.corpus, "0001_ref.json", &workflow_json("Reference", &[WEBHOOK, SLACK, HUBSPOT, SET, SET], true));
    write(&env.corpus, "0002_twin.json", &workflow_json("Twin", &[WEBHOOK, SLACK, HUBSPOT, SET, SET], false));
    let mut partial = vec![WEBHOOK, SLACK];
    partial.extend(std::iter::repeat(SET).take(8));
    write(&env.corpus, "0003_partial.json", &workflow_json("Partial", &partial, true));
    write(&env.corpus, "0004_unrelated.json", &workflow_json("Unrelated", &[TELEGRAM], true));

    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    let strict = catalog.find_similar("0001_ref.json", 0.7).await.unwrap();
    assert_eq!(strict.total, 1);
    assert_eq!(strict.results[0].workflow.filename, "0002_twin.json");
    assert!((strict.results[0].score - 1.0).abs() < 1e-9);
    assert_eq!(strict.results[0].shared_integrations, vec!["Hubspot", "Slack"]);

    let loose = catalog.find_similar("0001_ref.json", 0.0).await.unwrap();
    assert_eq!(loose.total, 3);
    let order: Vec<&str> = loose.results.iter().map(|r| r.workflow.filename.as_str()).collect();
    assert_eq!(order, vec!["0002_twin.json", "0003_partial.json", "0004_unrelated.json"]);
    assert!(loose.results[0].score > loose.results[1].score);
    assert!((loose.results[1].score - 0.6).abs() < 1e-9);
    assert!(order.iter().all(|f| *f != "0001_ref.json"));

    let err = catalog.find_similar("missing.json", 0.5).await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_stats_snapshot_is_memoized() {
    let env = setup();
    write(&env.corpus, "0001_a.json", &workflow_json("Alpha", &[WEBHOOK, SLACK], true));
    write(&env.corpus, "0002_b.json", &workflow_json("Beta", &[CRON, SLACK, HUBSPOT], false));

    let clock = Arc::new(ManualClock::new());
    let catalog = Catalog::init_with_clock(&env.config, Box::new(clock.clone()))
        .await
        .unwrap();
    catalog.reindex(false).await.unwrap();

    let first = catalog.stats().await.unwrap();
    assert_eq!(first.total, 2);
    assert_eq!(first.active, 1);
    assert_eq!(first.active_percentage, 50.0);
    assert_eq!(first.top_integrations[0].name, "Slack");
    assert_eq!(first.top_integrations[0].count, 2);

    write(&env.corpus, "0003_c.json", &workflow_json("Gamma", &[TELEGRAM], true));
    catalog.reindex(false).await.unwrap();

    clock.advance(Duration::from_secs(4));
    assert_eq!(catalog.stats().await.unwrap(), first);

    clock.advance(Duration::from_secs(1));
    let refreshed = catalog.stats().await.unwrap();
    assert_eq!(refreshed.total, 3);
    assert_eq!(refreshed.unique_integrations, 3);
}

#[tokio::test]
async fn test_query_side_requires_initialized_store() {
    let env = setup();
    let err = match Catalog::open(&env.config).await {
        Ok(_) => panic!("expected store_unavailable"),
        Err(e) => e,
    };
    assert_eq!(err.code(), "store_unavailable");
}

#[tokio::test]
async fn test_similarity_caps_results_but_counts_all() {
    let env = setup();
    let profile = [WEBHOOK, SLACK, HUBSPOT, SET, SET];
    write(&env.corpus, "0000_ref.json", &workflow_json("Reference", &profile, true));
    for i in 1..=25 {
        write(
            &env.corpus,
            &format!("{:04}_twin.json", i),
            &workflow_json(&format!("Twin {}", i), &profile, true),
        );
    }

    let catalog = Catalog::init(&env.config).await.unwrap();
    catalog.reindex(false).await.unwrap();

    let response = catalog.find_similar("0000_ref.json", 0.9).await.unwrap();
    assert_eq!(response.total, 25);
    assert_eq!(response.results.len(), 20);
    assert_eq!(response.results[0].workflow.filename, "0001_twin.json");
    assert_eq!(response.results[19].workflow.filename, "0020_twin.json");
}

async fn open_and_query(config: &Config) -> IndexError {
    match Catalog::open(config).await {
        Err(e) => e,
        Ok(catalog) => catalog.query(&QueryRequest::default()).await.unwrap_err(),
    }
}

#[tokio::test]
async fn test_unmigrated_store_is_unavailable() {
    let env = setup();
    fs::create_dir_all(env.config.db.path.parent().unwrap()).unwrap();
    fs::write(&env.config.db.path, b"").unwrap();

    let err = open_and_query(&env.config).await;
    assert_eq!(err.code(), "store_unavailable", "{}", err);
}

#[tokio::test]
async fn test_non_sqlite_file_is_unavailable() {
    let env = setup();
    fs::create_dir_all(env.config.db.path.parent().unwrap()).unwrap();
    fs::write(&env.config.db.path, "this is not a database\n".repeat(512)).unwrap();

    let err = open_and_query(&env.config).await;
    assert_eq!(err.code(), "store_unavailable", "{}", err);
}
