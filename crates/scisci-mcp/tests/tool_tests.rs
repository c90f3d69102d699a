//! Mock-based tool tests using wiremock.
//!
//! These drive each tool end to end against mocked OpenAlex and Dimensions
//! endpoints and check the rendered output and the files written to disk.
#![allow(clippy::needless_pass_by_value)]

use std::fs::File;
use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scisci_mcp::config::Config;
use scisci_mcp::error::ToolError;
use scisci_mcp::tools::{
    DimensionsAggregateTool, DimensionsRawTool, DimensionsSearchTool, IdentifyExpertsTool,
    LintSkillsTool, McpTool, OpenAlexBatchGetTool, OpenAlexGroupByTool, OpenAlexSearchTool,
    ToolContext,
};

/// Create a test context with a mock server and a scratch output root.
fn setup_test_context(server: &MockServer, out: &TempDir) -> ToolContext {
    let config = Config::for_testing(&server.uri()).with_output_dir(out.path());
    ToolContext::new(config).unwrap()
}

fn files_with_ext(dir: &Path, ext: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(&format!(".{ext}")))
        .collect()
}

/// Row count of every parquet file in `dir`, keyed by file name.
fn parquet_rows(dir: &Path) -> Vec<(String, usize)> {
    files_with_ext(dir, "parquet")
        .into_iter()
        .map(|name| {
            let file = File::open(dir.join(&name)).unwrap();
            let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
            let rows = reader.map(|batch| batch.unwrap().num_rows()).sum();
            (name, rows)
        })
        .collect()
}

fn read_jsonl(dir: &Path) -> Vec<Value> {
    let names = files_with_ext(dir, "jsonl");
    assert_eq!(names.len(), 1, "expected one jsonl file in {}", dir.display());
    std::fs::read_to_string(dir.join(&names[0]))
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Sample OpenAlex work.
fn sample_work(id: &str, title: &str, year: i64, citations: u64) -> Value {
    json!({
        "id": format!("https://openalex.org/{id}"),
        "doi": format!("https://doi.org/10.1234/{id}"),
        "title": title,
        "publication_year": year,
        "cited_by_count": citations,
        "authorships": [{"author": {"display_name": "Ada Lovelace"}}],
        "primary_location": {"source": {"display_name": "Nature"}},
        "open_access": {"is_oa": true}
    })
}

fn openalex_page(count: u64, results: Vec<Value>) -> Value {
    json!({"meta": {"count": count, "per_page": 25, "page": 1}, "results": results})
}

async fn mount_dimensions_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/dimensions/auth.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok"})))
        .mount(server)
        .await;
}

// =============================================================================
// openalex_search
// =============================================================================

#[tokio::test]
async fn test_openalex_search_markdown_and_save() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("search", "graphene"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_page(
            42,
            vec![
                sample_work("W1", "Graphene One", 2023, 100),
                sample_work("W2", "Graphene Two", 2024, 50),
            ],
        )))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = OpenAlexSearchTool
        .execute(&ctx, json!({"query": "graphene", "exportFormat": "dual"}))
        .await
        .unwrap();

    assert!(result.contains("# Works (showing 2 of 42)"));
    assert!(result.contains("## 1. Graphene One"));
    assert!(result.contains("**Authors**: Ada Lovelace"));
    assert!(result.contains("**Saved**"));

    let dir = out.path().join("openalex");
    let saved = files_with_ext(&dir, "jsonl");
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("works_graphene_"));
    assert_eq!(read_jsonl(&dir).len(), 2);

    let parquet = parquet_rows(&dir);
    assert_eq!(parquet.len(), 1);
    assert!(parquet[0].0.starts_with("works_graphene_"));
    assert_eq!(parquet[0].1, 2);
}

#[tokio::test]
async fn test_openalex_search_json_envelope() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openalex_page(
            7,
            vec![sample_work("W9", "Compact", 2021, 3)],
        )))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = OpenAlexSearchTool
        .execute(
            &ctx,
            json!({"filter": "publication_year:2021", "save": false, "responseFormat": "json"}),
        )
        .await
        .unwrap();

    let parsed: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(parsed["total"], 7);
    assert_eq!(parsed["results"][0]["id"], "W9");
    assert_eq!(parsed["results"][0]["year"], 2021);
    assert!(files_with_ext(&out.path().join("openalex"), "jsonl").is_empty());
}

#[tokio::test]
async fn test_openalex_search_large_max_uses_cursor() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", "*"))
        .and(query_param("per_page", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"count": 3, "next_cursor": null},
            "results": [
                sample_work("W1", "A", 2020, 1),
                sample_work("W2", "B", 2020, 1),
                sample_work("W3", "C", 2020, 1)
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = OpenAlexSearchTool
        .execute(&ctx, json!({"maxResults": 500, "save": false}))
        .await
        .unwrap();

    assert!(result.contains("# Works (showing 3 of 3)"));
}

// =============================================================================
// openalex_group_by
// =============================================================================

#[tokio::test]
async fn test_group_by_rejects_unknown_field() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("group_by", "__invalid_field_to_get_valid_list__"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Valid fields are publication_year, primary_topic.field.id, type."
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let err = OpenAlexGroupByTool
        .execute(&ctx, json!({"groupBy": "publication_yr"}))
        .await
        .unwrap_err();

    match err {
        ToolError::Validation { field, message } => {
            assert_eq!(field, "groupBy");
            assert!(message.contains("publication_yr"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_group_by_table() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("group_by", "publication_year"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"count": 300, "groups_count": 2},
            "results": [],
            "group_by": [
                {"key": 2023, "key_display_name": "2023", "count": 200},
                {"key": 2022, "key_display_name": "2022", "count": 100}
            ]
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = OpenAlexGroupByTool
        .execute(&ctx, json!({"groupBy": "publication_year", "validate": false}))
        .await
        .unwrap();

    assert!(result.contains("| Key | Name | Count |"));
    assert!(result.contains("| 2023 | 2023 | 200 |"));
    assert_eq!(files_with_ext(&out.path().join("openalex"), "jsonl").len(), 1);
}

// =============================================================================
// openalex_batch_get
// =============================================================================

#[tokio::test]
async fn test_batch_get_reports_failures() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works/W1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_work("W1", "Found", 2020, 5)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works/W2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = OpenAlexBatchGetTool
        .execute(&ctx, json!({"ids": ["W1", "W2"], "save": false}))
        .await
        .unwrap();

    assert!(result.contains("Found"));
    assert!(result.contains("**Failed (1)**: W2"));
}

#[tokio::test]
async fn test_batch_get_fetches_duplicate_ids_once() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/works/W1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_work("W1", "Found", 2020, 5)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works/W2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = OpenAlexBatchGetTool
        .execute(
            &ctx,
            json!({"ids": ["W1", "W2", "W1", " W2 "], "save": false, "responseFormat": "json"}),
        )
        .await
        .unwrap();

    let parsed: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(parsed["duplicates"], 2);
    assert_eq!(parsed["progress"]["total"], 2);
    assert_eq!(parsed["progress"]["completed"], 1);
    assert_eq!(parsed["progress"]["failed"], 1);
    assert_eq!(parsed["found"].as_array().unwrap().len(), 1);
    assert!(parsed["stats"]["warnings"][0].as_str().unwrap().contains("2 duplicate"));
}

#[tokio::test]
async fn test_batch_get_requires_ids() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    let ctx = setup_test_context(&server, &out);
    let err = OpenAlexBatchGetTool.execute(&ctx, json!({"ids": ["  "]})).await.unwrap_err();
    assert!(matches!(err, ToolError::Validation { ref field, .. } if field == "ids"));
}

// =============================================================================
// Dimensions tools
// =============================================================================

#[tokio::test]
async fn test_dimensions_tools_need_key() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    let mut config = Config::for_testing(&server.uri()).with_output_dir(out.path());
    config.dimensions_key = None;
    let ctx = ToolContext::new(config).unwrap();

    let err = DimensionsSearchTool.execute(&ctx, json!({"query": "x"})).await.unwrap_err();
    assert!(matches!(err, ToolError::Unavailable(_)));
    assert!(err.to_user_message().contains("DIMENSIONS_KEY"));
}

#[tokio::test]
async fn test_dimensions_search_saves_records() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("search publications for \"crispr\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_stats": {"total_count": 1234},
            "publications": [
                {"id": "pub.1", "title": "CRISPR screens", "year": 2022, "times_cited": 40},
                {"id": "pub.2", "title": "Base editing", "year": 2023, "times_cited": 12}
            ]
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = DimensionsSearchTool
        .execute(&ctx, json!({"query": "crispr", "limit": 2, "exportFormat": "dual"}))
        .await
        .unwrap();

    assert!(result.contains("# Publications (showing 2 of 1234)"));
    assert!(result.contains("CRISPR screens"));

    let dir = out.path().join("dimensions");
    let saved = files_with_ext(&dir, "jsonl");
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("publications_crispr_"));
    assert_eq!(read_jsonl(&dir).len(), 2);
    assert_eq!(parquet_rows(&dir), vec![(saved[0].replace(".jsonl", ".parquet"), 2)]);
}

#[tokio::test]
async fn test_dimensions_aggregate_validates_facet() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("describe source grants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": {
                "funders": {"type": "organizations", "is_facet": true},
                "funding_year": {"type": "integer", "is_facet": true}
            },
            "metrics": {"count": {}, "funding": {}}
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let err = DimensionsAggregateTool
        .execute(&ctx, json!({"source": "grants", "query": "malaria", "facet": "funderz"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::Validation { ref field, .. } if field == "facet"));
}

#[tokio::test]
async fn test_dimensions_aggregate_table() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("return funders aggregate funding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_stats": {"total_count": 900},
            "funders": [
                {"id": "grid.1", "name": "Wellcome Trust", "count": 120, "funding": 5000000},
                {"id": "grid.2", "name": "Gates Foundation", "count": 80, "funding": 3000000}
            ]
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = DimensionsAggregateTool
        .execute(
            &ctx,
            json!({
                "source": "grants",
                "query": "malaria",
                "facet": "funders",
                "metrics": "funding",
                "validate": false,
                "responseFormat": "json"
            }),
        )
        .await
        .unwrap();

    let parsed: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(parsed["facet"], "funders");
    assert_eq!(parsed["total"], 900);
    assert_eq!(parsed["data"].as_array().unwrap().len(), 2);
    assert_eq!(files_with_ext(&out.path().join("dimensions"), "jsonl").len(), 1);
}

#[tokio::test]
async fn test_dimensions_raw_facet_result() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_stats": {"total_count": 50},
            "year": [{"id": 2023, "count": 30}, {"id": 2022, "count": 20}]
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = DimensionsRawTool
        .execute(
            &ctx,
            json!({"dsl": "search publications for \"perovskite\" return year limit 10"}),
        )
        .await
        .unwrap();

    assert!(result.contains("# Year (showing 2 of 50)"));
    let saved = files_with_ext(&out.path().join("dimensions"), "jsonl");
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("facet_year_perovskite_"));
}

#[tokio::test]
async fn test_dimensions_raw_without_records_returns_body() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_stats": {"total_count": 0},
            "note": "nothing tabular here"
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = DimensionsRawTool
        .execute(&ctx, json!({"dsl": "describe version", "responseFormat": "json"}))
        .await
        .unwrap();

    let parsed: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(parsed["data"]["note"], "nothing tabular here");
    assert_eq!(parsed["stats"]["records"], 1);

    let saved = files_with_ext(&out.path().join("dimensions"), "jsonl");
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("dsl_result_"));
}

#[tokio::test]
async fn test_dimensions_raw_describe_keeps_whole_schema() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("describe source publications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": {
                "year": {"type": "integer", "is_facet": true, "is_filter": true},
                "title": {"type": "string", "is_filter": true}
            },
            "fieldsets": ["basics", "extras"],
            "metrics": {"count": {"description": "Total count"}},
            "search_fields": ["title_only", "full_data"]
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = DimensionsRawTool
        .execute(&ctx, json!({"dsl": "describe source publications", "exportFormat": "dual"}))
        .await
        .unwrap();

    assert!(result.starts_with("# DSL result"));
    assert!(result.contains("\"search_fields\""));
    assert!(result.contains("\"metrics\""));
    assert!(!result.contains("showing"));

    let dir = out.path().join("dimensions");
    let lines = read_jsonl(&dir);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["fieldsets"], json!(["basics", "extras"]));
    assert_eq!(lines[0]["fields"]["year"]["is_facet"], true);

    let parquet = parquet_rows(&dir);
    assert_eq!(parquet.len(), 1);
    assert!(parquet[0].0.starts_with("dsl_result_"));
    assert_eq!(parquet[0].1, 1);
}

#[tokio::test]
async fn test_dimensions_raw_concept_strings_dual_export() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_dimensions_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("extract_concepts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "extracted_concepts": ["graphene", "oxide", "membrane"]
        })))
        .mount(&server)
        .await;

    let ctx = setup_test_context(&server, &out);
    let result = DimensionsRawTool
        .execute(
            &ctx,
            json!({
                "dsl": "extract_concepts(\"graphene oxide membranes\")",
                "exportFormat": "dual",
                "responseFormat": "json"
            }),
        )
        .await
        .unwrap();

    let parsed: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(parsed["data"]["extracted_concepts"][2], "membrane");

    let dir = out.path().join("dimensions");
    assert_eq!(read_jsonl(&dir)[0]["extracted_concepts"].as_array().unwrap().len(), 3);
    let parquet = parquet_rows(&dir);
    assert_eq!(parquet.len(), 1);
    assert_eq!(parquet[0].1, 1);
}

#[tokio::test]
async fn test_identify_experts_requires_concepts() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    let ctx = setup_test_context(&server, &out);
    let err = IdentifyExpertsTool.execute(&ctx, json!({"concepts": []})).await.unwrap_err();
    assert!(matches!(err, ToolError::Validation { ref field, .. } if field == "concepts"));
}

// =============================================================================
// lint_skills
// =============================================================================

#[tokio::test]
async fn test_lint_skills_tool() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let skills = TempDir::new().unwrap();

    let good = skills.path().join("good");
    std::fs::create_dir_all(&good).unwrap();
    std::fs::write(
        good.join("SKILL.md"),
        "---\nname: good-skill\ndescription: Does a thing.\n---\n# Body\n",
    )
    .unwrap();

    let bad = skills.path().join("bad");
    std::fs::create_dir_all(&bad).unwrap();
    std::fs::write(bad.join("SKILL.md"), "---\nname: Bad_Name\n---\n").unwrap();

    let ctx = setup_test_context(&server, &out);
    let result = LintSkillsTool
        .execute(&ctx, json!({"path": skills.path().to_string_lossy()}))
        .await
        .unwrap();

    assert!(result.contains("2 file(s), 1 passed, 1 failed"));
    assert!(result.contains("missing 'description'"));
}
