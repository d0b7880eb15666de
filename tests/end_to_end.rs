// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use releasegen::{
    Aggregator, ClientOptions, Clients, Endpoints, ReportBuilder, parse_config, retry::RetryConfig,
    to_json,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn builder(server: &MockServer,) -> ReportBuilder
{
    let options = ClientOptions {
        retry: RetryConfig::none(),
        ..ClientOptions::default()
    };
    let clients = Clients::new("token", Endpoints::single_host(&server.uri(),), options,)
        .expect("clients should build",);
    ReportBuilder::new(clients, Aggregator::new(4,),)
}

async fn mount_json(server: &MockServer, route: &str, body: Value,)
{
    Mock::given(method("GET",),)
        .and(path(route,),)
        .respond_with(ResponseTemplate::new(200,).set_body_json(body,),)
        .mount(server,)
        .await;
}

fn forge_repo(name: &str,) -> Value
{
    json!({
        "name": name,
        "private": false,
        "archived": false,
        "html_url": format!("https://github.com/example/{name}"),
        "default_branch": "main"
    })
}

async fn mount_forge_app(server: &MockServer,)
{
    mount_json(
        server,
        "/orgs/example/teams/platform/repos",
        json!([forge_repo("legacy-repo"), forge_repo("app")]),
    )
    .await;
    mount_json(server, "/repos/example/app", forge_repo("app",),).await;
    mount_json(
        server,
        "/repos/example/app/releases",
        json!([{
            "id": 7,
            "tag_name": "v1.0",
            "name": "v1.0",
            "body": "Fixes https://github.com/example/app/pull/12",
            "html_url": "https://github.com/example/app/releases/tag/v1.0",
            "published_at": "1970-01-01T00:16:40Z"
        }]),
    )
    .await;
    mount_json(server, "/repos/example/app/compare/v1.0...main", json!({"total_commits": 2}),)
        .await;
}

#[tokio::test]
async fn team_report_merges_sources_and_honours_ignores()
{
    let server = MockServer::start().await;
    mount_forge_app(&server,).await;

    // The legacy repository is ignored and must never be queried.
    Mock::given(method("GET",),)
        .and(path("/repos/example/legacy-repo",),)
        .respond_with(ResponseTemplate::new(200,).set_body_json(forge_repo("legacy-repo",),),)
        .expect(0,)
        .mount(&server,)
        .await;

    mount_json(
        &server,
        "/api/v1/users/openinfra/repos",
        json!([
            {"name": "app", "html_url": format!("{}/openinfra/app", server.uri()), "default_branch": "master"},
            {"name": "widget", "html_url": format!("{}/openinfra/widget", server.uri()), "default_branch": "master"}
        ]),
    )
    .await;
    // Already reported by the forge source.
    Mock::given(method("GET",),)
        .and(path("/api/v1/repos/openinfra/app/releases",),)
        .respond_with(ResponseTemplate::new(200,).set_body_json(json!([]),),)
        .expect(0,)
        .mount(&server,)
        .await;
    mount_json(&server, "/api/v1/repos/openinfra/widget/releases", json!([]),).await;
    mount_json(
        &server,
        "/api/v1/repos/openinfra/widget/commits",
        json!([{
            "sha": "abc123",
            "html_url": format!("{}/openinfra/widget/commit/abc123", server.uri()),
            "commit": {"message": "Initial import", "author": {"name": "dev", "date": "1970-01-01T00:08:20Z"}},
            "author": {"full_name": "Dev Eloper"}
        }]),
    )
    .await;

    let config = parse_config(&format!(
        r#"
teams:
  - name: Platform
    github:
      - org: example
        teams: [platform]
        ignores: [legacy-repo]
    launchpad:
      project-groups: [ghost-group]
    gitea:
      - org: openinfra
        url: {}
"#,
        server.uri()
    ),)
    .expect("valid configuration",);

    let reports = builder(&server,).build(&config,).await;
    assert_eq!(reports.len(), 1);

    let team = &reports[0];
    assert_eq!(team.name, "Platform");
    let names: Vec<&str,> = team.repos.iter().map(|repo| repo.name.as_str(),).collect();
    assert_eq!(names, vec!["app", "widget"]);

    let app = &team.repos[0];
    assert_eq!(app.url, "https://github.com/example/app");
    assert_eq!(app.default_branch, "main");
    assert_eq!(app.new_commits_since_last_release, 2);
    assert_eq!(app.releases.len(), 1);
    assert_eq!(app.releases[0].timestamp, 1000);
    assert!(app.releases[0].body.contains(">#12</a>"));
    assert!(app.ci_actions.is_empty());
    assert!(app.snap.is_none());

    let widget = &team.repos[1];
    assert!(widget.releases.is_empty());
    assert_eq!(widget.commits.len(), 1);
    assert_eq!(widget.commits[0].author, "Dev Eloper");
    assert_eq!(widget.commits[0].timestamp, 500);

    let json = to_json(&reports,).expect("serialize",);
    assert!(json.contains("\"newCommitsSinceLastRelease\": 2"));
    assert!(json.contains("\"compareUrl\": \"https://github.com/example/app/compare/v1.0...main\""));
    assert!(!json.contains("legacy-repo"));

    let parsed: Value = serde_json::from_str(&json,).expect("report is valid JSON",);
    assert_eq!(parsed[0]["repos"][0]["snap"], Value::Null);
}

#[tokio::test]
async fn each_team_reports_shared_repositories_independently()
{
    let server = MockServer::start().await;
    mount_forge_app(&server,).await;

    let config = parse_config(
        r#"
teams:
  - name: Alpha
    github:
      - org: example
        teams: [platform]
        ignores: [legacy-repo]
  - name: Beta
    github:
      - org: example
        teams: [platform]
        ignores: [legacy-repo]
"#,
    )
    .expect("valid configuration",);

    let reports = builder(&server,).build(&config,).await;
    let teams: Vec<&str,> = reports.iter().map(|team| team.name.as_str(),).collect();
    assert_eq!(teams, vec!["Alpha", "Beta"]);
    for team in &reports {
        assert_eq!(team.repos.len(), 1, "team {} should report app", team.name);
        assert_eq!(team.repos[0].name, "app");
    }
}

#[tokio::test]
async fn unreachable_sources_still_produce_a_report()
{
    let server = MockServer::start().await;

    let config = parse_config(
        r#"
teams:
  - name: Quiet
    launchpad:
      project-groups: [missing]
"#,
    )
    .expect("valid configuration",);

    let reports = builder(&server,).build(&config,).await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].repos.is_empty());
    assert_eq!(
        to_json(&reports,).expect("serialize",),
        "[\n   {\n      \"name\": \"Quiet\",\n      \"repos\": []\n   }\n]\n"
    );
}
