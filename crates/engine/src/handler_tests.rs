// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeRuntime;
use familiar_config::ServerConfig;
use familiar_core::{EventKind, FakeClock, Forge, SystemClock};
use std::process::Command as StdCommand;
use std::time::Duration;
use tempfile::TempDir;
use yare::parameterized;

#[parameterized(
    common_dir = { &["src/a/one.rs", "src/a/two.rs"], "src/a" },
    partial_overlap = { &["src/a/one.rs", "src/b/two.rs"], "src" },
    deep_overlap = { &["src/deep/x/f.rs", "src/deep/y/g.rs"], "src/deep" },
    single_path = { &["src/only/f.rs"], "src/only" },
    root_file = { &["a.rs"], "." },
    root_file_among_nested = { &["src/a/one.rs", "a.rs"], "." },
    divergent_roots = { &["src/a.rs", "docs/b.md"], "." },
    empty = { &[], "." },
)]
fn lca_cases(paths: &[&str], expected: &str) {
    assert_eq!(least_common_ancestor(paths), expected);
}

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .unwrap();
    assert!(status.success());
}

fn origin_repo(root: &TempDir) -> std::path::PathBuf {
    let origin = root.path().join("origin");
    std::fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "-b", "main"]);
    std::fs::write(origin.join("README.md"), "hello\n").unwrap();
    git(&origin, &["add", "."]);
    git(&origin, &["commit", "-m", "initial"]);
    git(&origin, &["checkout", "-b", "feature"]);
    std::fs::write(origin.join("work.txt"), "wip\n").unwrap();
    git(&origin, &["add", "."]);
    git(&origin, &["commit", "-m", "feature"]);
    git(&origin, &["checkout", "main"]);
    origin
}

fn opened_event(clone_url: String) -> Event {
    Event {
        kind: EventKind::MrOpened,
        forge: Forge::GitHub,
        repo_owner: "acme".into(),
        repo_name: "widgets".into(),
        clone_url,
        mr_number: 42,
        mr_title: "Title".into(),
        mr_description: String::new(),
        source_branch: "feature".into(),
        target_branch: "main".into(),
        comment: None,
        actor: "alice".into(),
        received_at: chrono::Utc::now(),
        raw_payload: Vec::new(),
    }
}

fn merged() -> MergedConfig {
    let server: ServerConfig = serde_yaml::from_str("{}").unwrap();
    MergedConfig::resolve(&server, &familiar_config::RepoConfig::default())
}

struct Fixture {
    handler: AgentHandler<SystemClock>,
    runtime: Arc<FakeRuntime>,
    cache: Arc<RepoCache>,
    pool: Arc<SpawnPool>,
    _root: TempDir,
    clone_url: String,
}

fn fixture() -> Fixture {
    let root = TempDir::new().unwrap();
    let origin = origin_repo(&root);
    let runtime = Arc::new(FakeRuntime::finishing());
    let cache = Arc::new(RepoCache::new(root.path().join("cache")));
    let pool = Arc::new(SpawnPool::new(2, 8));
    let metrics = Arc::new(Metrics::new());
    let spawner = Arc::new(AgentSpawner::new(
        runtime.clone(),
        10,
        30,
        metrics.clone(),
        SystemClock,
    ));
    let logs = Arc::new(LogWriter::new(root.path().join("logs")));
    let handler = AgentHandler::new(
        Arc::new(familiar_adapters::provider::ProviderSet::default()),
        cache.clone(),
        pool.clone(),
        spawner,
        logs,
        AgentsSection::default(),
        metrics,
    );
    let clone_url = origin.display().to_string();
    Fixture { handler, runtime, cache, pool, _root: root, clone_url }
}

#[test]
fn agent_id_combines_identity_and_timestamp() {
    let event = opened_event("file:///tmp/x".into());
    let id = AgentHandler::<FakeClock>::agent_id(&event).to_string();
    assert!(id.starts_with("github-widgets-42-"));
    assert!(id.rsplit('-').next().unwrap().parse::<i64>().is_ok());
}

#[tokio::test]
async fn handle_materializes_worktree_and_spawns() {
    let f = fixture();
    let event = opened_event(f.clone_url.clone());

    f.handler.handle(&event, &merged(), None).await.unwrap();

    // the spawn task runs on the pool; wait for the container create
    tokio::time::timeout(Duration::from_secs(5), async {
        while f.runtime.created.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let created = f.runtime.created.lock();
    let (_, spec) = &created[0];
    // no provider configured: raw clone url, /workspace working dir
    assert_eq!(spec.working_dir.as_deref(), Some("/workspace"));
    let workspace_bind = spec.binds.iter().find(|b| b.container_path == "/workspace").unwrap();
    assert!(workspace_bind.host_path.contains("worktrees-data"));
    let cache_bind = spec.binds.iter().find(|b| b.container_path == "/cache").unwrap();
    assert!(cache_bind.read_only);
    assert!(spec.env.iter().any(|(k, _)| k == "FAMILIAR_PROMPT"));
}

#[tokio::test]
async fn completed_agent_releases_worktree() {
    let f = fixture();
    let event = opened_event(f.clone_url.clone());
    f.handler.handle(&event, &merged(), None).await.unwrap();

    // after the container "exits" (FakeRuntime::finishing), the task
    // captures logs and removes the worktree
    tokio::time::timeout(Duration::from_secs(5), async {
        while f.runtime.removed.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    f.pool.shutdown().await;

    let worktrees = f.cache.repo_path("acme", "widgets").join("worktrees-data");
    let leftover: Vec<_> = std::fs::read_dir(&worktrees)
        .map(|entries| entries.flatten().collect())
        .unwrap_or_default();
    assert!(leftover.is_empty(), "worktree not released: {:?}", leftover);
}

#[tokio::test]
async fn missing_branch_surfaces_cache_error() {
    let f = fixture();
    let mut event = opened_event(f.clone_url.clone());
    event.source_branch = "does-not-exist".into();

    let err = f.handler.handle(&event, &merged(), None).await.unwrap_err();
    assert!(matches!(err, HandleError::Cache(CacheError::Add(_))));
}
