//! Reconciliation scenarios against an in-memory directory and a scripted
//! platform.

mod common;

use chrono::NaiveDate;
use common::{issue, person, Harness, ISSUE_REPO};
use roster_core::{store, Source};
use roster_sync::{Flow, Phase, SyncError};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[tokio::test]
async fn test_sync_resolves_and_prunes() {
    let harness = Harness::new(
        &["alice-gh", "bob-gh", "mallory"],
        vec![
            person("alice", &["alice-gh", "alice-alt"], &["alice-q"]),
            person("bob", &["bob-gh"], &[]),
        ],
    );
    harness.write_confirmed("gone@redhat.com,gone-gh,,,Automated,\n");

    let report = harness
        .service(harness.config())
        .run_at(day(1), Flow::Sync)
        .await
        .unwrap();

    assert_eq!(report.phase, Phase::Done);
    assert_eq!(report.added, vec!["alice-gh", "bob-gh"]);
    assert_eq!(report.pruned, vec!["gone-gh"]);
    assert_eq!(report.unresolved, vec!["mallory"]);
    assert!(!report.directory_skipped);
    assert!(report.issue.is_none());

    let confirmed = store::read_collection(harness.confirmed_path()).unwrap();
    assert_eq!(confirmed.len(), 2);
    let alice = confirmed.get("Alice-GH").unwrap();
    assert_eq!(alice.directory_email(), Some("alice@redhat.com"));
    assert_eq!(alice.linked_platform_accounts(), ["alice-alt"]);
    assert_eq!(alice.linked_secondary_accounts(), ["alice-q"]);
    assert_eq!(alice.source(), Source::Automated);
    assert!(!confirmed.contains_key("gone-gh"));

    let supplementary = store::read_collection(harness.supplementary_path()).unwrap();
    assert!(supplementary.contains_key("roster-bot"));
    assert_eq!(
        harness.directory.sessions_opened(),
        harness.directory.sessions_released()
    );
}

#[tokio::test]
async fn test_repeated_run_writes_identical_bytes() {
    let harness = Harness::new(
        &["alice-gh", "bob-gh"],
        vec![
            person("alice", &["alice-gh", "alice-alt"], &["alice-q"]),
            person("bob", &["bob-gh"], &["bob-q"]),
        ],
    );
    let mut config = harness.config();
    config.options.validate_directory = true;
    let service = harness.service(config);

    service.run_at(day(1), Flow::Sync).await.unwrap();
    let confirmed = harness.read_confirmed();
    let supplementary = harness.read_supplementary();

    let report = service.run_at(day(2), Flow::Sync).await.unwrap();
    assert!(report.added.is_empty());
    assert!(report.refreshed.is_empty());
    assert!(report.marked.is_empty());
    assert_eq!(harness.read_confirmed(), confirmed);
    assert_eq!(harness.read_supplementary(), supplementary);
}

#[tokio::test]
async fn test_grace_period_marks_then_removes() {
    let harness = Harness::new(
        &["alice-gh", "carol-gh"],
        vec![person("alice", &["alice-gh"], &[])],
    );
    harness.write_confirmed(
        "alice@redhat.com,alice-gh,,,Automated,\ncarol@redhat.com,carol-gh,,,Automated,\n",
    );
    let mut config = harness.config();
    config.options.validate_directory = true;
    let service = harness.service(config);

    let report = service.run_at(day(1), Flow::Sync).await.unwrap();
    assert_eq!(report.marked, vec!["carol-gh"]);
    let confirmed = store::read_collection(harness.confirmed_path()).unwrap();
    assert_eq!(confirmed.get("carol-gh").unwrap().delete_after(), Some(day(8)));

    // Marked records survive pruning and are not re-validated.
    let report = service.run_at(day(8), Flow::RaiseIssues).await.unwrap();
    assert!(report.marked.is_empty());
    assert!(report.removed.is_empty());
    assert_eq!(report.posted_issue, None);
    assert!(harness.platform.state().created.is_empty());

    let report = service.run_at(day(9), Flow::RaiseIssues).await.unwrap();
    assert_eq!(report.removed, vec!["carol-gh"]);
    assert_eq!(report.posted_issue, Some(101));

    let confirmed = store::read_collection(harness.confirmed_path()).unwrap();
    assert!(!confirmed.contains_key("carol-gh"));
    assert!(confirmed.contains_key("alice-gh"));

    let state = harness.platform.state();
    assert_eq!(state.created.len(), 1);
    assert!(state.created[0].2.contains("@carol-gh (carol@redhat.com)"));
    assert_eq!(
        state.labels,
        vec![(ISSUE_REPO.to_string(), 101, vec!["membership".to_string()])]
    );
}

#[tokio::test]
async fn test_integrity_fault_leaves_stores_untouched() {
    let harness = Harness::new(
        &["alice-gh", "twin-gh"],
        vec![
            person("alice", &["alice-gh"], &[]),
            person("twin1", &["twin-gh"], &[]),
            person("twin2", &["twin-gh"], &[]),
        ],
    );
    harness.write_confirmed("alice@redhat.com,alice-gh,,,Automated,\n");
    let confirmed = harness.read_confirmed();
    let supplementary = harness.read_supplementary();

    let err = harness
        .service(harness.config())
        .run_at(day(1), Flow::Sync)
        .await
        .unwrap_err();

    assert!(err.is_integrity_fault());
    assert_eq!(err.exit_code(), 4);
    assert_eq!(harness.read_confirmed(), confirmed);
    assert_eq!(harness.read_supplementary(), supplementary);
}

#[tokio::test]
async fn test_unreachable_directory_is_skipped() {
    let harness = Harness::new(&["alice-gh"], vec![person("alice", &["alice-gh"], &[])]);
    harness.directory.set_reachable(false);
    let mut config = harness.config();
    config.options.validate_directory = true;

    let report = harness
        .service(config)
        .run_at(day(1), Flow::Sync)
        .await
        .unwrap();

    assert!(report.directory_skipped);
    assert!(report.added.is_empty());
    assert_eq!(report.unresolved, vec!["alice-gh"]);
    let supplementary = store::read_collection(harness.supplementary_path()).unwrap();
    assert!(supplementary.contains_key("roster-bot"));
}

#[tokio::test]
async fn test_unreachable_directory_fails_strict_run() {
    let harness = Harness::new(&["alice-gh"], vec![person("alice", &["alice-gh"], &[])]);
    harness.directory.set_reachable(false);
    let mut config = harness.config();
    config.options.fail_without_directory = true;
    let supplementary = harness.read_supplementary();

    let err = harness
        .service(config)
        .run_at(day(1), Flow::Sync)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::DirectoryUnavailable(_)));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(harness.read_supplementary(), supplementary);
}

#[tokio::test]
async fn test_supplementary_member_is_promoted() {
    let harness = Harness::new(
        &["dave-gh", "erin-gh"],
        vec![person("dave", &["dave-gh"], &["dave-q"])],
    );
    harness.write_supplementary(
        "dave@redhat.com,dave-gh,,,Manual,\nerin@gmail.com,erin-gh,,,Manual,\n",
    );
    let mut config = harness.config();
    config.options.validate_directory = true;

    let report = harness
        .service(config)
        .run_at(day(1), Flow::Sync)
        .await
        .unwrap();

    assert_eq!(report.promoted, vec!["dave-gh"]);
    assert_eq!(report.marked, vec!["erin-gh"]);
    assert!(report.unresolved.is_empty());

    let confirmed = store::read_collection(harness.confirmed_path()).unwrap();
    let dave = confirmed.get("dave-gh").unwrap();
    assert_eq!(dave.source(), Source::Manual);
    assert_eq!(dave.linked_secondary_accounts(), ["dave-q"]);

    let supplementary = store::read_collection(harness.supplementary_path()).unwrap();
    assert!(!supplementary.contains_key("dave-gh"));
    assert_eq!(
        supplementary.get("erin-gh").unwrap().delete_after(),
        Some(day(8))
    );
}

#[tokio::test]
async fn test_raise_issues_requires_repository() {
    let harness = Harness::new(&["alice-gh"], vec![]);
    let mut config = harness.config();
    config.issues.repository = None;

    let err = harness
        .service(config)
        .run_at(day(1), Flow::RaiseIssues)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Configuration(_)));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(harness.platform.state().member_listings, 0);
}

#[tokio::test]
async fn test_raise_issues_comments_on_open_issue() {
    let harness = Harness::new(
        &["alice-gh", "frank-gh", "mystery"],
        vec![
            person("alice", &["alice-gh"], &[]),
            person("frank", &[], &[]),
        ],
    );
    harness
        .platform
        .add_profile("frank-gh", None, None, Some("frank@redhat.com"));
    harness
        .platform
        .add_profile("mystery", None, Some("Red Hat"), None);
    harness.platform.state().open_issue = Some(issue(7, "Organization membership report"));

    let report = harness
        .service(harness.config())
        .run_at(day(1), Flow::RaiseIssues)
        .await
        .unwrap();

    assert_eq!(report.added, vec!["alice-gh"]);
    assert_eq!(report.posted_issue, Some(7));
    let issue_report = report.issue.unwrap();
    assert_eq!(issue_report.guessed.len(), 1);
    assert_eq!(issue_report.guessed[0].platform_username(), "frank-gh");
    assert_eq!(
        issue_report.guessed[0].directory_email(),
        Some("frank@redhat.com")
    );
    assert_eq!(issue_report.known_employer[0].platform_username(), "mystery");
    assert!(issue_report.unknown.is_empty());

    // Guessed identities are reported, not stored.
    let confirmed = store::read_collection(harness.confirmed_path()).unwrap();
    assert!(!confirmed.contains_key("frank-gh"));

    let state = harness.platform.state();
    assert!(state.created.is_empty());
    assert_eq!(state.comments.len(), 1);
    let (repo, number, body) = &state.comments[0];
    assert_eq!(repo, ISSUE_REPO);
    assert_eq!(*number, 7);
    assert!(body.contains("@frank-gh (frank@redhat.com)"));
    assert!(body.contains("- @mystery\n"));
    drop(state);

    assert_eq!(
        harness.directory.sessions_opened(),
        harness.directory.sessions_released()
    );
}

#[tokio::test]
async fn test_dry_run_writes_and_posts_nothing() {
    let harness = Harness::new(
        &["alice-gh", "stranger"],
        vec![person("alice", &["alice-gh"], &[])],
    );
    let mut config = harness.config();
    config.options.dry_run = true;
    config.issues.repository = None;
    let confirmed = harness.read_confirmed();
    let supplementary = harness.read_supplementary();

    let report = harness
        .service(config)
        .run_at(day(1), Flow::RaiseIssues)
        .await
        .unwrap();

    assert_eq!(report.added, vec!["alice-gh"]);
    assert_eq!(report.posted_issue, None);
    let issue_report = report.issue.unwrap();
    assert_eq!(issue_report.unknown[0].platform_username(), "stranger");

    assert_eq!(harness.read_confirmed(), confirmed);
    assert_eq!(harness.read_supplementary(), supplementary);
    let state = harness.platform.state();
    assert!(state.created.is_empty());
    assert!(state.comments.is_empty());
}
