//! Batch driver behavior against an in-process media backend.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use bf_core::catalog::AuthorNames;
use bf_core::CatalogEntry;
use bf_split::{BatchItem, ItemOutcome, ItemState, SplitEvent};
use common::{driver, names_in, source_file, FakeBackend};

const LIMIT: f64 = 36_000.0;

fn book(title: &str) -> CatalogEntry {
    CatalogEntry {
        title: Some(title.into()),
        author_names: Some(AuthorNames::Many(vec!["Ann Leckie".into()])),
        ..CatalogEntry::default()
    }
}

#[tokio::test]
async fn splits_at_chapters_and_commits_every_part() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(80_000.0).with_chapters(&[0.0, 36_000.0, 72_000.0]));
    let (driver, events) = driver(Arc::clone(&fake), &out, LIMIT);

    let outcome = driver.process_item(&book("Ancillary: Justice"), Some(&src)).await;

    assert_eq!(outcome, ItemOutcome::Success);
    assert_eq!(
        names_in(&out),
        vec![
            "Ancillary Justice - Part 1.m4b",
            "Ancillary Justice - Part 2.m4b",
            "Ancillary Justice - Part 3.m4b",
        ]
    );
    assert_eq!(fake.extracts(), 3);
    // A finished item is no longer at risk from a later forced stop.
    assert_eq!(driver.context().tracker.current_item(), None);
    assert!(driver.context().tracker.committed().is_empty());

    let docs = fake.metadata_docs.lock().unwrap();
    assert!(docs[1].contains("title=Ancillary: Justice - Part 2\n"));
    assert!(docs[1].contains("artist=Ann Leckie\n"));
    assert!(docs[1].contains("START=0\nEND=60000\ntitle=Chapter 2\n"));
    assert!(!docs[1].contains("Chapter 3"));

    let events = events.lock().unwrap();
    assert!(events.contains(&SplitEvent::StateChanged {
        title: "Ancillary: Justice".into(),
        state: ItemState::Splitting,
    }));
    assert_matches!(
        events.last(),
        Some(SplitEvent::ItemFinished { outcome: ItemOutcome::Success, .. })
    );
}

#[tokio::test]
async fn second_run_skips_without_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(80_000.0).with_chapters(&[0.0, 36_000.0, 72_000.0]));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);
    let items = vec![BatchItem {
        entry: book("Provenance"),
        source: Some(src),
    }];

    let first = driver.run(&items).await;
    assert_eq!(first.succeeded, 1);
    let extracts = fake.extracts();

    let second = driver.run(&items).await;
    assert_eq!(second.skipped, 1);
    assert_eq!(second.completed(), 1);
    assert_eq!(fake.extracts(), extracts);
    assert_eq!(fake.chapter_probes.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chapter_shifted_plan_is_still_recognised_as_complete() {
    // 21.5h at 10h: chapterless estimate is 3 parts, but a cut at 10.6h
    // leaves a 10.9h tail, so the real plan has 2.
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(21.5 * 3600.0).with_chapters(&[0.0, 10.6 * 3600.0]));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    assert_eq!(driver.process_item(&book("Shifted"), Some(&src)).await, ItemOutcome::Success);
    assert_eq!(names_in(&out).len(), 2);

    assert_eq!(driver.process_item(&book("Shifted"), Some(&src)).await, ItemOutcome::Skipped);
    assert_eq!(fake.extracts(), 2);
}

#[tokio::test]
async fn short_book_is_copied_whole() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(9.0 * 3600.0));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    assert_eq!(driver.process_item(&book("Short"), Some(&src)).await, ItemOutcome::Success);
    assert_eq!(names_in(&out), vec!["Short.m4b"]);
    assert_eq!(
        std::fs::read(out.join("Short.m4b")).unwrap(),
        std::fs::read(&src).unwrap()
    );
    assert_eq!(fake.extracts(), 0);

    assert_eq!(driver.process_item(&book("Short"), Some(&src)).await, ItemOutcome::Skipped);
}

#[tokio::test]
async fn unknown_duration_falls_back_to_catalog_length() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(0.0));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    let mut entry = book("Catalog Length");
    entry.length_minutes = Some(25.0 * 60.0);

    assert_eq!(driver.process_item(&entry, Some(&src)).await, ItemOutcome::Success);
    assert_eq!(fake.extracts(), 3);
}

#[tokio::test]
async fn existing_parts_skip_before_probing_chapters() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    for n in 1..=3 {
        std::fs::write(out.join(format!("Done - Part {n}.m4b")), b"x").unwrap();
    }
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(80_000.0));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    assert_eq!(driver.process_item(&book("Done"), Some(&src)).await, ItemOutcome::Skipped);
    assert_eq!(fake.chapter_probes.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(fake.extracts(), 0);
}

#[tokio::test]
async fn stop_mid_item_discards_committed_parts() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        stop_during_extract_call: Some(2),
        ..FakeBackend::new(80_000.0).with_chapters(&[0.0, 36_000.0, 72_000.0])
    });
    let (driver, events) = driver(Arc::clone(&fake), &out, LIMIT);
    let items = vec![
        BatchItem {
            entry: book("Interrupted"),
            source: Some(src.clone()),
        },
        BatchItem {
            entry: book("Never Started"),
            source: Some(src),
        },
    ];

    let summary = driver.run(&items).await;

    assert!(summary.stopped);
    assert_eq!(summary.remaining(), 2);
    assert_eq!(fake.extracts(), 2);
    assert!(names_in(&out).is_empty(), "left behind: {:?}", names_in(&out));
    assert!(driver.context().tracker.in_progress().is_empty());
    assert!(driver.context().tracker.committed().is_empty());

    let started = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, SplitEvent::ItemStarted { .. }))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn stop_during_remux_removes_partial_output() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        stop_during_remux_call: Some(1),
        ..FakeBackend::new(80_000.0)
    });
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    let outcome = driver.process_item(&book("Partial"), Some(&src)).await;

    assert_eq!(outcome, ItemOutcome::Stopped);
    assert!(names_in(&out).is_empty(), "left behind: {:?}", names_in(&out));
}

#[tokio::test]
async fn stop_killing_the_last_remux_reports_stopped() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        sigint_remux_call: Some(3),
        ..FakeBackend::new(80_000.0)
    });
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    let summary = driver
        .run(&[BatchItem {
            entry: book("Last Part"),
            source: Some(src),
        }])
        .await;

    assert!(summary.stopped);
    assert_eq!(summary.failed, 0);
    assert!(names_in(&out).is_empty(), "left behind: {:?}", names_in(&out));
}

#[tokio::test]
async fn stop_mid_copy_removes_partial_single_file() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        stop_during_copy: true,
        ..FakeBackend::new(2.0 * 3600.0)
    });
    let (driver, events) = driver(Arc::clone(&fake), &out, LIMIT);

    let outcome = driver.process_item(&book("Novella"), Some(&src)).await;

    assert_eq!(outcome, ItemOutcome::Stopped);
    assert!(names_in(&out).is_empty(), "left behind: {:?}", names_in(&out));
    assert!(driver.context().tracker.in_progress().is_empty());
    assert!(events.lock().unwrap().contains(&SplitEvent::StateChanged {
        title: "Novella".into(),
        state: ItemState::CopyOnly,
    }));
}

#[tokio::test]
async fn stop_landing_as_copy_finishes_discards_it() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        stop_after_copy: true,
        ..FakeBackend::new(2.0 * 3600.0)
    });
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    assert_eq!(
        driver.process_item(&book("Novella"), Some(&src)).await,
        ItemOutcome::Stopped
    );
    assert!(!out.join("Novella.m4b").exists());
}

#[tokio::test]
async fn stop_during_probe_touches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        stop_during_probe: true,
        ..FakeBackend::new(80_000.0)
    });
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    let mut entry = book("Probed");
    entry.length_minutes = Some(25.0 * 60.0);

    assert_eq!(driver.process_item(&entry, Some(&src)).await, ItemOutcome::Stopped);
    assert!(!out.exists());
    assert_eq!(fake.chapter_probes.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(fake.extracts(), 0);
}

#[tokio::test]
async fn failed_part_keeps_going_then_discards_item() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend {
        fail_extract_call: Some(2),
        ..FakeBackend::new(80_000.0)
    });
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);
    let items = vec![
        BatchItem {
            entry: book("Broken"),
            source: Some(src.clone()),
        },
        BatchItem {
            entry: book("Fine"),
            source: Some(src),
        },
    ];

    let summary = driver.run(&items).await;

    // Parts 1 and 3 of "Broken" were still attempted.
    assert_eq!(fake.extracts(), 6);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_titles, vec!["Broken".to_string()]);
    assert_eq!(summary.succeeded, 1);
    assert!(!summary.stopped);
    assert_eq!(
        names_in(&out),
        vec!["Fine - Part 1.m4b", "Fine - Part 2.m4b", "Fine - Part 3.m4b"]
    );
}

#[tokio::test]
async fn unresolved_source_fails_without_side_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let fake = Arc::new(FakeBackend::new(80_000.0));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);

    assert_matches!(
        driver.process_item(&book("Nowhere"), None).await,
        ItemOutcome::Failed(reason) if reason.contains("no matching source")
    );
    let missing = tmp.path().join("gone.m4b");
    assert_matches!(
        driver.process_item(&book("Nowhere"), Some(&missing)).await,
        ItemOutcome::Failed(_)
    );
    assert!(!out.exists());
    assert_eq!(fake.extracts(), 0);
}

#[tokio::test]
async fn stop_before_run_processes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let src = source_file(tmp.path(), "src.m4b");
    let fake = Arc::new(FakeBackend::new(80_000.0));
    let (driver, _) = driver(Arc::clone(&fake), &out, LIMIT);
    driver.context().interrupt.request();

    let summary = driver
        .run(&[BatchItem {
            entry: book("Any"),
            source: Some(src),
        }])
        .await;

    assert!(summary.stopped);
    assert_eq!(summary.remaining(), 1);
    assert_eq!(fake.extracts(), 0);
}
