//! End-to-end scenarios combining the models the way a widget layer does.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use trellis::expr::{Functions, Value, Variables, compile};
use trellis::model::{LoadError, PagedModel, TreeItem, TreeModel, TreePath};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A lazily loaded directory tree: top-level entries are literal, folder
/// contents come from an async loader, and a selection restores the user's
/// last position by path, expanding whatever it has to on the way.
#[tokio::test]
async fn restores_selection_in_lazy_directory_tree() {
    init_tracing();
    let fetches = Arc::new(AtomicUsize::new(0));

    fn folder(name: &str, fetches: Arc<AtomicUsize>, entries: Vec<TreeItem>) -> TreeItem {
        TreeItem::new(name).with_future_loader(move |_| {
            let fetches = fetches.clone();
            let entries = entries.clone();
            Box::pin(async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                Ok(entries)
            })
        })
    }

    let model = TreeModel::new();
    model.set_values(Arc::new(vec![
        folder(
            "home",
            fetches.clone(),
            vec![
                folder(
                    "projects",
                    fetches.clone(),
                    vec![TreeItem::new("trellis"), TreeItem::new("scratch")],
                ),
                TreeItem::new("notes.txt"),
            ],
        ),
        TreeItem::new("etc").with_items(vec![TreeItem::new("hosts")]),
    ]));

    // Cold start: only the roots are visible.
    assert_eq!(model.holder_count(), 2);

    model
        .set_select(vec![TreePath::parse("home/projects/trellis")])
        .await;

    let rows: Vec<String> = model
        .holders()
        .iter()
        .map(|h| format!("{}{}", "  ".repeat(h.level), h.key()))
        .collect();
    assert_eq!(
        rows,
        [
            "home",
            "  projects",
            "    trellis",
            "    scratch",
            "  notes.txt",
            "etc",
        ]
    );

    let selected = model.select_holders();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].path, TreePath::parse("home/projects/trellis"));
    assert_eq!(selected[0].level, 2);

    // One fetch per expanded folder, none re-issued.
    assert_eq!(fetches.load(Ordering::SeqCst), 2);

    // Collapsing and re-selecting reuses the memoised children.
    let home = model.find(&TreePath::parse("home")).unwrap();
    assert!(model.close(&home));
    model
        .set_select(vec![TreePath::parse("home/projects/scratch")])
        .await;
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert_eq!(model.select_holders()[0].key(), "scratch");
}

/// A chat-style log view: total arrives late, pages load tail-first, and a
/// reload after a direction change discards whatever was in flight.
#[tokio::test]
async fn reverse_loaded_log_matches_forward_order() {
    init_tracing();
    fn message_loader() -> trellis::model::PageLoader<String> {
        Arc::new(|from, count| {
            Box::pin(async move {
                Ok((from..from + count).map(|n| format!("msg {n:02}")).collect())
            })
        })
    }

    let notified = Arc::new(AtomicUsize::new(0));

    let log = PagedModel::new(message_loader());
    log.set_items_per_load(4);
    let notified_clone = notified.clone();
    log.signals().changed.connect(move |_| {
        notified_clone.fetch_add(1, Ordering::SeqCst);
    });

    log.set_total_deferred(Box::pin(async {
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        Ok(10)
    }))
    .await;

    // The deferred total kicked off the first page on its own.
    assert_eq!(log.total(), Some(10));
    assert_eq!(log.count(), 4);
    assert!(notified.load(Ordering::SeqCst) > 0);

    log.set_reverse(true).await;
    while log.load_next().await {}

    // Tail-first fetches, each page reversed on append: newest first in
    // memory, so a bottom-up renderer shows the log in forward order.
    let items = log.items();
    assert_eq!(items.first().map(String::as_str), Some("msg 09"));
    assert_eq!(items.last().map(String::as_str), Some("msg 00"));

    let forward: Vec<String> = (0..10).map(|n| format!("msg {n:02}")).collect();
    let mut mirrored = items.clone();
    mirrored.reverse();
    assert_eq!(mirrored, forward);
}

/// A computed column: each visible row of a paged model is rendered through
/// one compiled expression, evaluated per row with a fresh variable table.
#[tokio::test]
async fn computed_column_over_paged_rows() {
    init_tracing();
    let model = PagedModel::new(Arc::new(|from, count| {
        Box::pin(async move { Ok((from..from + count).collect::<Vec<usize>>()) })
    }));
    model.set_items_per_load(3);
    model.set_total(3);
    assert!(model.load_next().await);

    let template = compile(r#"pad($recno) + ": " + $row["name"]"#).unwrap();
    assert!(template.vars().contains("recno"));
    assert!(template.vars().contains("row"));
    assert!(template.funcs().contains("pad"));

    let functions = Functions::new().with("pad", |args: &[Value]| {
        Ok(Value::from(format!("{:>3}", args[0].display_string())))
    });

    let names = ["ada", "grace", "edsger"];
    let rendered: Vec<String> = model.with_items(|items| {
        items
            .iter()
            .map(|&n| {
                let variables = Variables::new()
                    .with("recno", n as i64)
                    .with("row", Value::map([("name", Value::from(names[n]))]));
                template
                    .evaluate(&functions, &variables)
                    .unwrap()
                    .display_string()
            })
            .collect()
    });

    assert_eq!(rendered, ["  0: ada", "  1: grace", "  2: edsger"]);
}

/// Load failures surface through signals on both models without poisoning
/// later attempts.
#[tokio::test]
async fn failures_are_reported_and_recoverable() {
    init_tracing();
    let failures = Arc::new(Mutex::new(Vec::new()));

    // Tree side: a folder whose first fetch fails.
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    let tree = TreeModel::new();
    tree.set_values(Arc::new(vec![TreeItem::new("flaky").with_future_loader(
        move |_| {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(LoadError::failed("first try fails"))
                } else {
                    Ok(vec![TreeItem::new("finally")])
                }
            })
        },
    )]));

    let failures_clone = failures.clone();
    tree.signals().load_failed.connect(move |(path, message)| {
        failures_clone.lock().push(format!("{path}: {message}"));
    });

    let flaky = tree.find(&TreePath::parse("flaky")).unwrap();
    assert!(!tree.open(&flaky).await);
    assert_eq!(tree.holder_count(), 1);

    let flaky = tree.find(&TreePath::parse("flaky")).unwrap();
    assert!(!flaky.loading);
    assert!(tree.open(&flaky).await);
    assert_eq!(tree.holder_count(), 2);

    assert_eq!(*failures.lock(), vec!["flaky: first try fails".to_string()]);
}
