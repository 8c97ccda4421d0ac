// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end behavior of provisioning, initialization and reset

use lodestar_core::{
    DebugOptionsUpdate, DependencyEntry, Error, Exports, MemoryLoader, Runtime, RuntimeConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

fn runtime() -> (Runtime, Arc<MemoryLoader>) {
    let loader = Arc::new(MemoryLoader::new());
    (Runtime::new(RuntimeConfig::default(), loader.clone()), loader)
}

fn module_slot(exports: &Exports, name: &str) -> Exports {
    exports
        .get(name)
        .and_then(|value| value.as_module().cloned())
        .unwrap_or_else(|| panic!("slot {name} does not hold a module"))
}

#[test]
fn test_factory_runs_at_most_once() {
    let (runtime, _) = runtime();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let require = runtime.require();

    require
        .memoize("shared", Vec::new(), move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .unwrap();
    require
        .memoize(
            "user",
            vec![DependencyEntry::plain("shared")],
            |require, exports, _| {
                exports.set("first", require.require("shared")?);
                exports.set("second", require.require("shared")?);
                Ok(None)
            },
        )
        .unwrap();

    let user = require.require("user").unwrap();
    let direct = require.require("shared").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(module_slot(&user, "first").ptr_eq(&direct));
    assert!(module_slot(&user, "second").ptr_eq(&direct));
}

#[test]
fn test_cycle_shares_exports() {
    let (runtime, _) = runtime();
    let require = runtime.require();

    require
        .memoize("a", vec![DependencyEntry::plain("b")], |require, exports, _| {
            exports.set("early", true);
            exports.set("b", require.require("b")?);
            exports.set("done", true);
            Ok(None)
        })
        .unwrap();
    require
        .memoize("b", vec![DependencyEntry::plain("a")], |require, exports, _| {
            let a = require.require("a")?;
            assert!(a.contains("early"));
            assert!(!a.contains("done"));
            exports.set("a", a);
            Ok(None)
        })
        .unwrap();

    let a = require.require("a").unwrap();
    let b = require.require("b").unwrap();

    assert!(module_slot(&a, "b").ptr_eq(&b));
    assert!(module_slot(&b, "a").ptr_eq(&a));
    assert!(module_slot(&b, "a").contains("done"));
}

#[test]
fn test_cycle_with_alternate_exports_fails() {
    let (runtime, _) = runtime();
    let require = runtime.require();

    require
        .memoize("a", vec![DependencyEntry::plain("b")], |require, _, _| {
            require.require("b")?;
            Ok(Some(Exports::new()))
        })
        .unwrap();
    require
        .memoize("b", vec![DependencyEntry::plain("a")], |require, exports, _| {
            exports.set("a", require.require("a")?);
            Ok(None)
        })
        .unwrap();

    assert!(matches!(
        require.require("a"),
        Err(Error::CircularExportsConflict(id)) if id == "a"
    ));
}

#[test]
fn test_alternate_exports_without_cycle() {
    let (runtime, _) = runtime();
    let require = runtime.require();
    let replacement = Exports::new();
    replacement.set("kind", "replacement");
    let published = replacement.clone();

    require
        .memoize("alt", Vec::new(), move |_, _, _| Ok(Some(published.clone())))
        .unwrap();

    assert!(require.require("alt").unwrap().ptr_eq(&replacement));
}

#[tokio::test]
async fn test_concurrent_batches_share_one_fetch() {
    let (runtime, loader) = runtime();
    loader.insert_unit("x.js", Vec::new(), |_, exports, _| {
        exports.set("x", true);
        Ok(None)
    });

    let first = runtime.module();
    let second = runtime.module();
    let (a, b) = futures::join!(
        first.provide(vec![DependencyEntry::plain("x")]),
        second.provide(vec![DependencyEntry::plain("x")])
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(loader.fetch_count("x.js"), 1);
    assert!(runtime.require().require("x").unwrap().contains("x"));
}

#[tokio::test]
async fn test_fan_in_waits_for_every_id() {
    let (runtime, loader) = runtime();
    let require = runtime.require();

    require.memoize("a", Vec::new(), |_, _, _| Ok(None)).unwrap();
    require.require("a").unwrap();
    require
        .memoize("c", vec![DependencyEntry::plain("d")], |_, _, _| Ok(None))
        .unwrap();
    loader.insert_unit("b.js", Vec::new(), |_, _, _| Ok(None));
    loader.insert_unit("d.js", Vec::new(), |_, _, _| Ok(None));

    runtime
        .module()
        .provide(vec![
            DependencyEntry::plain("a"),
            DependencyEntry::plain("b"),
            DependencyEntry::plain("c"),
        ])
        .await
        .unwrap();

    assert!(require.is_memoized("b").unwrap());
    assert!(require.is_memoized("d").unwrap());
    assert_eq!(loader.fetch_count("a.js"), 0);
    assert_eq!(loader.fetch_count("b.js"), 1);
    assert_eq!(loader.fetch_count("c.js"), 0);
    assert_eq!(loader.fetch_count("d.js"), 1);
}

#[tokio::test]
async fn test_transitive_provisioning_through_labels() {
    let (runtime, loader) = runtime();
    loader.insert_unit(
        "app/main.js",
        vec![DependencyEntry::labeled([("fmt", "./util/fmt")])],
        |require, exports, _| {
            exports.set("fmt", require.require("fmt")?);
            Ok(None)
        },
    );
    loader.insert_unit(
        "app/util/fmt.js",
        vec![DependencyEntry::plain("../shared")],
        |_, exports, _| {
            exports.set("name", "fmt");
            Ok(None)
        },
    );
    loader.insert_unit("app/shared.js", Vec::new(), |_, _, _| Ok(None));

    runtime
        .module()
        .provide(vec![DependencyEntry::plain("app/main")])
        .await
        .unwrap();

    let ids: Vec<_> = runtime.list_modules().iter().map(|id| id.to_string()).collect();
    assert!(ids.contains(&"app/util/fmt".to_string()));
    assert!(ids.contains(&"app/shared".to_string()));

    let main = runtime.require().require("app/main").unwrap();
    assert!(module_slot(&main, "fmt").contains("name"));
}

#[tokio::test]
async fn test_cyclic_units_provision_and_initialize() {
    let (runtime, loader) = runtime();
    loader.insert_unit("p.js", vec![DependencyEntry::plain("q")], |require, exports, _| {
        exports.set("q", require.require("q")?);
        Ok(None)
    });
    loader.insert_unit("q.js", vec![DependencyEntry::plain("p")], |require, exports, _| {
        exports.set("p", require.require("p")?);
        Ok(None)
    });

    runtime
        .module()
        .provide(vec![DependencyEntry::plain("p")])
        .await
        .unwrap();

    let p = runtime.require().require("p").unwrap();
    assert!(module_slot(&module_slot(&p, "q"), "p").ptr_eq(&p));
    assert_eq!(loader.fetch_count("p.js"), 1);
    assert_eq!(loader.fetch_count("q.js"), 1);
}

#[tokio::test]
async fn test_failed_fetches_still_complete() {
    let (runtime, loader) = runtime();
    loader.insert("silent.js", |_| Ok(()));

    runtime
        .module()
        .provide(vec![
            DependencyEntry::plain("silent"),
            DependencyEntry::plain("absent"),
        ])
        .await
        .unwrap();

    let require = runtime.require();
    assert!(matches!(require.require("silent"), Err(Error::NotAvailable(_))));
    assert!(matches!(require.require("absent"), Err(Error::NotAvailable(_))));
}

#[tokio::test]
async fn test_bad_dependency_path_fails_synchronously() {
    let (runtime, loader) = runtime();
    let result = runtime
        .module()
        .provide(vec![DependencyEntry::plain("../outside")])
        .await;

    assert!(matches!(result, Err(Error::InvalidPath(_))));
    assert_eq!(loader.total_fetches(), 0);
}

#[test]
fn test_unknown_require_leaves_tables_alone() {
    let (runtime, _) = runtime();
    let before = runtime.list_modules();

    assert!(matches!(
        runtime.require().require("never/declared"),
        Err(Error::NotAvailable(_))
    ));
    assert_eq!(runtime.list_modules(), before);
}

#[test]
fn test_reset_clears_units() {
    let (runtime, _) = runtime();
    runtime
        .require()
        .memoize("kept", Vec::new(), |_, _, _| Ok(None))
        .unwrap();
    runtime.require().require("kept").unwrap();

    runtime.reset(None);

    assert!(matches!(
        runtime.require().require("kept"),
        Err(Error::NotAvailable(_))
    ));
    runtime
        .require()
        .memoize("kept", Vec::new(), |_, _, _| Ok(None))
        .unwrap();
    assert!(runtime.require().require("kept").is_ok());
}

#[tokio::test]
async fn test_reset_during_fetch_does_not_leak() {
    let (runtime, loader) = runtime();
    loader.insert_unit("slow.js", Vec::new(), |_, _, _| Ok(None));

    let stale = runtime.module();
    let resetter = runtime.clone();
    let (provided, ()) = futures::join!(stale.provide(vec![DependencyEntry::plain("slow")]), async {
        tokio::task::yield_now().await;
        resetter.reset(None);
    });

    provided.unwrap();
    assert_eq!(loader.fetch_count("slow.js"), 1);
    assert!(!runtime.require().is_memoized("slow").unwrap());
    assert_eq!(runtime.generation().number(), 2);
}

#[tokio::test]
async fn test_cache_busting_reaches_loader() {
    let (runtime, loader) = runtime();
    loader.insert_unit("fresh.js", Vec::new(), |_, _, _| Ok(None));
    runtime.set_debug_options(DebugOptionsUpdate {
        disable_caching: Some(true),
        warn_undeclared: Some(true),
    });

    runtime
        .module()
        .provide(vec![DependencyEntry::plain("fresh")])
        .await
        .unwrap();

    assert_eq!(loader.fetch_count("fresh.js"), 1);
    assert!(runtime.require().require("fresh").is_ok());
}

#[test]
fn test_undeclared_require_only_warns() {
    let (runtime, _) = runtime();
    runtime.set_debug_options(DebugOptionsUpdate {
        disable_caching: None,
        warn_undeclared: Some(true),
    });
    let require = runtime.require();
    require.memoize("dep", Vec::new(), |_, _, _| Ok(None)).unwrap();
    require
        .memoize("sneaky", Vec::new(), |require, exports, _| {
            exports.set("dep", require.require("dep")?);
            Ok(None)
        })
        .unwrap();

    assert!(require.require("sneaky").is_ok());
}

#[test]
fn test_require_from_another_thread_waits_for_factory() {
    let (runtime, _) = runtime();
    let (started_tx, started_rx) = mpsc::channel();
    runtime
        .require()
        .memoize("slow", Vec::new(), move |_, _, _| {
            let _ = started_tx.send(());
            thread::sleep(Duration::from_millis(100));
            let replacement = Exports::new();
            replacement.set("done", true);
            Ok(Some(replacement))
        })
        .unwrap();

    let runner = {
        let runtime = runtime.clone();
        thread::spawn(move || runtime.require().require("slow"))
    };
    started_rx.recv().unwrap();
    let waited = runtime.require().require("slow").unwrap();
    let ran = runner.join().unwrap().unwrap();

    assert!(waited.ptr_eq(&ran));
    assert!(waited.contains("done"));
}

#[test]
fn test_cycle_across_threads_terminates() {
    let (runtime, _) = runtime();
    let barrier = Arc::new(Barrier::new(2));
    let require = runtime.require();

    for (name, other) in [("a", "b"), ("b", "a")] {
        let barrier = Arc::clone(&barrier);
        require
            .memoize(name, vec![DependencyEntry::plain(other)], move |require, exports, _| {
                barrier.wait();
                exports.set(other, require.require(other)?);
                Ok(None)
            })
            .unwrap();
    }

    let first = {
        let runtime = runtime.clone();
        thread::spawn(move || runtime.require().require("a"))
    };
    let b = runtime.require().require("b").unwrap();
    let a = first.join().unwrap().unwrap();

    assert!(module_slot(&a, "b").ptr_eq(&b));
    assert!(module_slot(&b, "a").ptr_eq(&a));
}
