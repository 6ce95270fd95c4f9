use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use pollvisor::{
    ApplyError, CompositeKey, EventKind, ExitReason, ParseError, ProviderError, RuntimeError,
    Scheduler, SchedulerConfig, SubscriptionEntry, TaskError, TaskSpec, TaskState, TickFn,
    TickOutcome, TickRef, WorkFn, WorkRef, parse,
};

fn key(provider: &str) -> CompositeKey {
    CompositeKey::new("g1", "u1", provider)
}

fn scheduler(cfg: SchedulerConfig) -> Scheduler<u64> {
    Scheduler::builder(cfg).build()
}

fn constant(v: u64) -> WorkRef<u64> {
    WorkFn::arc("constant", move || async move { Ok::<_, ProviderError>(v) })
}

/// Tick handler forwarding `(tag, outcome)` to a channel.
fn forward(
    tag: &'static str,
    tx: mpsc::UnboundedSender<(&'static str, TickOutcome<u64>)>,
) -> TickRef<u64> {
    TickFn::arc(move |_key, _work, outcome: TickOutcome<u64>| {
        let tx = tx.clone();
        async move {
            let _ = tx.send((tag, outcome));
            Ok(())
        }
    })
}

fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(v) = rx.try_recv() {
        out.push(v);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_three_ticks_of_constant_work_in_fifteen_seconds() {
    let sched = scheduler(SchedulerConfig::default());
    let mut events = sched.bus().subscribe();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = sched
        .start_or_replace(key("providerA"), parse("5s").unwrap(), constant(42), forward("a", tx))
        .await;
    time::sleep(Duration::from_millis(15_100)).await;

    let outcomes = drain(&mut rx);
    assert_eq!(outcomes, vec![("a", Ok(42)), ("a", Ok(42)), ("a", Ok(42))]);
    assert_eq!(handle.ticks(), 3);

    let mut ticks = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::TickSucceeded {
            ticks.push(ev.tick.unwrap());
        }
    }
    assert_eq!(ticks, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_replaced_task_never_fires_again() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let old = sched
        .start_or_replace(
            key("providerA"),
            parse("5s").unwrap(),
            constant(1),
            forward("old", tx.clone()),
        )
        .await;
    time::sleep(Duration::from_secs(7)).await;

    let new = sched
        .start_or_replace(key("providerA"), parse("10s").unwrap(), constant(2), forward("new", tx))
        .await;
    time::sleep(Duration::from_secs(25)).await;

    let tags: Vec<_> = drain(&mut rx).into_iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags, vec!["old", "new", "new"]);
    assert_eq!(old.state(), TaskState::Cancelled);
    assert_eq!(new.state(), TaskState::Running);
    assert_eq!(sched.registry().len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_outcome_in_flight_during_replace_is_dropped() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let slow: WorkRef<u64> = WorkFn::arc("slow", || async {
        time::sleep(Duration::from_secs(3)).await;
        Ok::<_, ProviderError>(1)
    });

    let old = sched
        .start_or_replace(key("p"), parse("5s").unwrap(), slow, forward("old", tx.clone()))
        .await;
    // Tick 1 of the old task is producing from 5s to 8s.
    time::sleep(Duration::from_secs(6)).await;
    sched
        .start_or_replace(key("p"), parse("5s").unwrap(), constant(2), forward("new", tx))
        .await;

    assert_eq!(old.wait().await, ExitReason::Cancelled);
    assert_eq!(old.ticks(), 1);
    time::sleep(Duration::from_secs(10)).await;

    let tags: Vec<_> = drain(&mut rx).into_iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags, vec!["new", "new"]);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_interval_creates_no_task() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let factory = move |_: &SubscriptionEntry| -> Result<WorkRef<u64>, ProviderError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(constant(42))
    };
    let entries = [SubscriptionEntry::new("g1", "u1", "providerA", "abc")];

    let report = sched.apply(&entries, &factory, forward("a", tx)).await;
    time::sleep(Duration::from_secs(60)).await;

    assert!(report.started.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].0, key("providerA"));
    assert!(matches!(
        report.rejected[0].1,
        ApplyError::Cadence(ParseError::Malformed { .. })
    ));
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert!(sched.find(&key("providerA")).await.is_none());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failing_work_keeps_steady_cadence() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<Instant>();
    let start = Instant::now();
    let failing: WorkRef<u64> = WorkFn::arc("down", move || {
        let tx = tx.clone();
        async move {
            let _ = tx.send(Instant::now());
            Err::<u64, _>(ProviderError::Request("connection refused".into()))
        }
    });
    let (otx, mut orx) = mpsc::unbounded_channel();

    let handle = sched
        .start_or_replace(key("down"), parse("5s").unwrap(), failing, forward("down", otx))
        .await;
    time::sleep(Duration::from_millis(30_500)).await;
    handle.stop();

    let offsets: Vec<u64> = drain(&mut rx)
        .into_iter()
        .map(|at| (at - start).as_secs())
        .collect();
    assert_eq!(offsets, vec![5, 10, 15, 20, 25, 30]);

    let outcomes = drain(&mut orx);
    assert_eq!(outcomes.len(), 6);
    assert!(outcomes.iter().all(|(_, o)| o.is_err()));
    assert_eq!(handle.wait().await, ExitReason::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_finishes_once() {
    let sched = scheduler(SchedulerConfig::default());
    let finished = Arc::new(AtomicUsize::new(0));
    let (tx, _rx) = mpsc::unbounded_channel();

    let counter = finished.clone();
    let spec = TaskSpec::new(key("a"), parse("5s").unwrap(), constant(1), forward("a", tx))
        .on_finished(Arc::new(move |_key: &CompositeKey, reason: &ExitReason| {
            assert_eq!(reason, &ExitReason::Cancelled);
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    let handle = sched.start(spec).await;

    handle.stop();
    handle.stop();
    assert_eq!(handle.wait().await, ExitReason::Cancelled);
    handle.stop();
    assert!(!sched.stop(&key("a")).await);
    time::sleep(Duration::from_secs(60)).await;

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(handle.ticks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_failure_is_a_no_op() {
    let sched = scheduler(SchedulerConfig::default());
    let finished = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let revoked: WorkRef<u64> = WorkFn::arc("revoked", || async {
        Err::<u64, _>(ProviderError::Fatal("account deleted".into()))
    });

    let counter = finished.clone();
    let spec = TaskSpec::new(key("a"), parse("1s").unwrap(), revoked, forward("a", tx)).on_finished(
        Arc::new(move |_key: &CompositeKey, _reason: &ExitReason| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let handle = sched.start(spec).await;

    let reason = handle.wait().await;
    handle.stop();
    handle.stop();

    assert!(matches!(reason, ExitReason::Errored(TaskError::Fatal { .. })));
    assert_eq!(handle.state(), TaskState::Failed);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(drain(&mut rx).is_empty());
    assert!(sched.find(&key("a")).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_panicking_work_fails_only_its_own_task() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let exploding: WorkRef<u64> = WorkFn::arc("exploding", || async {
        if true {
            panic!("unexpected payload");
        }
        Ok::<u64, ProviderError>(0)
    });

    let bad = sched
        .start_or_replace(key("bad"), parse("2s").unwrap(), exploding, forward("bad", tx.clone()))
        .await;
    let good = sched
        .start_or_replace(key("good"), parse("2s").unwrap(), constant(7), forward("good", tx))
        .await;

    assert_eq!(
        bad.wait().await,
        ExitReason::Errored(TaskError::Panicked {
            info: "unexpected payload".into()
        })
    );
    time::sleep(Duration::from_secs(5)).await;

    let tags: Vec<_> = drain(&mut rx).into_iter().map(|(tag, _)| tag).collect();
    // good ticked at 2s, 4s and 6s.
    assert_eq!(tags, vec!["good"; 3]);
    assert_eq!(good.state(), TaskState::Running);
    assert_eq!(sched.registry().keys().await, vec![key("good")]);
}

#[tokio::test(start_paused = true)]
async fn test_disjoint_keys_run_and_stop_independently() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let every = |text: &str| parse(text).unwrap();
    let (a, b, c) = tokio::join!(
        sched.start_or_replace(key("a"), every("2s"), constant(1), forward("a", tx.clone())),
        sched.start_or_replace(key("b"), every("3s"), constant(2), forward("b", tx.clone())),
        sched.start_or_replace(key("c"), every("5s"), constant(3), forward("c", tx)),
    );
    assert_eq!(sched.registry().len().await, 3);

    time::sleep(Duration::from_millis(6_500)).await;
    assert!(sched.stop(b.key()).await);
    time::sleep(Duration::from_secs(6)).await;

    let seen = drain(&mut rx);
    let count = |tag: &str| seen.iter().filter(|(t, _)| *t == tag).count();
    assert_eq!(count("a"), 6);
    assert_eq!(count("b"), 2);
    assert_eq!(count("c"), 2);
    assert_eq!(b.wait().await, ExitReason::Cancelled);
    assert_eq!(a.state(), TaskState::Running);
    assert_eq!(c.state(), TaskState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_callback_errors_do_not_stop_polling() {
    let sched = scheduler(SchedulerConfig::default());
    let mut events = sched.bus().subscribe();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let on_tick: TickRef<u64> = TickFn::arc(move |_key, _work, _outcome: TickOutcome<u64>| {
        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            match n {
                1 => anyhow::bail!("message was deleted"),
                2 => panic!("embed renderer crashed"),
                _ => Ok(()),
            }
        }
    });

    let handle = sched
        .start_or_replace(key("a"), parse("1s").unwrap(), constant(1), on_tick)
        .await;
    time::sleep(Duration::from_millis(3_500)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(handle.state(), TaskState::Running);

    let mut failures = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::CallbackFailed {
            failures.push(ev.reason.unwrap().to_string());
        }
    }
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0], "message was deleted");
    assert!(failures[1].contains("embed renderer crashed"));
}

#[tokio::test(start_paused = true)]
async fn test_hung_provider_times_out_and_keeps_polling() {
    let mut cfg = SchedulerConfig::default();
    cfg.tick_timeout = Duration::from_secs(2);
    let sched = scheduler(cfg);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let hung: WorkRef<u64> = WorkFn::arc("hung", || async {
        time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, ProviderError>(1)
    });

    sched
        .start_or_replace(key("hung"), parse("5s").unwrap(), hung, forward("hung", tx))
        .await;
    // Ticks at 5s and 12s each time out after 2s.
    time::sleep(Duration::from_secs(15)).await;

    let outcomes = drain(&mut rx);
    let expected = Err(ProviderError::Timeout {
        timeout: Duration::from_secs(2),
    });
    assert_eq!(outcomes, vec![("hung", expected.clone()), ("hung", expected)]);
}

#[tokio::test(start_paused = true)]
async fn test_per_task_timeout_override() {
    let sched = scheduler(SchedulerConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let slow: WorkRef<u64> = WorkFn::arc("slow", || async {
        time::sleep(Duration::from_secs(90)).await;
        Ok::<_, ProviderError>(5)
    });

    // The 60s default would time this out; the override disables the timeout.
    let spec = TaskSpec::new(key("slow"), parse("10s").unwrap(), slow, forward("slow", tx))
        .with_timeout(Some(Duration::ZERO));
    sched.start(spec).await;
    time::sleep(Duration::from_secs(101)).await;

    assert_eq!(drain(&mut rx), vec![("slow", Ok(5))]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_within_grace() {
    let sched = scheduler(SchedulerConfig::default());
    let mut events = sched.bus().subscribe();
    let (tx, _rx) = mpsc::unbounded_channel();

    let a = sched
        .start_or_replace(key("a"), parse("5s").unwrap(), constant(1), forward("a", tx.clone()))
        .await;
    let b = sched
        .start_or_replace(key("b"), parse("1m").unwrap(), constant(2), forward("b", tx))
        .await;
    time::sleep(Duration::from_secs(12)).await;

    sched.shutdown().await.unwrap();

    assert_eq!(a.state(), TaskState::Cancelled);
    assert_eq!(b.state(), TaskState::Cancelled);
    assert!(sched.registry().is_empty().await);

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::StopAllRequested));
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_reports_stuck_tasks() {
    let mut cfg = SchedulerConfig::default();
    cfg.tick_timeout = Duration::ZERO;
    cfg.grace = Duration::from_secs(1);
    let sched = scheduler(cfg);
    let (tx, _rx) = mpsc::unbounded_channel();
    let hung: WorkRef<u64> = WorkFn::arc("hung", || async {
        time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, ProviderError>(1)
    });

    sched
        .start_or_replace(key("hung"), parse("1s").unwrap(), hung, forward("hung", tx.clone()))
        .await;
    sched
        .start_or_replace(key("idle"), parse("1h").unwrap(), constant(1), forward("idle", tx))
        .await;
    time::sleep(Duration::from_secs(2)).await;

    match sched.shutdown().await {
        Err(RuntimeError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_secs(1));
            assert_eq!(stuck, vec![key("hung")]);
        }
        other => panic!("expected grace exceeded, got {other:?}"),
    }
}
