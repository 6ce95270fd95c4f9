//! # Demo: polling fake subscriber counts
//!
//! Loads subscriptions from an inline TOML document, polls three fake
//! providers (one flaky, one authenticated), reconfigures one of them, and
//! shuts down on Ctrl-C or after 20 seconds.
//!
//! ```text
//! RUST_LOG=debug cargo run --example subscriber_counts
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use pollvisor::auth::{AccessToken, Authorized, AuthorizedWork, TokenCache, TokenSource};
use pollvisor::{
    ConfigFile, LogWriter, ProviderError, Scheduler, Subscribe, SubscriptionEntry, TickFn,
    TickOutcome, WorkFn, WorkRef,
};

const CONFIG: &str = r#"
[scheduler]
grace = "5s"
tick_timeout = "2s"

[[subscription]]
tenant = "guild-1"
subscriber = "alice"
provider = "steady"
interval = "2s"
params = { start = "1000" }

[[subscription]]
tenant = "guild-1"
subscriber = "alice"
provider = "flaky"
interval = "3s"

[[subscription]]
tenant = "guild-1"
subscriber = "bob"
provider = "streaming"
interval = "4s"

[[subscription]]
tenant = "guild-2"
subscriber = "carol"
provider = "steady"
interval = "every now and then"
"#;

struct DemoIssuer;

#[async_trait]
impl TokenSource for DemoIssuer {
    async fn fetch(&self) -> Result<AccessToken, ProviderError> {
        tracing::info!("issuing demo app token");
        Ok(AccessToken::new("demo-token", "bearer", Duration::from_secs(10)))
    }
}

struct Followers;

#[async_trait]
impl AuthorizedWork<u64> for Followers {
    fn name(&self) -> &str {
        "streaming"
    }

    async fn produce_with(&self, token: &AccessToken) -> Result<u64, ProviderError> {
        tracing::debug!(authorization = %token.authorization(), "calling streaming api");
        Ok(5_150)
    }
}

fn build_work(entry: &SubscriptionEntry) -> Result<WorkRef<u64>, ProviderError> {
    match entry.provider.as_str() {
        "steady" => {
            let start = entry
                .param("start")
                .unwrap_or("0")
                .parse::<u64>()
                .map_err(|e| ProviderError::Malformed(format!("start: {e}")))?;
            let counter = Arc::new(AtomicU64::new(start));
            Ok(WorkFn::arc("steady", move || {
                let counter = Arc::clone(&counter);
                async move { Ok::<_, ProviderError>(counter.fetch_add(3, Ordering::Relaxed)) }
            }))
        }
        "flaky" => {
            let calls = Arc::new(AtomicU64::new(0));
            Ok(WorkFn::arc("flaky", move || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::Relaxed);
                    if n % 2 == 1 {
                        Err(ProviderError::Request("503 Service Unavailable".into()))
                    } else {
                        Ok(420 + n)
                    }
                }
            }))
        }
        "streaming" => Ok(Authorized::arc(TokenCache::new(DemoIssuer), Followers)),
        other => Err(ProviderError::Fatal(format!("unknown provider {other}"))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let file = ConfigFile::from_toml_str(CONFIG)?;
    if let Err(e) = file.validate() {
        tracing::warn!(error = %e, "configuration has invalid subscriptions");
    }

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sched: Scheduler<u64> = Scheduler::builder(file.scheduler.clone())
        .with_subscribers(subs)
        .build();

    let on_tick = TickFn::arc(|key, _work, outcome: TickOutcome<u64>| async move {
        match outcome {
            Ok(count) => println!("[{key}] {count} subscribers"),
            Err(e) => println!("[{key}] unchanged ({e})"),
        }
        Ok(())
    });

    let report = sched.apply(&file.subscriptions, &build_work, on_tick.clone()).await;
    for (key, err) in &report.rejected {
        println!("[{key}] rejected: {err}");
    }

    tokio::select! {
        res = sched.run_until_signal() => return Ok(res?),
        _ = tokio::time::sleep(Duration::from_secs(8)) => {}
    }

    // Alice asks for a slower cadence on "steady".
    let slower =
        [SubscriptionEntry::new("guild-1", "alice", "steady", "5s").with_param("start", "2000")];
    sched.apply(&slower, &build_work, on_tick).await;

    tokio::select! {
        res = sched.run_until_signal() => res?,
        _ = tokio::time::sleep(Duration::from_secs(12)) => sched.shutdown().await?,
    }
    Ok(())
}
