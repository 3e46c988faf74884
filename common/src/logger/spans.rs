use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{Span, field};

use super::TraceId;

/// Root span for one unit of work (a tick, an inference request).
///
/// `mode` is left empty for the owner to record once known.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id,
        mode = field::Empty
    )
}

/// Child span; inherits `trace_id` from the enclosing root span.
pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!("child", name = %name)
}

/// Awaits `fut` and emits a warning when it took longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn slow_operation_is_reported() {
        let out = warn_if_slow("sleepy", Duration::from_millis(1), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            7
        })
        .await;

        assert_eq!(out, 7);
        assert!(logs_contain("slow operation detected"));
    }

    #[traced_test]
    #[test]
    fn child_span_nests_under_root_and_mode_is_recorded() {
        let root = root_span("tick", &TraceId::new());
        let _enter = root.enter();
        root.record("mode", "simulation");

        let child = child_span("feed_fetch");
        child.in_scope(|| tracing::info!("inside child"));

        assert!(logs_contain("inside child"));
        assert!(logs_contain("feed_fetch"));
        assert!(logs_contain("simulation"));
    }

    #[traced_test]
    #[tokio::test]
    async fn fast_operation_is_silent() {
        let out = warn_if_slow("quick", Duration::from_secs(5), async { 1 }).await;

        assert_eq!(out, 1);
        assert!(!logs_contain("slow operation detected"));
    }
}
