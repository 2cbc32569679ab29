// tests/debounce_tests.rs
mod common;

use common::*;
use futures::stream::{self, StreamExt};
use serial_test::serial;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use weir::{op, Arg, CompilerConfig, Event, EventBatch, EventStream, Flow, WeirError};

fn burst() -> EventStream<EventBatch> {
  timed_source(
    vec![
      (0, EventBatch::single(Event::add("a.js", "src", "A"))),
      (50, EventBatch::single(Event::change("b.js", "src", "B"))),
      (120, EventBatch::single(Event::add("c.js", "src", "C"))),
    ],
    false,
  )
}

async fn debounced(upstream: EventStream<EventBatch>, args: Vec<Arg<EventBatch>>) -> EventStream<EventBatch> {
  let mut compiler = test_compiler(CompilerConfig::default());
  compiler
    .compile(&op::call("debounce", args), Flow::Stream(upstream), None)
    .await
    .unwrap()
    .into_stream()
    .unwrap()
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_burst_is_emitted_once_after_quiet_window() {
  setup_tracing();
  let stream = debounced(burst(), vec![]).await;
  let start = Instant::now();
  let mut output = stream.subscribe();

  // Last arrival at 120ms, default window 200ms: nothing before 320ms.
  let early = timeout(Duration::from_millis(319), output.next()).await;
  assert!(early.is_err(), "debounce emitted before the window closed");

  let batch = output.next().await.unwrap().unwrap();
  let elapsed = start.elapsed();
  assert!(elapsed >= Duration::from_millis(320) && elapsed < Duration::from_millis(330), "flushed at {:?}", elapsed);
  assert_eq!(paths(&batch), vec!["a.js", "b.js", "c.js"]);

  // Stays quiet afterwards.
  assert!(timeout(Duration::from_secs(5), output.next()).await.is_err());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_explicit_window_overrides_config() {
  setup_tracing();
  let stream = debounced(burst(), vec![Arg::Int(30)]).await;
  let mut output = stream.subscribe();

  // 0 and 50 are further apart than 30ms, 120 stands alone too.
  let mut seen = Vec::new();
  for _ in 0..3 {
    let batch = output.next().await.unwrap().unwrap();
    seen.push(paths(&batch).into_iter().map(str::to_string).collect::<Vec<_>>());
  }
  assert_eq!(seen, vec![vec!["a.js"], vec!["b.js"], vec!["c.js"]]);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_configured_window_is_used_by_default() {
  setup_tracing();
  let mut compiler = test_compiler(CompilerConfig::default().with_debounce_window_ms(60));
  let stream = compiler
    .compile(&op::call("debounce", vec![]), Flow::Stream(burst()), None)
    .await
    .unwrap()
    .into_stream()
    .unwrap();
  let mut output = stream.subscribe();

  let first = output.next().await.unwrap().unwrap();
  assert_eq!(paths(&first), vec!["a.js", "b.js"]);
  let second = output.next().await.unwrap().unwrap();
  assert_eq!(paths(&second), vec!["c.js"]);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_pending_values_flush_when_upstream_ends() {
  setup_tracing();
  let upstream = timed_source(
    vec![
      (0, EventBatch::single(Event::add("a.js", "src", ""))),
      (10, EventBatch::single(Event::add("b.js", "src", ""))),
    ],
    true,
  );
  let stream = debounced(upstream, vec![Arg::Int(1_000)]).await;
  let start = Instant::now();

  let batches: Vec<_> = stream.subscribe().collect().await;
  assert_eq!(batches.len(), 1);
  assert_eq!(paths(batches[0].as_ref().unwrap()), vec!["a.js", "b.js"]);
  assert!(start.elapsed() < Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_errors_pass_through_without_dropping_buffer() {
  setup_tracing();
  let upstream = EventStream::from_fn(|| {
    stream::iter(vec![
      Ok(EventBatch::single(Event::add("a.js", "src", ""))),
      Err(WeirError::runtime(anyhow::anyhow!("watcher hiccup"))),
      Ok(EventBatch::single(Event::add("b.js", "src", ""))),
    ])
    .chain(stream::pending())
  });
  let stream = debounced(upstream, vec![]).await;
  let mut output = stream.subscribe();

  let first = output.next().await.unwrap();
  assert!(matches!(first, Err(WeirError::RuntimeStream { .. })));
  let second = output.next().await.unwrap().unwrap();
  assert_eq!(paths(&second), vec!["a.js", "b.js"]);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_debounce_coalesces_plain_vectors() {
  setup_tracing();
  let upstream = timed_source(vec![(0, vec![1_i64]), (20, vec![2, 3]), (500, vec![4])], true);
  let values: Vec<Vec<i64>> = upstream
    .debounce(Duration::from_millis(100))
    .subscribe()
    .map(|item| item.unwrap())
    .collect()
    .await;
  assert_eq!(values, vec![vec![1, 2, 3], vec![4]]);
}

#[tokio::test]
#[serial]
async fn test_negative_window_is_malformed() {
  setup_tracing();
  let mut compiler = test_compiler(CompilerConfig::default());
  let result = compiler
    .compile(
      &op::call("debounce", vec![Arg::Int(-5)]),
      Flow::Stream(EventStream::empty()),
      None,
    )
    .await;
  assert!(matches!(result, Err(WeirError::MalformedTree { .. })));
}
