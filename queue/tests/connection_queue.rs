use torwell_queue::{
  ActionKey, ActionStatus, ConnectionQueue, QueueError, QueueExecution, QueueFailure, QueueState, SkipReason,
};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

type TaskResult = Result<(), String>;

#[tokio::test]
async fn test_runs_actions_sequentially() {
  let queue = ConnectionQueue::with_tokio();
  let order = Arc::new(Mutex::new(Vec::new()));

  let log = order.clone();
  let first = queue.run(ActionKey::Connect, move || async move {
    log.lock().push("connect:start");
    tokio::task::yield_now().await;
    log.lock().push("connect:end");
    Ok::<_, String>("connected")
  });
  let log = order.clone();
  let second = queue.run(ActionKey::Disconnect, move || async move {
    log.lock().push("disconnect");
    Ok::<_, String>("disconnected")
  });

  let (first, second) = tokio::join!(first, second);
  assert_eq!(first, Ok(QueueExecution::Completed("connected")));
  assert_eq!(second, Ok(QueueExecution::Completed("disconnected")));
  assert_eq!(*order.lock(), vec!["connect:start", "connect:end", "disconnect"]);
}

#[tokio::test]
async fn test_skips_duplicate_keys_while_active_or_queued() {
  let queue = ConnectionQueue::with_tokio();
  let (release, gate) = oneshot::channel::<()>();

  let first = queue.run(ActionKey::Connect, move || async move {
    let _ = gate.await;
    Ok::<_, String>(())
  });
  let queued = queue.run(ActionKey::Disconnect, || async { TaskResult::Ok(()) });

  let ran = Arc::new(AtomicUsize::new(0));
  let counter = ran.clone();
  let duplicate = queue
    .run(ActionKey::Connect, move || async move {
      counter.fetch_add(1, Ordering::SeqCst);
      TaskResult::Err("should not run".into())
    })
    .await;
  assert_eq!(
    duplicate,
    Ok(QueueExecution::Skipped {
      reason: SkipReason::Duplicate
    })
  );
  let queued_duplicate = queue.run(ActionKey::Disconnect, || async { TaskResult::Ok(()) }).await;
  assert!(queued_duplicate.unwrap().is_skipped());

  assert_eq!(queue.status_for(ActionKey::Connect), ActionStatus::Active);
  assert_eq!(queue.status_for(ActionKey::Disconnect), ActionStatus::Queued);
  assert_eq!(queue.status_for(ActionKey::NewIdentity), ActionStatus::Idle);
  let state = queue.state();
  assert_eq!(state.pending, Some(ActionKey::Connect));
  assert_eq!(state.queue_depth, 1);
  assert_eq!(state.queued_keys, vec![ActionKey::Disconnect]);

  release.send(()).unwrap();
  assert!(first.await.unwrap().is_completed());
  assert!(queued.await.unwrap().is_completed());
  assert_eq!(ran.load(Ordering::SeqCst), 0);

  let after = queue.run(ActionKey::Connect, || async { TaskResult::Ok(()) }).await;
  assert!(after.unwrap().is_completed());
  assert_eq!(queue.status_for(ActionKey::Connect), ActionStatus::Idle);
}

#[tokio::test]
async fn test_records_errors_in_state() {
  let queue = ConnectionQueue::with_tokio();

  let result = queue
    .run(ActionKey::Connect, || async { TaskResult::Err("boom".into()) })
    .await;
  let error = result.unwrap_err();
  assert_eq!(error, QueueError::Task("boom".to_string()));
  assert_eq!(error.to_string(), "boom");

  let state = queue.state();
  assert_eq!(state.pending, None);
  assert_eq!(
    state.last_error,
    Some(QueueFailure {
      key: ActionKey::Connect,
      message: "boom".to_string()
    })
  );
  assert_eq!(state.last_success, None);

  // Success of another key leaves the error alone.
  queue.run(ActionKey::BuildCircuit, || async { TaskResult::Ok(()) }).await.unwrap();
  let state = queue.state();
  assert!(state.last_error.is_some());
  assert_eq!(state.last_success.map(|s| s.key), Some(ActionKey::BuildCircuit));

  // Success of the same key clears it.
  queue.run(ActionKey::Connect, || async { TaskResult::Ok(()) }).await.unwrap();
  let state = queue.state();
  assert_eq!(state.last_error, None);
  assert_eq!(state.last_success.map(|s| s.key), Some(ActionKey::Connect));
}

#[tokio::test]
async fn test_clear_error_by_key() {
  let queue = ConnectionQueue::with_tokio();
  let _ = queue
    .run(ActionKey::NewIdentity, || async { TaskResult::Err("rate limited".into()) })
    .await;

  queue.clear_error(Some(ActionKey::Connect));
  assert!(queue.state().last_error.is_some(), "other key leaves the error");

  queue.clear_error(Some(ActionKey::NewIdentity));
  assert_eq!(queue.state().last_error, None);

  let _ = queue
    .run(ActionKey::NewIdentity, || async { TaskResult::Err("again".into()) })
    .await;
  queue.clear_error(None);
  assert_eq!(queue.state().last_error, None);
}

#[tokio::test]
async fn test_reset_cancels_backlog() {
  let queue = ConnectionQueue::with_tokio();
  let (release, gate) = oneshot::channel::<()>();

  let in_flight = queue.run(ActionKey::Connect, move || async move {
    let _ = gate.await;
    TaskResult::Ok(())
  });
  let ran = Arc::new(AtomicUsize::new(0));
  let counter = ran.clone();
  let dropped = queue.run(ActionKey::Disconnect, move || async move {
    counter.fetch_add(1, Ordering::SeqCst);
    TaskResult::Ok(())
  });

  queue.reset();
  assert_eq!(queue.state(), QueueState::default());
  assert_eq!(dropped.await, Err(QueueError::Cancelled));

  // The queue accepts new work right away.
  let fresh = queue.run(ActionKey::BuildCircuit, || async { TaskResult::Ok(()) }).await;
  assert!(fresh.unwrap().is_completed());

  // The interrupted action still reports to its caller but no longer owns
  // the state.
  release.send(()).unwrap();
  assert!(in_flight.await.unwrap().is_completed());
  assert_eq!(ran.load(Ordering::SeqCst), 0);
  let state = queue.state();
  assert_eq!(state.pending, None);
  assert_eq!(state.last_success.map(|s| s.key), Some(ActionKey::BuildCircuit));
}

#[tokio::test]
async fn test_subscribers_see_every_transition() {
  let queue = ConnectionQueue::with_tokio();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();

  let subscription = queue.subscribe(move |state| {
    sink.lock().push((state.pending, state.queue_depth, state.last_success.is_some()));
  });
  queue.run(ActionKey::Connect, || async { TaskResult::Ok(()) }).await.unwrap();

  assert_eq!(
    *seen.lock(),
    vec![
      (None, 0, false),
      (None, 1, false),
      (Some(ActionKey::Connect), 0, false),
      (None, 0, true),
    ]
  );

  drop(subscription);
  queue.run(ActionKey::Connect, || async { TaskResult::Ok(()) }).await.unwrap();
  assert_eq!(seen.lock().len(), 4);
}

#[tokio::test]
async fn test_panicking_task_does_not_wedge_the_queue() {
  let queue = ConnectionQueue::with_tokio();

  let result = queue
    .run(ActionKey::Connect, || async {
      if true {
        panic!("tor daemon vanished");
      }
      TaskResult::Ok(())
    })
    .await;
  assert_eq!(result, Err(QueueError::Cancelled));
  assert_eq!(
    queue.state().last_error.map(|e| e.message),
    Some("action panicked".to_string())
  );

  let next = queue.run(ActionKey::Connect, || async { TaskResult::Ok(()) }).await;
  assert!(next.unwrap().is_completed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_never_runs_two_actions_at_once() {
  let queue = ConnectionQueue::with_tokio();
  let running = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));

  for _round in 0..5 {
    let mut submissions = Vec::new();
    for key in ActionKey::ALL {
      let queue = queue.clone();
      let running = running.clone();
      let peak = peak.clone();
      submissions.push(tokio::spawn(async move {
        queue
          .run(key, move || async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            TaskResult::Ok(())
          })
          .await
      }));
    }
    for submission in submissions {
      assert!(submission.await.unwrap().unwrap().is_completed());
    }
  }

  assert_eq!(peak.load(Ordering::SeqCst), 1);
  assert_eq!(queue.state().pending, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_broadcast_matches_state_once_quiet() {
  let queue = ConnectionQueue::with_tokio();
  let last_seen: Arc<Mutex<Option<QueueState>>> = Arc::new(Mutex::new(None));

  let sink = last_seen.clone();
  let _sub = queue.subscribe(move |state| {
    let connect_done = state.pending.is_none()
      && state.last_success.as_ref().is_some_and(|success| success.key == ActionKey::Connect);
    if connect_done {
      // Hold the delivering thread while another action goes through.
      std::thread::sleep(Duration::from_millis(200));
    }
    *sink.lock() = Some(state.clone());
  });

  let watcher = queue.clone();
  let follow_up = tokio::spawn(async move {
    while watcher.state().last_success.is_none() {
      tokio::task::yield_now().await;
    }
    watcher
      .run(ActionKey::Disconnect, || async { TaskResult::Ok(()) })
      .await
  });

  let first = queue.run(ActionKey::Connect, || async { TaskResult::Ok(()) }).await;
  assert_eq!(first, Ok(QueueExecution::Completed(())));
  assert_eq!(follow_up.await.unwrap(), Ok(QueueExecution::Completed(())));

  let deadline = std::time::Instant::now() + Duration::from_secs(2);
  while last_seen.lock().as_ref() != Some(&queue.state()) && std::time::Instant::now() < deadline {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  let state = queue.state();
  assert_eq!(state.pending, None);
  assert_eq!(state.last_success.as_ref().map(|success| success.key), Some(ActionKey::Disconnect));
  assert_eq!(last_seen.lock().clone(), Some(state));
}
