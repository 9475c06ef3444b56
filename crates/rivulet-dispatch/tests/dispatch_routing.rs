//! Routing, relay, retry and failure reporting across in-process nodes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rivulet_config::{DispatchConfig, RetryConfig};
use rivulet_datum::{EndpointDatum, NodeId, TypedDatum};
use rivulet_dispatch::{
  ComponentExecutionController, DispatchError, EndpointDatumDispatcher,
  InMemoryControllerRegistry, NodeDirectory, RemoteEndpointDatumDispatcher,
  RemoteExecutionControllerService, RemoteOperationError,
};
use rivulet_wire::EndpointDatumSerializer;
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_secs(5);

// -- Fakes --

struct FakeDirectory {
  local: NodeId,
  reachable: RwLock<HashSet<NodeId>>,
  dispatchers: RwLock<HashMap<NodeId, Arc<dyn RemoteEndpointDatumDispatcher>>>,
  services: RwLock<HashMap<NodeId, Arc<dyn RemoteExecutionControllerService>>>,
}

impl FakeDirectory {
  fn new(local: &str) -> Arc<Self> {
    Arc::new(Self {
      local: NodeId::from(local),
      reachable: RwLock::new(HashSet::new()),
      dispatchers: RwLock::new(HashMap::new()),
      services: RwLock::new(HashMap::new()),
    })
  }

  fn set_reachable(&self, node: &str, reachable: bool) {
    let mut nodes = self.reachable.write().unwrap();
    if reachable {
      nodes.insert(NodeId::from(node));
    } else {
      nodes.remove(&NodeId::from(node));
    }
  }

  fn connect(&self, node: &str, remote: Arc<dyn RemoteEndpointDatumDispatcher>) {
    self.set_reachable(node, true);
    self
      .dispatchers
      .write()
      .unwrap()
      .insert(NodeId::from(node), remote);
  }

  fn add_service(&self, node: &str, service: Arc<dyn RemoteExecutionControllerService>) {
    self
      .services
      .write()
      .unwrap()
      .insert(NodeId::from(node), service);
  }
}

impl NodeDirectory for FakeDirectory {
  fn is_local(&self, node: &NodeId) -> bool {
    *node == self.local
  }

  fn reachable_nodes(&self) -> HashSet<NodeId> {
    self.reachable.read().unwrap().clone()
  }

  fn remote_dispatcher(&self, node: &NodeId) -> Option<Arc<dyn RemoteEndpointDatumDispatcher>> {
    self.dispatchers.read().unwrap().get(node).cloned()
  }

  fn remote_execution_controller_service(
    &self,
    node: &NodeId,
  ) -> Option<Arc<dyn RemoteExecutionControllerService>> {
    self.services.read().unwrap().get(node).cloned()
  }
}

struct RecordingController {
  received: mpsc::UnboundedSender<EndpointDatum>,
  failed: mpsc::UnboundedSender<(EndpointDatum, DispatchError)>,
}

struct ControllerProbe {
  received: mpsc::UnboundedReceiver<EndpointDatum>,
  failed: mpsc::UnboundedReceiver<(EndpointDatum, DispatchError)>,
}

impl ControllerProbe {
  async fn next_received(&mut self) -> EndpointDatum {
    tokio::time::timeout(TIMEOUT, self.received.recv())
      .await
      .expect("timed out waiting for datum")
      .expect("controller dropped")
  }

  async fn next_failure(&mut self) -> (EndpointDatum, DispatchError) {
    tokio::time::timeout(TIMEOUT, self.failed.recv())
      .await
      .expect("timed out waiting for failure")
      .expect("controller dropped")
  }
}

fn controller() -> (Arc<RecordingController>, ControllerProbe) {
  let (received_tx, received) = mpsc::unbounded_channel();
  let (failed_tx, failed) = mpsc::unbounded_channel();
  (
    Arc::new(RecordingController {
      received: received_tx,
      failed: failed_tx,
    }),
    ControllerProbe { received, failed },
  )
}

#[async_trait]
impl ComponentExecutionController for RecordingController {
  async fn on_endpoint_datum_received(&self, datum: EndpointDatum) {
    let _ = self.received.send(datum);
  }

  async fn on_sending_endpoint_datum_failed(&self, datum: EndpointDatum, error: DispatchError) {
    let _ = self.failed.send((datum, error));
  }
}

/// Remote end that fails a fixed number of calls, then records lines.
struct FlakyRemote {
  failures_left: AtomicU32,
  calls: AtomicU32,
  lines: mpsc::UnboundedSender<String>,
}

impl FlakyRemote {
  fn new(failures: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
    let (lines, receiver) = mpsc::unbounded_channel();
    (
      Arc::new(Self {
        failures_left: AtomicU32::new(failures),
        calls: AtomicU32::new(0),
        lines,
      }),
      receiver,
    )
  }
}

#[async_trait]
impl RemoteEndpointDatumDispatcher for FlakyRemote {
  async fn dispatch_endpoint_datum(&self, line: String) -> Result<(), RemoteOperationError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let failing = self
      .failures_left
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
      .is_ok();
    if failing {
      return Err(RemoteOperationError::new("connection refused"));
    }
    let _ = self.lines.send(line);
    Ok(())
  }
}

/// Remote end that takes `delay` per call before passing the line on.
struct SlowRemote {
  delay: Duration,
  inner: Arc<dyn RemoteEndpointDatumDispatcher>,
}

#[async_trait]
impl RemoteEndpointDatumDispatcher for SlowRemote {
  async fn dispatch_endpoint_datum(&self, line: String) -> Result<(), RemoteOperationError> {
    tokio::time::sleep(self.delay).await;
    self.inner.dispatch_endpoint_datum(line).await
  }
}

/// Relay that accepts at once and passes the line on after `delay`.
struct LaggingRelay {
  delay: Duration,
  inner: Arc<dyn RemoteEndpointDatumDispatcher>,
}

#[async_trait]
impl RemoteEndpointDatumDispatcher for LaggingRelay {
  async fn dispatch_endpoint_datum(&self, line: String) -> Result<(), RemoteOperationError> {
    let (delay, inner) = (self.delay, self.inner.clone());
    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let _ = inner.dispatch_endpoint_datum(line).await;
    });
    Ok(())
  }
}

#[derive(Default)]
struct RecordingService {
  calls: Mutex<Vec<(String, EndpointDatum, DispatchError)>>,
}

#[async_trait]
impl RemoteExecutionControllerService for RecordingService {
  async fn on_sending_endpoint_datum_failed(
    &self,
    execution_id: &str,
    datum: EndpointDatum,
    error: DispatchError,
  ) -> Result<(), RemoteOperationError> {
    self
      .calls
      .lock()
      .unwrap()
      .push((execution_id.to_string(), datum, error));
    Ok(())
  }
}

// -- Helpers --

fn fast_config(reachability_attempts: u32) -> DispatchConfig {
  DispatchConfig {
    retry: RetryConfig::default().with_max_attempts(3).with_delays(1, 1),
    reachability_retry: RetryConfig::default()
      .with_max_attempts(reachability_attempts)
      .with_delays(10, 10),
  }
}

fn dispatcher(
  directory: Arc<FakeDirectory>,
  registry: Arc<InMemoryControllerRegistry>,
  config: &DispatchConfig,
) -> EndpointDatumDispatcher {
  EndpointDatumDispatcher::new(directory, registry, config, EndpointDatumSerializer::default())
}

fn datum(value: i64, from: &str, to: &str, controller: &str) -> EndpointDatum {
  EndpointDatum {
    input_name: "x".to_string(),
    value: TypedDatum::Integer(value),
    inputs_component_execution_id: "receiver".to_string(),
    inputs_component_instance_name: "Receiver".to_string(),
    inputs_node_id: NodeId::from(to),
    outputs_component_execution_id: "sender".to_string(),
    outputs_node_id: NodeId::from(from),
    workflow_execution_id: "wf-1".to_string(),
    workflow_controller_node_id: NodeId::from(controller),
    data_management_id: Some(7),
  }
}

fn decode(line: &str) -> EndpointDatum {
  EndpointDatumSerializer::default()
    .deserialize_endpoint_datum(line)
    .expect("decodable line")
}

async fn next_line(lines: &mut mpsc::UnboundedReceiver<String>) -> String {
  tokio::time::timeout(TIMEOUT, lines.recv())
    .await
    .expect("timed out waiting for line")
    .expect("remote dropped")
}

/// A node whose only controller is the receiving component.
fn receiving_node(node: &str) -> (Arc<EndpointDatumDispatcher>, ControllerProbe) {
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (receiver, probe) = controller();
  registry.register("receiver", receiver);
  let dispatcher = Arc::new(dispatcher(FakeDirectory::new(node), registry, &fast_config(1)));
  (dispatcher, probe)
}

// -- Tests --

#[tokio::test]
async fn test_local_receiver_gets_datum_directly() {
  let directory = FakeDirectory::new("a");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (receiver, mut probe) = controller();
  registry.register("receiver", receiver);
  let dispatcher = dispatcher(directory, registry, &fast_config(1));

  let sent = datum(1, "a", "a", "a");
  dispatcher.dispatch(sent.clone()).await;

  assert_eq!(probe.next_received().await, sent);
}

#[tokio::test]
async fn test_missing_local_receiver_is_reported_to_sender() {
  let directory = FakeDirectory::new("a");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (sender, mut probe) = controller();
  registry.register("sender", sender);
  let dispatcher = dispatcher(directory, registry, &fast_config(1));

  dispatcher.dispatch(datum(1, "a", "a", "a")).await;

  let (failed, error) = probe.next_failure().await;
  assert_eq!(failed.value, TypedDatum::Integer(1));
  assert!(matches!(
    error,
    DispatchError::NoLocalController { execution_id } if execution_id == "receiver"
  ));
}

#[tokio::test]
async fn test_reachable_receiver_gets_serialized_line() {
  let directory = FakeDirectory::new("a");
  let (remote, mut lines) = FlakyRemote::new(0);
  directory.connect("b", remote);
  let dispatcher = dispatcher(
    directory,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  let sent = datum(5, "a", "b", "c");
  dispatcher.dispatch(sent.clone()).await;

  assert_eq!(decode(&next_line(&mut lines).await), sent);
}

#[tokio::test]
async fn test_unreachable_receiver_is_relayed_through_controller() {
  let directory = FakeDirectory::new("a");
  let (controller_node, mut relayed) = FlakyRemote::new(0);
  let (receiver_node, _) = FlakyRemote::new(0);
  directory.connect("c", controller_node);
  directory.connect("b", receiver_node.clone());
  directory.set_reachable("b", false);
  let dispatcher = dispatcher(
    directory,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  let sent = datum(5, "a", "b", "c");
  dispatcher.dispatch(sent.clone()).await;

  assert_eq!(decode(&next_line(&mut relayed).await), sent);
  assert_eq!(receiver_node.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_datums_to_one_node_arrive_in_order() {
  let registry_b = Arc::new(InMemoryControllerRegistry::new());
  let (receiver, mut probe) = controller();
  registry_b.register("receiver", receiver);
  let node_b = Arc::new(dispatcher(
    FakeDirectory::new("b"),
    registry_b,
    &fast_config(1),
  ));

  let directory_a = FakeDirectory::new("a");
  directory_a.connect("b", node_b);
  let node_a = dispatcher(
    directory_a,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  for value in 0..50 {
    node_a.dispatch(datum(value, "a", "b", "a")).await;
  }

  for value in 0..50 {
    assert_eq!(probe.next_received().await.value, TypedDatum::Integer(value));
  }
}

#[tokio::test]
async fn test_relay_node_forwards_to_receiver() {
  // a -> c (controller) -> b, with b out of a's reach
  let registry_b = Arc::new(InMemoryControllerRegistry::new());
  let (receiver, mut probe) = controller();
  registry_b.register("receiver", receiver);
  let node_b = Arc::new(dispatcher(
    FakeDirectory::new("b"),
    registry_b,
    &fast_config(1),
  ));

  let directory_c = FakeDirectory::new("c");
  directory_c.connect("b", node_b);
  let node_c = Arc::new(dispatcher(
    directory_c,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  ));

  let directory_a = FakeDirectory::new("a");
  directory_a.connect("c", node_c);
  let node_a = dispatcher(
    directory_a,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  let sent = datum(9, "a", "b", "c");
  node_a.dispatch(sent.clone()).await;

  assert_eq!(probe.next_received().await, sent);
}

#[tokio::test]
async fn test_transient_remote_failures_are_retried() {
  let directory = FakeDirectory::new("a");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (sender, mut probe) = controller();
  registry.register("sender", sender);
  let (remote, mut lines) = FlakyRemote::new(2);
  directory.connect("b", remote.clone());
  let dispatcher = dispatcher(directory, registry, &fast_config(1));

  dispatcher.dispatch(datum(3, "a", "b", "a")).await;

  next_line(&mut lines).await;
  assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
  assert!(probe.failed.try_recv().is_err());
}

#[tokio::test]
async fn test_exhausted_retries_reported_to_local_sender() {
  let directory = FakeDirectory::new("a");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (sender, mut probe) = controller();
  registry.register("sender", sender);
  let (remote, _lines) = FlakyRemote::new(u32::MAX);
  directory.connect("b", remote.clone());
  let dispatcher = dispatcher(directory, registry, &fast_config(1));

  dispatcher.dispatch(datum(3, "a", "b", "a")).await;

  let (failed, error) = probe.next_failure().await;
  assert_eq!(failed.value, TypedDatum::Integer(3));
  assert!(matches!(error, DispatchError::Remote { ref node, .. } if node.as_str() == "b"));
  assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_reported_to_remote_sender() {
  // Relaying controller node c fails to reach b; the sender lives on a.
  let directory = FakeDirectory::new("c");
  let (remote, _lines) = FlakyRemote::new(u32::MAX);
  directory.connect("b", remote);
  let service = Arc::new(RecordingService::default());
  directory.add_service("a", service.clone());
  let dispatcher = dispatcher(
    directory,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  dispatcher.dispatch(datum(4, "a", "b", "c")).await;

  tokio::time::timeout(TIMEOUT, async {
    while service.calls.lock().unwrap().is_empty() {
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  })
  .await
  .expect("remote sender notified");

  let calls = service.calls.lock().unwrap();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].0, "sender");
  assert_eq!(calls[0].1.value, TypedDatum::Integer(4));
}

#[tokio::test]
async fn test_controller_waits_for_receiver_to_come_back() {
  let directory = FakeDirectory::new("c");
  let (remote, mut lines) = FlakyRemote::new(0);
  directory.connect("b", remote);
  directory.set_reachable("b", false);
  let dispatcher = dispatcher(
    directory.clone(),
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(50),
  );

  dispatcher.dispatch(datum(1, "c", "b", "c")).await;
  dispatcher.dispatch(datum(2, "c", "b", "c")).await;
  tokio::time::sleep(Duration::from_millis(40)).await;
  assert!(lines.try_recv().is_err());

  directory.set_reachable("b", true);
  assert_eq!(
    decode(&next_line(&mut lines).await).value,
    TypedDatum::Integer(1)
  );
  assert_eq!(
    decode(&next_line(&mut lines).await).value,
    TypedDatum::Integer(2)
  );
}

#[tokio::test]
async fn test_receiver_never_reachable_is_reported() {
  let directory = FakeDirectory::new("c");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (sender, mut probe) = controller();
  registry.register("sender", sender);
  let (remote, _lines) = FlakyRemote::new(0);
  directory.connect("b", remote.clone());
  directory.set_reachable("b", false);
  let dispatcher = dispatcher(directory, registry, &fast_config(3));

  dispatcher.dispatch(datum(1, "c", "b", "c")).await;

  let (_, error) = probe.next_failure().await;
  assert!(matches!(error, DispatchError::Unreachable { ref node } if node.as_str() == "b"));
  assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_undecodable_line_is_rejected() {
  let dispatcher = dispatcher(
    FakeDirectory::new("a"),
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  let result = dispatcher.dispatch_serialized("not:enough:fields").await;
  assert!(matches!(result, Err(DispatchError::Decode(_))));

  let remote: &dyn RemoteEndpointDatumDispatcher = &dispatcher;
  assert!(remote.dispatch_endpoint_datum("x".to_string()).await.is_err());
}

#[tokio::test]
async fn test_datums_after_shutdown_are_reported() {
  let directory = FakeDirectory::new("a");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (sender, mut probe) = controller();
  registry.register("sender", sender);
  let (remote, _lines) = FlakyRemote::new(0);
  directory.connect("b", remote);
  let dispatcher = dispatcher(directory, registry, &fast_config(1));

  dispatcher.shutdown();
  dispatcher.dispatch(datum(1, "a", "b", "a")).await;

  let (_, error) = probe.next_failure().await;
  assert!(matches!(error, DispatchError::SenderClosed { .. }));
}

#[tokio::test]
async fn test_mixed_destinations_keep_their_own_order() {
  let (node_b, mut probe_b) = receiving_node("b");
  let (node_d, mut probe_d) = receiving_node("d");

  let directory = FakeDirectory::new("a");
  directory.connect(
    "b",
    Arc::new(SlowRemote {
      delay: Duration::from_millis(2),
      inner: node_b,
    }),
  );
  directory.connect("d", node_d);
  let node_a = dispatcher(
    directory,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  for value in 0..40 {
    let to = if value % 2 == 0 { "b" } else { "d" };
    node_a.dispatch(datum(value, "a", to, "a")).await;
  }

  for value in (0..40).step_by(2) {
    assert_eq!(probe_b.next_received().await.value, TypedDatum::Integer(value));
    assert_eq!(
      probe_d.next_received().await.value,
      TypedDatum::Integer(value + 1)
    );
  }
}

#[tokio::test]
async fn test_relayed_datums_are_not_overtaken_once_receiver_is_back() {
  let (node_b, mut probe) = receiving_node("b");

  let directory_c = FakeDirectory::new("c");
  directory_c.connect("b", node_b.clone());
  let node_c = Arc::new(dispatcher(
    directory_c,
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  ));

  let directory_a = FakeDirectory::new("a");
  directory_a.connect(
    "c",
    Arc::new(LaggingRelay {
      delay: Duration::from_millis(100),
      inner: node_c,
    }),
  );
  directory_a.connect("b", node_b);
  directory_a.set_reachable("b", false);
  let node_a = dispatcher(
    directory_a.clone(),
    Arc::new(InMemoryControllerRegistry::new()),
    &fast_config(1),
  );

  node_a.dispatch(datum(1, "a", "b", "c")).await;
  tokio::time::sleep(Duration::from_millis(20)).await;
  directory_a.set_reachable("b", true);
  node_a.dispatch(datum(2, "a", "b", "c")).await;

  assert_eq!(probe.next_received().await.value, TypedDatum::Integer(1));
  assert_eq!(probe.next_received().await.value, TypedDatum::Integer(2));
}

#[tokio::test]
async fn test_queued_datums_are_reported_on_shutdown() {
  let directory = FakeDirectory::new("a");
  let registry = Arc::new(InMemoryControllerRegistry::new());
  let (sender, mut probe) = controller();
  registry.register("sender", sender);
  let (remote, mut lines) = FlakyRemote::new(0);
  directory.connect(
    "b",
    Arc::new(SlowRemote {
      delay: Duration::from_millis(50),
      inner: remote,
    }),
  );
  let dispatcher = dispatcher(directory, registry, &fast_config(1));

  for value in 0..5 {
    dispatcher.dispatch(datum(value, "a", "b", "a")).await;
  }
  tokio::time::sleep(Duration::from_millis(10)).await;
  dispatcher.shutdown();
  tokio::time::sleep(Duration::from_millis(200)).await;

  let mut delivered = 0;
  while lines.try_recv().is_ok() {
    delivered += 1;
  }
  let mut reported = Vec::new();
  while let Ok((datum, error)) = probe.failed.try_recv() {
    assert!(matches!(error, DispatchError::SenderClosed { .. }));
    reported.push(datum.value);
  }

  assert!(delivered <= 1);
  assert_eq!(delivered + reported.len(), 5);
  assert_eq!(reported.last(), Some(&TypedDatum::Integer(4)));
}
