//! Fakes shared by the broker tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use playerlink_core::{Command, CommandKind, Event, InvokeArgs, InvokeKind, Query, QueryReply};

use crate::config::{BrokerConfig, WatchdogConfig};
use crate::error::{InvokeError, TransportError, WorkerError};
use crate::infra::logging::init_tracing;
use crate::listeners::{FrameListener, PlayerListener};
use crate::transport::{Transport, TransportCallbacks};
use crate::watchdog::Terminator;
use crate::worker::{
    EngineCallbacks, NativeEngine, NativeEngineFactory, RemoteWorker, WorkerClient,
};

pub(crate) const WAIT: Duration = Duration::from_secs(2);

/// Polls `check` until it holds or [`WAIT`] elapses.
pub(crate) fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

pub(crate) fn test_config(deadline: Duration) -> BrokerConfig {
    init_tracing();
    let mut config = BrokerConfig::default();
    config.watchdog = WatchdogConfig {
        deadline,
        thread_name: "playerlink-watchdog-test".to_string(),
        ..WatchdogConfig::default()
    };
    config.dispatch.query_timeout = Duration::from_millis(500);
    config.dispatch.release_timeout = Duration::from_secs(2);
    config
}

/// Scripted engine behavior: hangs, failures and query replies.
#[derive(Default)]
pub(crate) struct Script {
    hang: Mutex<Option<(CommandKind, Duration)>>,
    fail: Mutex<Option<CommandKind>>,
    panic: Mutex<Option<CommandKind>>,
    invoke: Mutex<Option<(CommandKind, InvokeKind)>>,
    replies: Mutex<HashMap<&'static str, QueryReply>>,
}

impl Script {
    pub(crate) fn hang_on(&self, kind: CommandKind, duration: Duration) {
        *self.hang.lock() = Some((kind, duration));
    }

    pub(crate) fn fail_on(&self, kind: CommandKind) {
        *self.fail.lock() = Some(kind);
    }

    pub(crate) fn panic_on(&self, kind: CommandKind) {
        *self.panic.lock() = Some(kind);
    }

    /// Engines raise `invoke` from inside the call applying `kind`.
    pub(crate) fn invoke_during(&self, kind: CommandKind, invoke: InvokeKind) {
        *self.invoke.lock() = Some((kind, invoke));
    }

    pub(crate) fn reply(&self, query: &Query, reply: QueryReply) {
        self.replies.lock().insert(query.as_str(), reply);
    }

    fn run(&self, command: &Command) -> Result<(), String> {
        let kind = command.kind();
        let hang = *self.hang.lock();
        if let Some((hang_kind, duration)) = hang
            && hang_kind == kind
        {
            thread::sleep(duration);
        }
        if *self.panic.lock() == Some(kind) {
            panic!("scripted {} panic", kind.as_str());
        }
        if *self.fail.lock() == Some(kind) {
            return Err(format!("scripted {} failure", kind.as_str()));
        }
        Ok(())
    }

    fn answer(&self, query: &Query) -> Result<QueryReply, String> {
        self.replies
            .lock()
            .get(query.as_str())
            .cloned()
            .ok_or_else(|| format!("no reply scripted for {}", query.as_str()))
    }
}

/// In-memory [`RemoteWorker`] recording every call it receives.
#[derive(Default)]
pub(crate) struct RecordingWorker {
    pub(crate) script: Script,
    executed: Mutex<Vec<Command>>,
    client: Mutex<Option<Arc<dyn WorkerClient>>>,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
}

impl RecordingWorker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn executed(&self) -> Vec<Command> {
        self.executed.lock().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<CommandKind> {
        self.executed.lock().iter().map(Command::kind).collect()
    }

    pub(crate) fn count(&self, kind: CommandKind) -> usize {
        self.executed
            .lock()
            .iter()
            .filter(|command| command.kind() == kind)
            .count()
    }

    pub(crate) fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub(crate) fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    pub(crate) fn client(&self) -> Option<Arc<dyn WorkerClient>> {
        self.client.lock().clone()
    }

    /// Raises an event as the engine would.
    pub(crate) fn post(&self, event: Event) {
        if let Some(client) = self.client() {
            client.on_event(event);
        }
    }

    pub(crate) fn invoke(
        &self,
        kind: InvokeKind,
        args: &mut InvokeArgs,
    ) -> Result<bool, InvokeError> {
        match self.client() {
            Some(client) => client.on_native_invoke(kind, args),
            None => Ok(false),
        }
    }
}

impl RemoteWorker for RecordingWorker {
    fn register_client(&self, client: Arc<dyn WorkerClient>) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.client.lock() = Some(client);
    }

    fn unregister_client(&self) {
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
        self.client.lock().take();
    }

    fn execute(&self, command: &Command) -> Result<(), WorkerError> {
        self.executed.lock().push(command.clone());
        self.script
            .run(command)
            .map_err(|message| WorkerError::Engine {
                operation: command.kind().as_str(),
                message,
            })
    }

    fn query(&self, query: &Query) -> Result<QueryReply, WorkerError> {
        self.script
            .answer(query)
            .map_err(|message| WorkerError::Engine {
                operation: query.as_str(),
                message,
            })
    }
}

/// Transport driven by the test. Keeps the last bound callbacks even after
/// unbind, so late callbacks can be replayed.
#[derive(Default)]
pub(crate) struct ManualTransport {
    callbacks: Mutex<Option<Arc<dyn TransportCallbacks>>>,
    binds: AtomicUsize,
    unbinds: AtomicUsize,
    refuse: AtomicBool,
}

impl ManualTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn refuse_binds(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub(crate) fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub(crate) fn unbinds(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    pub(crate) fn connect(&self, worker: Arc<dyn RemoteWorker>) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.on_connected(worker);
        }
    }

    pub(crate) fn disconnect(&self) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.on_disconnected();
        }
    }
}

impl Transport for ManualTransport {
    fn bind(&self, callbacks: Arc<dyn TransportCallbacks>) -> Result<(), TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::BindFailed {
                reason: "refused by test".to_string(),
            });
        }
        self.binds.fetch_add(1, Ordering::SeqCst);
        *self.callbacks.lock() = Some(callbacks);
        Ok(())
    }

    fn unbind(&self) {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
    }
}

/// Engine factory whose engines share one [`Script`] and command log.
#[derive(Default)]
pub(crate) struct RecordingFactory {
    pub(crate) script: Arc<Script>,
    applied: Arc<Mutex<Vec<Command>>>,
    callbacks: Mutex<Option<EngineCallbacks>>,
    creates: AtomicUsize,
}

impl RecordingFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn applied(&self) -> Vec<Command> {
        self.applied.lock().clone()
    }

    pub(crate) fn applied_kinds(&self) -> Vec<CommandKind> {
        self.applied.lock().iter().map(Command::kind).collect()
    }

    pub(crate) fn callbacks(&self) -> Option<EngineCallbacks> {
        self.callbacks.lock().clone()
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

impl NativeEngineFactory for RecordingFactory {
    fn init_process(&self) -> Result<(), String> {
        Ok(())
    }

    fn create(&self, callbacks: EngineCallbacks) -> Result<Box<dyn NativeEngine>, String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        *self.callbacks.lock() = Some(callbacks.clone());
        Ok(Box::new(RecordingEngine {
            script: Arc::clone(&self.script),
            applied: Arc::clone(&self.applied),
            callbacks,
        }))
    }
}

pub(crate) struct RecordingEngine {
    script: Arc<Script>,
    applied: Arc<Mutex<Vec<Command>>>,
    callbacks: EngineCallbacks,
}

impl NativeEngine for RecordingEngine {
    fn apply(&mut self, command: &Command) -> Result<(), String> {
        self.applied.lock().push(command.clone());
        let invoke = *self.script.invoke.lock();
        if let Some((kind, invoke)) = invoke
            && kind == command.kind()
        {
            let mut args = InvokeArgs::new();
            if let Err(error) = self.callbacks.native_invoke(invoke.code(), &mut args) {
                return Err(error.to_string());
            }
        }
        self.script.run(command)
    }

    fn query(&mut self, query: &Query) -> Result<QueryReply, String> {
        self.script.answer(query)
    }
}

/// Terminator that records exit codes instead of exiting.
pub(crate) struct RecordingTerminator {
    exits: Sender<i32>,
}

impl RecordingTerminator {
    pub(crate) fn new() -> (Arc<Self>, Receiver<i32>) {
        let (exits, rx) = crossbeam_channel::unbounded();
        (Arc::new(Self { exits }), rx)
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, exit_code: i32) {
        let _ = self.exits.send(exit_code);
    }
}

/// What a [`ChannelListener`] heard, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Heard {
    Prepared,
    Completion,
    Buffering(i32),
    SeekComplete,
    VideoSize(i32, i32, i32, i32),
    Error(i32, i32),
    Info(i32, i32),
    TimedText(Option<String>),
}

pub(crate) struct ChannelListener {
    tx: Sender<Heard>,
    handles_errors: bool,
}

impl ChannelListener {
    pub(crate) fn new(handles_errors: bool) -> (Box<Self>, Receiver<Heard>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Box::new(Self { tx, handles_errors }), rx)
    }
}

impl PlayerListener for ChannelListener {
    fn on_prepared(&self) {
        let _ = self.tx.send(Heard::Prepared);
    }

    fn on_completion(&self) {
        let _ = self.tx.send(Heard::Completion);
    }

    fn on_buffering_update(&self, percent: i32) {
        let _ = self.tx.send(Heard::Buffering(percent));
    }

    fn on_seek_complete(&self) {
        let _ = self.tx.send(Heard::SeekComplete);
    }

    fn on_video_size_changed(&self, width: i32, height: i32, sar_num: i32, sar_den: i32) {
        let _ = self
            .tx
            .send(Heard::VideoSize(width, height, sar_num, sar_den));
    }

    fn on_error(&self, what: i32, extra: i32) -> bool {
        let _ = self.tx.send(Heard::Error(what, extra));
        self.handles_errors
    }

    fn on_info(&self, what: i32, extra: i32) -> bool {
        let _ = self.tx.send(Heard::Info(what, extra));
        true
    }

    fn on_timed_text(&self, text: Option<&str>) {
        let _ = self.tx.send(Heard::TimedText(text.map(str::to_string)));
    }
}

pub(crate) type Frame = (i32, i32, Option<String>);

pub(crate) struct FrameChannel {
    tx: Sender<Frame>,
}

impl FrameChannel {
    pub(crate) fn new() -> (Box<Self>, Receiver<Frame>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Box::new(Self { tx }), rx)
    }
}

impl FrameListener for FrameChannel {
    fn on_frame_generated(&self, timestamp: i32, result_code: i32, file_name: Option<&str>) {
        let _ = self
            .tx
            .send((timestamp, result_code, file_name.map(str::to_string)));
    }
}

/// Drains everything `rx` receives until it stays quiet for a short while.
pub(crate) fn drain<T>(rx: &Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.recv_timeout(Duration::from_millis(150)) {
        items.push(item);
    }
    items
}
