use std::sync::Arc;

use crossbeam_channel::Sender;
use playerlink_core::{Command, CommandKind};
use playerlink_runtime::{Context, Handler, Message};
use tracing::{debug, warn};

use crate::dispatch::DispatchActor;
use crate::transport::Transport;

pub(crate) struct ShutdownMessage {
    pub(crate) ack: Sender<()>,
    /// Set when release ran on the dispatcher thread and left the unbind to us.
    pub(crate) unbind: Option<Arc<dyn Transport>>,
}

impl Message for ShutdownMessage {
    type Reply = ();
}

impl Handler<ShutdownMessage> for DispatchActor {
    fn handle(&mut self, message: ShutdownMessage, ctx: &mut Context) {
        if let Some(worker) = self.worker.take() {
            let operation = CommandKind::Release.as_str();
            if let Err(error) = self
                .watchdog
                .guard(operation, || worker.execute(&Command::Release))
            {
                warn!(%error, "worker release failed");
            }
            worker.unregister_client();
        }
        if let Some(transport) = message.unbind {
            transport.unbind();
        }
        debug!("dispatcher stopped");
        ctx.stop();
        let _ = message.ack.send(());
    }
}
