use playerlink_runtime::{Context, Handler, Message};
use tracing::debug;

use crate::dispatch::DispatchActor;

pub(crate) struct DetachWorkerMessage;

impl Message for DetachWorkerMessage {
    type Reply = ();
}

impl Handler<DetachWorkerMessage> for DispatchActor {
    fn handle(&mut self, _message: DetachWorkerMessage, _ctx: &mut Context) {
        if let Some(worker) = self.worker.take() {
            worker.unregister_client();
            debug!("worker detached");
        }
    }
}
