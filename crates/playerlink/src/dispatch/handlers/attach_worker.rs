use std::sync::Arc;

use playerlink_runtime::{Context, Handler, Message};
use tracing::{debug, warn};

use crate::dispatch::DispatchActor;
use crate::worker::{RemoteWorker, WorkerClient};

pub(crate) struct AttachWorkerMessage {
    pub(crate) worker: Arc<dyn RemoteWorker>,
    pub(crate) client: Arc<dyn WorkerClient>,
}

impl Message for AttachWorkerMessage {
    type Reply = ();
}

impl Handler<AttachWorkerMessage> for DispatchActor {
    fn handle(&mut self, message: AttachWorkerMessage, _ctx: &mut Context) {
        message.worker.register_client(message.client);
        if let Some(previous) = self.worker.replace(message.worker) {
            warn!("replacing a worker that was never detached");
            previous.unregister_client();
        }
        debug!("worker attached");
    }
}
