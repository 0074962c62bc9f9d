use playerlink_core::{Query, QueryReply};
use playerlink_runtime::{Context, Handler, Message};

use crate::dispatch::DispatchActor;
use crate::error::WorkerError;

pub(crate) struct QueryMessage {
    pub(crate) query: Query,
}

impl Message for QueryMessage {
    type Reply = Result<QueryReply, WorkerError>;
}

impl Handler<QueryMessage> for DispatchActor {
    fn handle(
        &mut self,
        message: QueryMessage,
        _ctx: &mut Context,
    ) -> Result<QueryReply, WorkerError> {
        if self.gate.is_released() {
            return Err(WorkerError::Released);
        }
        let worker = self.worker.as_ref().ok_or(WorkerError::Disconnected)?;
        self.watchdog
            .guard(message.query.as_str(), || worker.query(&message.query))
            .map_err(WorkerError::from_guard)
    }
}
