use playerlink_core::Command;
use playerlink_runtime::{Context, Handler, Message};
use tracing::debug;

use crate::dispatch::DispatchActor;
use crate::error::GuardError;
use crate::events::FaultCause;

pub(crate) struct DeliverCommandMessage {
    pub(crate) command: Command,
    pub(crate) epoch: u64,
}

impl Message for DeliverCommandMessage {
    type Reply = ();
}

impl Handler<DeliverCommandMessage> for DispatchActor {
    fn handle(&mut self, message: DeliverCommandMessage, _ctx: &mut Context) {
        let operation = message.command.kind().as_str();
        if self.gate.is_released() {
            debug!(operation, "dropping command queued before release");
            return;
        }
        // Create opens the session and survives a reset.
        if message.epoch < self.gate.epoch() && message.command != Command::Create {
            debug!(operation, "dropping command queued before reset");
            return;
        }
        let Some(worker) = self.worker.as_ref() else {
            self.faults.report(operation, FaultCause::NoWorker);
            return;
        };
        match self
            .watchdog
            .guard(operation, || worker.execute(&message.command))
        {
            Ok(()) => {},
            Err(GuardError::Failed(error)) => self.faults.report(
                operation,
                FaultCause::CallFailed {
                    message: error.to_string(),
                },
            ),
            // Already published by the watchdog when the ticket fired.
            Err(GuardError::TimedOut { .. }) => {},
        }
    }
}
