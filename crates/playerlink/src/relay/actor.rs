use std::sync::Arc;

use playerlink_runtime::{Context, Handler, Message};

use crate::relay::{RelayCore, RelayItem};

pub(crate) struct DeliveryActor {
    pub(crate) core: Arc<RelayCore>,
}

pub(crate) struct DeliverItemMessage {
    pub(crate) item: RelayItem,
}

impl Message for DeliverItemMessage {
    type Reply = ();
}

impl Handler<DeliverItemMessage> for DeliveryActor {
    fn handle(&mut self, message: DeliverItemMessage, _ctx: &mut Context) {
        self.core.deliver(message.item);
    }
}

pub(crate) struct StopDeliveryMessage;

impl Message for StopDeliveryMessage {
    type Reply = ();
}

impl Handler<StopDeliveryMessage> for DeliveryActor {
    fn handle(&mut self, _message: StopDeliveryMessage, ctx: &mut Context) {
        ctx.stop();
    }
}
