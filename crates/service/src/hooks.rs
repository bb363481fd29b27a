//! Pluggable behavior hooks the room calls at well-defined points.

/// What the room should do with a `target=server` frame whose message type did not match one of
/// the built-in server RPCs (instantiate/destroy/request-authority/transfer-authority/migrate-host).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveAction {
    /// Drop the frame; no fan-out.
    Ignore,
    /// Re-encode and fan the frame out to every registered client, including the sender.
    BroadcastAll,
}

/// Implementation-neutral hook the room calls at registration, unregistration, host change,
/// unmatched server RPCs, and room close.
///
/// All methods default to a no-op except [`ServiceHook::receive`], whose default answers
/// `Ok(ReceiveAction::Ignore)`; [`RelayHook`] overrides it to implement the room's default relay
/// behavior of broadcasting unmatched server RPCs to every client. `receive` is fallible: an `Err`
/// is logged by the room as `Error::ServiceError` and the session that produced it is left open.
pub trait ServiceHook: Send + Sync {
    fn on_register_client(&self, _id: u16) {}
    fn on_unregister_client(&self, _id: u16) {}
    fn on_change_host(&self, _id: u16) {}
    fn receive(&self, _sender_id: u16, _payload: &[u8]) -> anyhow::Result<ReceiveAction> {
        Ok(ReceiveAction::Ignore)
    }
    fn destroy(&self) {}
}

/// The default service hook: treats unmatched `target=server` frames as "broadcast to all" and
/// leaves every other hook point as a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelayHook;

impl ServiceHook for RelayHook {
    fn receive(&self, _sender_id: u16, _payload: &[u8]) -> anyhow::Result<ReceiveAction> {
        Ok(ReceiveAction::BroadcastAll)
    }
}
