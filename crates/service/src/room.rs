//! Per-room state machine: registration, unregistration, dispatch, host migration, object RPCs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use bytes::{BufMut, Bytes, BytesMut};
use codec::{encode_outbound, Inbound, MessageType, Target};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::hooks::{ReceiveAction, RelayHook, ServiceHook};
use crate::objects::{GameObject, Lifetime, ObjectRegistry};
use crate::registry::ClientRegistry;
use crate::session::{build_session, ClientSession};
use crate::{BufferedRpcStore, Error, IdAllocator};

/// Static configuration a room is created with; in this crate it comes from the process configuration's
/// static room list rather than the out-of-scope creation RPC.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub application_name: String,
    pub version: String,
    pub password: String,
    pub capacity: usize,
    pub creator_token: String,
    pub info: AHashMap<String, String>,
}

/// One room's in-memory state: membership, the object table, the late-join buffer, the host, and
/// the pluggable hook called at well-defined points.
///
/// `membership_lock` is held for the full duration of [`Room::register`] and [`Room::unregister`]
/// so that concurrent registrations are serialized end to end: a newly-registering client can
/// never observe a broadcast or replay entry produced by another registration before its own
/// replay has completed. It is a `tokio::sync::Mutex`
/// rather than the `parking_lot::Mutex` the other tables use because it must stay held across the
/// `.await` points in the multi-step register/unregister sequence.
pub struct Room<H: ServiceHook = RelayHook> {
    id: u32,
    config: RoomConfig,
    clients: ClientRegistry,
    buffered: BufferedRpcStore,
    objects: ObjectRegistry,
    ids: Mutex<IdAllocator>,
    host: Mutex<Option<u16>>,
    creator_connected: AtomicBool,
    membership_lock: AsyncMutex<()>,
    hook: H,
}

impl<H: ServiceHook> Room<H> {
    pub fn new(id: u32, config: RoomConfig, hook: H) -> Arc<Self> {
        Arc::new(Self {
            id,
            config,
            clients: ClientRegistry::new(),
            buffered: BufferedRpcStore::new(),
            objects: ObjectRegistry::new(),
            ids: Mutex::new(IdAllocator::default()),
            host: Mutex::new(None),
            creator_connected: AtomicBool::new(false),
            membership_lock: AsyncMutex::new(()),
            hook,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn client_count(&self) -> usize {
        self.clients.count()
    }

    pub fn has_capacity(&self) -> bool {
        self.clients.count() < self.config.capacity
    }

    pub fn creator_connected(&self) -> bool {
        self.creator_connected.load(Ordering::SeqCst)
    }

    /// Flips `creator_connected` from false to true. Returns whether this call performed the
    /// transition; a caller that gets `false` back raced another connection and must treat its own
    /// creator-token attempt as though the room already had a creator.
    pub fn mark_creator_connected(&self) -> bool {
        !self.creator_connected.swap(true, Ordering::SeqCst)
    }

    /// Admits a new client: allocates an id, adds it to the registry, and runs steps 2-7 of
    /// Register while holding `membership_lock`. Returns the session and the receiver its write
    /// task should drain; the caller is responsible for step 8 (starting the read/write tasks via
    /// [`crate::session::spawn_session`]).
    pub async fn register(self: &Arc<Self>) -> Result<(Arc<ClientSession>, mpsc::Receiver<Bytes>), Error> {
        let _membership = self.membership_lock.lock().await;

        if self.clients.count() >= self.config.capacity {
            return Err(Error::Full);
        }

        let id = self.ids.lock().generate().map_err(|_| Error::Full)?;
        let (session, receiver) = build_session(id);

        if let Err(e) = self.clients.add(id, session.clone()) {
            self.ids.lock().free(id);
            return Err(e);
        }

        session.send(identity_frame(id, MessageType::Register.as_u8())).await?;

        let new_connection_frame = identity_frame(id, MessageType::NewConnection.as_u8());
        self.broadcast_to(&new_connection_frame, Some(id)).await;

        self.buffered.replay_to(&session).await?;
        self.buffered.add(new_connection_frame, id);

        for object in self.objects.snapshot() {
            session.send(instantiate_frame(&object)).await?;
        }

        let became_host = {
            let mut host = self.host.lock();
            if self.clients.count() == 1 {
                *host = Some(id);
                true
            } else {
                false
            }
        };
        if became_host {
            session
                .send(identity_frame(id, MessageType::MigrateHost.as_u8()))
                .await?;
        }

        self.hook.on_register_client(id);
        log::info!("room {}: registered client {id}", self.id);

        Ok((session, receiver))
    }

    /// Removes `client` and runs the full teardown sequence. A no-op if `client`
    /// is not currently registered, so both the read and write task of a session may call this
    /// unconditionally and only one performs the side effects.
    pub async fn unregister(self: &Arc<Self>, client: u16) {
        let _membership = self.membership_lock.lock().await;

        if !self.clients.exists(client) {
            return;
        }

        self.ids.lock().free(client);
        self.clients.remove(client);
        self.buffered.remove_by_sender(client);

        let exit_frame = identity_frame(client, MessageType::ExitConnection.as_u8());
        self.broadcast_to(&exit_frame, None).await;

        if self.clients.is_empty() {
            self.objects.clear();
            *self.host.lock() = None;
            self.hook.on_unregister_client(client);
            log::info!("room {}: unregistered client {client} (room now empty)", self.id);
            return;
        }

        let was_host = *self.host.lock() == Some(client);
        if was_host {
            if let Some(new_host) = self.clients.first() {
                let new_host_id = new_host.id();
                *self.host.lock() = Some(new_host_id);
                let _ = new_host
                    .send(identity_frame(new_host_id, MessageType::MigrateHost.as_u8()))
                    .await;
                self.hook.on_change_host(new_host_id);
                log::info!("room {}: host migrated from {client} to {new_host_id}", self.id);
            }
        }

        let current_host = *self.host.lock();
        for object in self.objects.owned_by(client) {
            match object.lifetime {
                Lifetime::RoomScoped => {
                    if let Some(new_owner_id) = current_host {
                        if let Some(new_owner) = self.clients.get(new_owner_id) {
                            let _ = new_owner
                                .send(transfer_authority_frame(client, object.id))
                                .await;
                        }
                        self.objects.set_owner(object.id, new_owner_id);
                    }
                }
                Lifetime::OwnerScoped => {
                    self.objects.remove(object.id);
                    self.broadcast_to(&destroy_frame(client, object.id), None).await;
                }
            }
        }

        self.hook.on_unregister_client(client);
        log::info!("room {}: unregistered client {client}", self.id);
    }

    /// Parses `frame` as an inbound frame from `sender` and dispatches it per the target table.
    pub async fn receive(self: &Arc<Self>, sender: u16, frame: &[u8]) -> Result<(), Error> {
        let inbound = Inbound::parse(frame)?;

        let mut buf = BytesMut::new();
        encode_outbound(sender, inbound.message_type, inbound.payload, &mut buf)?;
        let outbound = buf.freeze();

        let Ok(target) = Target::try_from(inbound.target) else {
            log::debug!(
                "room {}: unknown target {} from client {sender}",
                self.id,
                inbound.target
            );
            return Ok(());
        };

        match target {
            Target::All => self.broadcast_to(&outbound, None).await,
            Target::Others => self.broadcast_to(&outbound, Some(sender)).await,
            Target::AllBuffered => {
                self.broadcast_to(&outbound, None).await;
                self.buffered.add(outbound, sender);
            }
            Target::OthersBuffered => {
                self.broadcast_to(&outbound, Some(sender)).await;
                self.buffered.add(outbound, sender);
            }
            Target::Host => {
                let host_id = *self.host.lock();
                if let Some(host) = host_id.and_then(|id| self.clients.get(id)) {
                    let _ = host.send(outbound).await;
                }
            }
            Target::Server => {
                self.handle_server_rpc(sender, inbound.message_type, inbound.payload, outbound)
                    .await;
            }
        }

        Ok(())
    }

    /// Closes every client transport, calls the hook's `destroy`, and drops all in-room state. The
    /// caller is responsible for removing the room from its own map.
    pub async fn close(self: &Arc<Self>) {
        for session in self.clients.snapshot() {
            session.request_close();
        }
        self.clients.clear();
        self.buffered.clear();
        self.objects.clear();
        *self.host.lock() = None;
        self.hook.destroy();
        log::info!("room {}: closed", self.id);
    }

    async fn broadcast_to(&self, frame: &Bytes, exclude: Option<u16>) {
        for session in self.clients.snapshot() {
            if Some(session.id()) == exclude {
                continue;
            }
            if session.send(frame.clone()).await.is_err() {
                log::debug!(
                    "room {}: client {} did not accept a frame, closing it",
                    self.id,
                    session.id()
                );
                session.request_close();
            }
        }
    }

    async fn handle_server_rpc(
        self: &Arc<Self>,
        sender: u16,
        message_type: u8,
        payload: &[u8],
        outbound: Bytes,
    ) {
        match MessageType::try_from(message_type) {
            Ok(MessageType::Instantiate) => self.handle_instantiate(sender, payload, outbound).await,
            Ok(MessageType::Destroy) => self.handle_destroy(sender, payload).await,
            Ok(MessageType::RequestAuthority) => self.handle_request_authority(sender, payload).await,
            Ok(MessageType::TransferAuthority) => self.handle_transfer_authority(sender, payload).await,
            Ok(MessageType::MigrateHost) => self.handle_migrate_host(sender, payload).await,
            _ => self.dispatch_to_hook(sender, payload, outbound).await,
        }
    }

    async fn dispatch_to_hook(self: &Arc<Self>, sender: u16, payload: &[u8], outbound: Bytes) {
        match self.hook.receive(sender, payload) {
            Ok(ReceiveAction::Ignore) => {}
            Ok(ReceiveAction::BroadcastAll) => self.broadcast_to(&outbound, None).await,
            Err(e) => {
                let err = Error::ServiceError(e);
                log::warn!("room {}: service hook error from client {sender}: {err}", self.id);
            }
        }
    }

    async fn handle_instantiate(self: &Arc<Self>, sender: u16, payload: &[u8], outbound: Bytes) {
        if payload.len() < 5 {
            log::debug!("room {}: malformed instantiate from client {sender}", self.id);
            return;
        }

        let object_id = u32::from_le_bytes(payload[0..4].try_into().unwrap());
        let Ok(lifetime) = Lifetime::try_from(payload[4]) else {
            log::debug!("room {}: unknown lifetime byte from client {sender}", self.id);
            return;
        };

        if self.objects.exists(object_id) {
            log::debug!("room {}: duplicate instantiate of {object_id:#x} ignored", self.id);
            return;
        }

        let resource_path = Bytes::copy_from_slice(&payload[5..]);
        let object = GameObject {
            id: object_id,
            owner: sender,
            lifetime,
            resource_path,
        };
        if self.objects.add(object).is_err() {
            return;
        }

        self.broadcast_to(&outbound, None).await;
        log::info!("room {}: client {sender} instantiated object {object_id:#x}", self.id);
    }

    async fn handle_destroy(self: &Arc<Self>, sender: u16, payload: &[u8]) {
        let Some(object_id) = read_u32(payload) else {
            log::debug!("room {}: malformed destroy from client {sender}", self.id);
            return;
        };

        let Some(object) = self.objects.get(object_id) else {
            log::debug!("room {}: destroy of unknown object {object_id:#x}", self.id);
            return;
        };
        if object.owner != sender {
            log::debug!("room {}: client {sender} is not the owner of {object_id:#x}", self.id);
            return;
        }

        self.objects.remove(object_id);
        self.broadcast_to(&destroy_frame(sender, object_id), None).await;
    }

    async fn handle_request_authority(self: &Arc<Self>, sender: u16, payload: &[u8]) {
        let Some(object_id) = read_u32(payload) else {
            log::debug!("room {}: malformed request-authority from client {sender}", self.id);
            return;
        };

        let Some(object) = self.objects.get(object_id) else {
            log::debug!("room {}: request-authority for unknown object {object_id:#x}", self.id);
            return;
        };
        if let Some(owner) = self.clients.get(object.owner) {
            let _ = owner
                .send(request_authority_frame(sender, object_id))
                .await;
        }
    }

    async fn handle_transfer_authority(self: &Arc<Self>, sender: u16, payload: &[u8]) {
        if payload.len() != 8 {
            log::debug!("room {}: malformed transfer-authority from client {sender}", self.id);
            return;
        }

        let object_id = u32::from_le_bytes(payload[0..4].try_into().unwrap());
        let new_owner_id = u32::from_le_bytes(payload[4..8].try_into().unwrap()) as u16;

        let Some(object) = self.objects.get(object_id) else {
            log::debug!("room {}: transfer-authority for unknown object {object_id:#x}", self.id);
            return;
        };
        if object.owner != sender {
            log::debug!("room {}: client {sender} is not the owner of {object_id:#x}", self.id);
            return;
        }
        let Some(new_owner) = self.clients.get(new_owner_id) else {
            log::debug!("room {}: transfer-authority target {new_owner_id} is not live", self.id);
            return;
        };

        self.objects.set_owner(object_id, new_owner_id);
        let _ = new_owner
            .send(transfer_authority_frame(sender, object_id))
            .await;
    }

    async fn handle_migrate_host(self: &Arc<Self>, sender: u16, payload: &[u8]) {
        let Some(target_id) = read_u32(payload).map(|v| v as u16) else {
            log::debug!("room {}: malformed migrate-host from client {sender}", self.id);
            return;
        };

        if *self.host.lock() != Some(sender) {
            log::debug!("room {}: client {sender} requested migrate-host but is not host", self.id);
            return;
        }
        let Some(new_host) = self.clients.get(target_id) else {
            log::debug!("room {}: migrate-host target {target_id} is not live", self.id);
            return;
        };

        *self.host.lock() = Some(target_id);
        let _ = new_host
            .send(identity_frame(target_id, MessageType::MigrateHost.as_u8()))
            .await;
        self.hook.on_change_host(target_id);
        log::info!("room {}: host migrated to {target_id} by request", self.id);
    }
}

fn read_u32(payload: &[u8]) -> Option<u32> {
    if payload.len() != 4 {
        return None;
    }
    Some(u32::from_le_bytes(payload.try_into().unwrap()))
}

fn identity_frame(id: u16, message_type: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(3);
    buf.put_u16_le(id);
    buf.put_u8(message_type);
    buf.freeze()
}

fn destroy_frame(owner: u16, object_id: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(7);
    buf.put_u16_le(owner);
    buf.put_u8(MessageType::Destroy.as_u8());
    buf.put_u32_le(object_id);
    buf.freeze()
}

fn transfer_authority_frame(previous_owner: u16, object_id: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(7);
    buf.put_u16_le(previous_owner);
    buf.put_u8(MessageType::TransferAuthority.as_u8());
    buf.put_u32_le(object_id);
    buf.freeze()
}

fn request_authority_frame(sender: u16, object_id: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(7);
    buf.put_u16_le(sender);
    buf.put_u8(MessageType::RequestAuthority.as_u8());
    buf.put_u32_le(object_id);
    buf.freeze()
}

fn instantiate_frame(object: &GameObject) -> Bytes {
    let mut buf = BytesMut::with_capacity(7 + object.resource_path.len());
    buf.put_u16_le(object.owner);
    buf.put_u8(MessageType::Instantiate.as_u8());
    buf.put_u32_le(object.id);
    buf.put_u8(object.lifetime as u8);
    buf.extend_from_slice(&object.resource_path);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::RelayHook;

    fn config(capacity: usize) -> RoomConfig {
        RoomConfig {
            application_name: "iguana online".into(),
            version: "0.0.0 beta".into(),
            password: String::new(),
            capacity,
            creator_token: "token".into(),
            info: AHashMap::default(),
        }
    }

    fn inbound_frame(target: Target, message_type: MessageType, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + payload.len());
        buf.put_u8(target as u8);
        buf.put_u8(message_type.as_u8());
        buf.extend_from_slice(payload);
        buf.freeze()
    }

    struct FailingHook;
    impl ServiceHook for FailingHook {
        fn receive(&self, _sender_id: u16, _payload: &[u8]) -> anyhow::Result<ReceiveAction> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn first_registrant_becomes_host() {
        let room = Room::new(1, config(8), RelayHook);
        let (session, _receiver) = room.register().await.unwrap();
        assert_eq!(*room.host.lock(), Some(session.id()));
    }

    #[tokio::test]
    async fn register_rejects_over_capacity() {
        let room = Room::new(1, config(1), RelayHook);
        let (_a, _a_rx) = room.register().await.unwrap();
        assert!(!room.has_capacity());
        assert!(matches!(room.register().await, Err(Error::Full)));
    }

    #[tokio::test]
    async fn unregister_is_a_no_op_for_unknown_client() {
        let room = Room::new(1, config(8), RelayHook);
        room.unregister(42).await;
        assert_eq!(room.client_count(), 0);
    }

    #[tokio::test]
    async fn second_registrant_sees_new_connection_broadcast() {
        let room = Room::new(1, config(8), RelayHook);
        let (_a, mut a_rx) = room.register().await.unwrap();
        assert_eq!(a_rx.recv().await.unwrap(), identity_frame(0, MessageType::Register.as_u8()));
        assert_eq!(a_rx.recv().await.unwrap(), identity_frame(0, MessageType::MigrateHost.as_u8()));

        let (b, mut b_rx) = room.register().await.unwrap();
        assert_eq!(
            a_rx.recv().await.unwrap(),
            identity_frame(b.id(), MessageType::NewConnection.as_u8())
        );
        assert_eq!(b_rx.recv().await.unwrap(), identity_frame(b.id(), MessageType::Register.as_u8()));
    }

    #[tokio::test]
    async fn host_migrates_when_host_disconnects() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, _a_rx) = room.register().await.unwrap();
        let (b, mut b_rx) = room.register().await.unwrap();
        // drain b's register + a's new-connection-for-b notice isn't sent to b itself
        let _ = b_rx.recv().await.unwrap(); // register

        room.unregister(a.id()).await;
        let exit = b_rx.recv().await.unwrap();
        assert_eq!(exit, identity_frame(a.id(), MessageType::ExitConnection.as_u8()));
        let migrate = b_rx.recv().await.unwrap();
        assert_eq!(migrate, identity_frame(b.id(), MessageType::MigrateHost.as_u8()));
        assert_eq!(*room.host.lock(), Some(b.id()));
    }

    #[tokio::test]
    async fn owner_scoped_object_is_destroyed_on_owner_disconnect() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, _a_rx) = room.register().await.unwrap();
        let (b, mut b_rx) = room.register().await.unwrap();
        let _ = b_rx.recv().await.unwrap(); // register frame

        room.objects
            .add(GameObject {
                id: 0x0001_0001,
                owner: a.id(),
                lifetime: Lifetime::OwnerScoped,
                resource_path: Bytes::from_static(b"mesh"),
            })
            .unwrap();

        room.unregister(a.id()).await;
        assert!(!room.objects.exists(0x0001_0001));
        assert_eq!(room.client_count(), 1);

        assert_eq!(
            b_rx.recv().await.unwrap(),
            identity_frame(a.id(), MessageType::ExitConnection.as_u8())
        );
        assert_eq!(
            b_rx.recv().await.unwrap(),
            identity_frame(b.id(), MessageType::MigrateHost.as_u8())
        );
        assert_eq!(b_rx.recv().await.unwrap(), Bytes::from_static(b"\x00\x00\x03\x01\x00\x01\x00"));
    }

    #[tokio::test]
    async fn room_scoped_object_transfers_to_new_host_on_owner_disconnect() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, _a_rx) = room.register().await.unwrap();
        let (b, mut b_rx) = room.register().await.unwrap();
        let _ = b_rx.recv().await.unwrap(); // register frame

        room.objects
            .add(GameObject {
                id: 0x0002,
                owner: a.id(),
                lifetime: Lifetime::RoomScoped,
                resource_path: Bytes::from_static(b"mesh"),
            })
            .unwrap();

        room.unregister(a.id()).await;
        assert_eq!(room.objects.get(0x0002).unwrap().owner, b.id());
    }

    #[tokio::test]
    async fn instantiate_rpc_broadcasts_and_replays_to_late_joiner() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, mut a_rx) = room.register().await.unwrap();
        assert_eq!(a_rx.recv().await.unwrap(), identity_frame(0, MessageType::Register.as_u8()));
        assert_eq!(a_rx.recv().await.unwrap(), identity_frame(0, MessageType::MigrateHost.as_u8()));

        let mut payload = BytesMut::new();
        payload.put_u32_le(0x0001_0000);
        payload.put_u8(Lifetime::RoomScoped as u8);
        payload.extend_from_slice(b"iguana");
        let frame = inbound_frame(Target::Server, MessageType::Instantiate, &payload.freeze());
        room.receive(a.id(), &frame).await.unwrap();

        let expected = Bytes::from_static(b"\x00\x00\x02\x00\x00\x01\x00\x02iguana");
        assert_eq!(a_rx.recv().await.unwrap(), expected);

        let (b, mut b_rx) = room.register().await.unwrap();
        assert_eq!(b_rx.recv().await.unwrap(), identity_frame(b.id(), MessageType::Register.as_u8()));
        assert_eq!(
            b_rx.recv().await.unwrap(),
            identity_frame(a.id(), MessageType::NewConnection.as_u8())
        );
        assert_eq!(b_rx.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn transfer_authority_rpc_moves_ownership_and_notifies_new_owner() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, _a_rx) = room.register().await.unwrap();
        let (_b, _b_rx) = room.register().await.unwrap();
        let (c, mut c_rx) = room.register().await.unwrap();
        let _ = c_rx.recv().await.unwrap(); // register frame

        room.objects
            .add(GameObject {
                id: 0x0001_0001,
                owner: a.id(),
                lifetime: Lifetime::RoomScoped,
                resource_path: Bytes::from_static(b"mesh"),
            })
            .unwrap();

        let mut payload = BytesMut::new();
        payload.put_u32_le(0x0001_0001);
        payload.put_u32_le(c.id() as u32);
        let frame = inbound_frame(Target::Server, MessageType::TransferAuthority, &payload.freeze());
        room.receive(a.id(), &frame).await.unwrap();

        assert_eq!(room.objects.get(0x0001_0001).unwrap().owner, c.id());
        assert_eq!(
            c_rx.recv().await.unwrap(),
            Bytes::from_static(b"\x00\x00\x05\x01\x00\x01\x00")
        );

        let mut destroy_payload = BytesMut::new();
        destroy_payload.put_u32_le(0x0001_0001);
        let destroy = inbound_frame(Target::Server, MessageType::Destroy, &destroy_payload.freeze());
        room.receive(a.id(), &destroy).await.unwrap();
        assert!(room.objects.exists(0x0001_0001));
    }

    #[tokio::test]
    async fn request_authority_rpc_forwards_to_current_owner() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, mut a_rx) = room.register().await.unwrap();
        let _ = a_rx.recv().await.unwrap(); // register frame
        let _ = a_rx.recv().await.unwrap(); // migrate-host (a becomes host)

        let (b, _b_rx) = room.register().await.unwrap();
        let _ = a_rx.recv().await.unwrap(); // new-connection frame for b

        room.objects
            .add(GameObject {
                id: 0x42,
                owner: a.id(),
                lifetime: Lifetime::RoomScoped,
                resource_path: Bytes::from_static(b"mesh"),
            })
            .unwrap();

        let mut payload = BytesMut::new();
        payload.put_u32_le(0x42);
        let frame = inbound_frame(Target::Server, MessageType::RequestAuthority, &payload.freeze());
        room.receive(b.id(), &frame).await.unwrap();

        assert_eq!(a_rx.recv().await.unwrap(), request_authority_frame(b.id(), 0x42));
    }

    #[tokio::test]
    async fn migrate_host_rpc_changes_host_and_notifies_target() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, _a_rx) = room.register().await.unwrap();
        let (b, mut b_rx) = room.register().await.unwrap();
        let _ = b_rx.recv().await.unwrap(); // register frame

        assert_eq!(*room.host.lock(), Some(a.id()));

        let mut payload = BytesMut::new();
        payload.put_u32_le(b.id() as u32);
        let frame = inbound_frame(Target::Server, MessageType::MigrateHost, &payload.freeze());
        room.receive(a.id(), &frame).await.unwrap();

        assert_eq!(*room.host.lock(), Some(b.id()));
        assert_eq!(
            b_rx.recv().await.unwrap(),
            identity_frame(b.id(), MessageType::MigrateHost.as_u8())
        );
    }

    #[tokio::test]
    async fn migrate_host_rpc_rejected_from_non_host() {
        let room = Room::new(1, config(8), RelayHook);
        let (a, _a_rx) = room.register().await.unwrap();
        let (b, mut b_rx) = room.register().await.unwrap();
        let _ = b_rx.recv().await.unwrap(); // register frame

        let mut payload = BytesMut::new();
        payload.put_u32_le(a.id() as u32);
        let frame = inbound_frame(Target::Server, MessageType::MigrateHost, &payload.freeze());
        room.receive(b.id(), &frame).await.unwrap();

        assert_eq!(*room.host.lock(), Some(a.id()));
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn service_hook_error_is_logged_and_session_stays_open() {
        let room = Room::new(1, config(8), FailingHook);
        let (a, mut a_rx) = room.register().await.unwrap();
        let _ = a_rx.recv().await.unwrap(); // register frame
        let _ = a_rx.recv().await.unwrap(); // migrate-host (a becomes host)

        let frame = inbound_frame(Target::Server, MessageType::Rpc, b"anything");
        room.receive(a.id(), &frame).await.unwrap();

        assert!(a_rx.try_recv().is_err());
        assert_eq!(room.client_count(), 1);
    }
}
