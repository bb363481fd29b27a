//! Room runtime for the relay service: admission, membership, dispatch, host migration, and the
//! object registry that makes up the core of a room's lifetime.

pub mod buffered;
pub mod error;
pub mod handshake;
pub mod hooks;
pub mod ids;
pub mod objects;
pub mod registry;
pub mod room;
pub mod room_registry;
pub mod session;

pub use buffered::BufferedRpcStore;
pub use error::Error;
pub use handshake::{admit, Admission};
pub use hooks::{ReceiveAction, RelayHook, ServiceHook};
pub use ids::IdAllocator;
pub use objects::{GameObject, Lifetime, ObjectRegistry};
pub use registry::ClientRegistry;
pub use room::{Room, RoomConfig};
pub use room_registry::RoomRegistry;
pub use session::{spawn_session, ClientSession};
