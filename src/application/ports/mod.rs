pub mod connectivity;
pub mod local_store;
pub mod meta_store;
pub mod remote_backend;
pub mod sync_queue;

pub use connectivity::ConnectivityProbe;
pub use local_store::LocalStore;
pub use meta_store::MetaStore;
pub use remote_backend::RemoteBackend;
pub use sync_queue::SyncQueue;
