// ── Mirror storage ──
//
// The mirror itself, the pure reducer that advances it, and the
// watch-backed store that publishes it.

mod data_store;
mod mirror;
mod reducer;

pub use data_store::DataStore;
pub use mirror::Mirror;
pub use reducer::reduce;
