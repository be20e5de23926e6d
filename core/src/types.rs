//! Shared primitive types used across the entire crate.

/// Virtual simulation time in milliseconds. Advanced only by the engine
/// pump — never read from a wall clock.
pub type TimeMs = u64;

/// Run-generation token. Bumped whenever a new run supersedes the
/// previous one; scheduled steps carrying an older generation are stale.
pub type Generation = u64;

/// A parcel identifier as stored (trimmed, uppercased).
pub type ParcelId = String;

/// The identifier of one animated traversal, stable across replays.
pub type RunId = String;
