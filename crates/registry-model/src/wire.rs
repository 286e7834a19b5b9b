//! Root-name tags for top-level payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A payload that may travel as the top-level body of a registry request or
/// response.
///
/// The registry wraps every top-level body in a single-key object named after
/// the payload type, e.g. `{"instance": {...}}`. `ROOT_NAME` is that key.
pub trait WireEntity: Serialize + DeserializeOwned {
    /// The key of the single-entry object wrapping this payload on the wire.
    const ROOT_NAME: &'static str;
}
