//! In-flight request registry.
//!
//! A pipelined connection may write request N+1 while response N is still
//! being decoded, so the registry is shared between the write path and the
//! read path of a connection and guards its map with a mutex. Nothing is
//! shared across connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::protocol::ApiKey;

/// Maps an in-flight request's correlation id to the api that was
/// requested, so a response frame (which carries no api key of its own)
/// can be decoded.
///
/// An entry lives from "request handed to the transport" to "response
/// frame seen". Each entry is read once and removed.
#[derive(Clone, Debug, Default)]
pub struct RequestCorrelator {
    in_flight: Arc<Mutex<HashMap<i32, ApiKey>>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, ApiKey>> {
        // A poisoned lock only means some thread panicked mid-access; the
        // map itself is a plain HashMap and stays coherent.
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record an outgoing request. Call this before the frame is written,
    /// so the entry is live by the time a response can possibly arrive.
    ///
    /// Registering a correlation id that is still in flight is a
    /// programming error in the caller and fails rather than overwriting
    /// the live entry.
    pub fn register(&self, correlation_id: i32, api_key: ApiKey) -> Result<()> {
        let mut in_flight = self.lock();
        if in_flight.contains_key(&correlation_id) {
            tracing::error!(
                "ERROR: correlation id {} registered while still in flight",
                correlation_id
            );
            return Err(Error::CorrelationIdInUse(correlation_id));
        }
        in_flight.insert(correlation_id, api_key);
        Ok(())
    }

    /// Take the api key registered for a response's correlation id,
    /// removing the entry.
    ///
    /// An unknown id means a stale or duplicate response, or a
    /// desynchronized connection; the caller should treat it as fatal for
    /// the connection.
    pub fn resolve(&self, correlation_id: i32) -> Result<ApiKey> {
        self.lock()
            .remove(&correlation_id)
            .ok_or(Error::UnknownCorrelationId(correlation_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolve_removes_the_entry() {
        let correlator = RequestCorrelator::new();
        correlator.register(7, ApiKey::Fetch).unwrap();

        assert_eq!(correlator.resolve(7).unwrap(), ApiKey::Fetch);
        assert_eq!(correlator.resolve(7), Err(Error::UnknownCorrelationId(7)));
    }

    #[test]
    fn resolve_unregistered_id_fails() {
        let correlator = RequestCorrelator::new();
        assert_eq!(correlator.resolve(3), Err(Error::UnknownCorrelationId(3)));
    }

    #[test]
    fn duplicate_register_fails() {
        let correlator = RequestCorrelator::new();
        correlator.register(1, ApiKey::Produce).unwrap();
        assert_eq!(
            correlator.register(1, ApiKey::Metadata),
            Err(Error::CorrelationIdInUse(1))
        );
        // the original entry survives
        assert_eq!(correlator.resolve(1).unwrap(), ApiKey::Produce);
    }

    #[test]
    fn ids_are_independent() {
        let correlator = RequestCorrelator::new();
        correlator.register(1, ApiKey::Produce).unwrap();
        correlator.register(2, ApiKey::Metadata).unwrap();

        assert_eq!(correlator.resolve(2).unwrap(), ApiKey::Metadata);
        assert_eq!(correlator.resolve(1).unwrap(), ApiKey::Produce);
    }
}
