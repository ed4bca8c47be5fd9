//! Network Connector
//!
//! IPX peering over the live command interface. Connection progress is
//! reported only through `network.ipx`, driven by the pending, fulfilled and
//! rejected phases of a connect attempt.

use crate::store::Store;
use jsdos_core::errors::non_empty_message;
use jsdos_core::{
    peering_endpoint, Action, DosError, DosResult, IpxStatus, NetworkError, NetworkType,
    PeeringPhase, IPX_PORT,
};
use tracing::{debug, info, warn};

/// Opens and closes peering links for one session
#[derive(Debug, Clone)]
pub struct NetworkConnector {
    store: Store,
}

impl NetworkConnector {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Connect the running instance to `room` through the relay at `address`
    ///
    /// Only an established link is rejected; a call made while another
    /// connect is still pending proceeds. Neither precondition failure
    /// touches the session. A result that arrives after the link was closed
    /// or the instance replaced is discarded with `NetworkError::Superseded`.
    pub async fn connect_peering(&self, room: &str, address: &str) -> DosResult<()> {
        let (ci, generation) =
            self.store
                .dispatch_checked(Action::Peering(PeeringPhase::Pending), |session, bridge| {
                    if session.network.ipx == IpxStatus::Connected {
                        return Err(NetworkError::AlreadyConnected.into());
                    }
                    match bridge.ci() {
                        Some(ci) if session.ci => Ok((ci, bridge.ci_generation())),
                        _ => Err(NetworkError::NotStarted.into()),
                    }
                })?;

        let endpoint = peering_endpoint(address, room);
        info!("Connecting IPX to {}", endpoint);
        let result = ci
            .network_connect(NetworkType::DosboxIpx, &endpoint, IPX_PORT)
            .await;
        drop(ci);

        let phase = match result {
            Ok(()) => PeeringPhase::Fulfilled,
            Err(_) => PeeringPhase::Rejected,
        };
        // The instance may be gone, or the link closed, by now
        self.store
            .dispatch_checked(Action::Peering(phase), |session, bridge| {
                if session.network.ipx.is_active() && bridge.ci_generation() == generation {
                    Ok(())
                } else {
                    debug!(
                        "Discarding IPX result for {} in status {:?}",
                        endpoint, session.network.ipx
                    );
                    Err(NetworkError::Superseded.into())
                }
            })?;

        result.map_err(|reason| {
            warn!("IPX connect to {} failed: {}", endpoint, reason);
            DosError::transport_failed(non_empty_message(reason))
        })
    }

    /// Close the peering link; safe to call in any state
    pub fn disconnect_peering(&self) -> DosResult<()> {
        self.store.dispatch(Action::DisconnectIpx)?;
        debug!("IPX disconnected");
        Ok(())
    }

    /// Current peering status
    pub fn status(&self) -> IpxStatus {
        self.store.with_state(|session| session.network.ipx)
    }
}
