use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{
    remote::{RemoteClient, RemoteError},
    signal::Envelope,
};

/// Where the poll loop gets pending signals from.
///
/// Implementations must resolve promptly with [`RemoteError::Cancelled`] (or
/// whatever error the abort produced) once `cancel` fires.
pub trait SignalSource: Clone + Send + Sync + 'static {
    fn next_signal(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Option<Envelope>, RemoteError>> + Send;
}

impl SignalSource for RemoteClient {
    fn next_signal(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Option<Envelope>, RemoteError>> + Send {
        self.fetch_pending(cancel)
    }
}
