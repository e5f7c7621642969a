//! Cancellation for collaborator calls

use crate::error::RegistryError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `operation` unless `cancel` fires first
///
/// An already-cancelled token short-circuits without polling `operation`.
///
/// # Errors
/// `RegistryError::Cancelled` if the token fires, otherwise the operation's own result.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, operation: F) -> Result<T, RegistryError>
where
    F: Future<Output = Result<T, RegistryError>>,
{
    if cancel.is_cancelled() {
        return Err(RegistryError::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RegistryError::Cancelled),
        result = operation => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let result = with_cancel(&cancel, async { Ok::<_, RegistryError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = with_cancel(&cancel, async { Ok::<_, RegistryError>(7) }).await;
        assert_eq!(result, Err(RegistryError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_pending_operation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = with_cancel(&cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, RegistryError>(())
        })
        .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
