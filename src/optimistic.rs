use crate::realtime::Keyed;
use std::future::Future;

/// A local patch applied ahead of server confirmation. Keeps the original
/// record so the patch can be reverted if the server rejects it.
#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    original: T,
}

impl<T: Keyed + Clone> Optimistic<T> {
    /// Patch the record with `id` in place. `None` if it is not in the list.
    pub fn apply<F>(items: &mut [T], id: &str, patch: F) -> Option<Self>
    where
        F: FnOnce(&mut T),
    {
        let item = items.iter_mut().find(|item| item.key() == id)?;
        let original = item.clone();
        patch(item);
        Some(Self { original })
    }

    /// Keep the patch on success; put the original back on failure and
    /// hand the error to the caller.
    pub fn settle<E>(self, items: &mut Vec<T>, result: Result<(), E>) -> Result<(), E> {
        if let Err(e) = result {
            let id = self.original.key().to_string();
            match items.iter().position(|item| item.key() == id) {
                Some(index) => items[index] = self.original,
                None => items.insert(0, self.original),
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Apply `patch` locally, run `confirm` against the server, and revert on failure.
pub async fn apply_then_confirm<T, F, Fut, E>(
    items: &mut Vec<T>,
    id: &str,
    patch: F,
    confirm: Fut,
) -> Option<Result<(), E>>
where
    T: Keyed + Clone,
    F: FnOnce(&mut T),
    Fut: Future<Output = Result<(), E>>,
{
    let pending = Optimistic::apply(items, id, patch)?;
    let result = confirm.await;
    Some(pending.settle(items, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Raffle;

    fn raffles() -> Vec<Raffle> {
        vec![
            Raffle {
                id: "r1".to_string(),
                title: "Car".to_string(),
                status: Some("active".to_string()),
            },
            Raffle {
                id: "r2".to_string(),
                title: "Watch".to_string(),
                status: Some("active".to_string()),
            },
        ]
    }

    fn close(r: &mut Raffle) {
        r.status = Some("closed".to_string());
    }

    #[test]
    fn test_success_keeps_patch() {
        let mut items = raffles();
        let pending = Optimistic::apply(&mut items, "r2", close).unwrap();
        assert_eq!(items[1].status.as_deref(), Some("closed"));

        pending.settle(&mut items, Ok::<(), String>(())).unwrap();
        assert_eq!(items[1].status.as_deref(), Some("closed"));
    }

    #[test]
    fn test_failure_reverts_and_returns_error() {
        let mut items = raffles();
        let pending = Optimistic::apply(&mut items, "r1", close).unwrap();

        let err = pending
            .settle(&mut items, Err("permission denied".to_string()))
            .unwrap_err();
        assert_eq!(err, "permission denied");
        assert_eq!(items[0].status.as_deref(), Some("active"));
    }

    #[test]
    fn test_unknown_id_is_not_applied() {
        let mut items = raffles();
        assert!(Optimistic::apply(&mut items, "nope", close).is_none());
    }

    #[tokio::test]
    async fn test_apply_then_confirm_reverts_on_error() {
        let mut items = raffles();
        let result = apply_then_confirm(&mut items, "r1", close, async {
            Err::<(), _>("offline")
        })
        .await;

        assert_eq!(result, Some(Err("offline")));
        assert_eq!(items[0].status.as_deref(), Some("active"));
    }
}
