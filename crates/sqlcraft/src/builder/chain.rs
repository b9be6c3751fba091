//! Persistent frame lists.
//!
//! A [`Chain`] is a singly linked list of shared frames, newest first. Pushing
//! allocates a new head that points at the old one, so every previously
//! returned chain stays valid and unchanged. Replay walks the list once,
//! then applies the frames oldest first to a fresh accumulator.

use crate::error::SqlResult;
use std::sync::Arc;

type Delta<Q> = Arc<dyn Fn(&mut Q) -> SqlResult<()> + Send + Sync>;

struct Frame<Q> {
    delta: Delta<Q>,
    parent: Option<Arc<Frame<Q>>>,
}

impl<Q> Drop for Frame<Q> {
    // Unlink uniquely owned ancestors one at a time so dropping a long chain
    // does not recurse once per frame.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(frame) = next {
            match Arc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.parent.take(),
                Err(_) => break,
            }
        }
    }
}

pub(crate) struct Chain<Q> {
    head: Option<Arc<Frame<Q>>>,
    len: usize,
}

impl<Q> Clone for Chain<Q> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<Q> Default for Chain<Q> {
    fn default() -> Self {
        Self { head: None, len: 0 }
    }
}

impl<Q> Chain<Q> {
    /// A new chain with `delta` recorded after every existing frame.
    pub(crate) fn push<F>(&self, delta: F) -> Self
    where
        F: Fn(&mut Q) -> SqlResult<()> + Send + Sync + 'static,
    {
        Self {
            head: Some(Arc::new(Frame {
                delta: Arc::new(delta),
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Fold every frame into `base`, oldest first. Stops at the first error.
    pub(crate) fn replay(&self, mut base: Q) -> SqlResult<Q> {
        let mut frames = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_deref();
        while let Some(frame) = cursor {
            frames.push(&frame.delta);
            cursor = frame.parent.as_deref();
        }

        for (_index, delta) in frames.into_iter().rev().enumerate() {
            if let Err(err) = delta(&mut base) {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "sqlcraft.builder", frame = _index, error = %err, "chain replay failed");
                return Err(err);
            }
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlError;

    #[test]
    fn replay_applies_oldest_first() {
        let chain = Chain::<Vec<u32>>::default()
            .push(|v| {
                v.push(1);
                Ok(())
            })
            .push(|v| {
                v.push(2);
                Ok(())
            });
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.replay(Vec::new()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn branches_do_not_see_each_other() {
        let base = Chain::<Vec<u32>>::default().push(|v| {
            v.push(0);
            Ok(())
        });
        let left = base.push(|v| {
            v.push(1);
            Ok(())
        });
        let right = base.push(|v| {
            v.push(2);
            Ok(())
        });
        assert_eq!(base.replay(Vec::new()).unwrap(), vec![0]);
        assert_eq!(left.replay(Vec::new()).unwrap(), vec![0, 1]);
        assert_eq!(right.replay(Vec::new()).unwrap(), vec![0, 2]);
    }

    #[test]
    fn first_error_stops_replay() {
        let chain = Chain::<Vec<u32>>::default()
            .push(|_| Err(SqlError::construction("first")))
            .push(|_| Err(SqlError::construction("second")));
        let err = chain.replay(Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), SqlError::construction("first").to_string());
    }

    #[test]
    fn long_chains_fold_and_drop() {
        let mut chain = Chain::<u64>::default();
        for _ in 0..200_000 {
            chain = chain.push(|n| {
                *n += 1;
                Ok(())
            });
        }
        assert_eq!(chain.replay(0).unwrap(), 200_000);
        drop(chain);
    }
}
