//! Per-step global-context windowing
//!
//! For rollout step `k` with window length `W` and a context sequence of
//! `L` steps, the simulator sees the first `k + W` context rows followed by
//! `(L - 1) - (k + W)` rows of zeros, flattened into one `[1, (L - 1) * dim]`
//! row. The context length is itself a simulator input dimension, so the
//! vector length never changes between steps.

use crate::error::{RolloutError, RolloutResult};
use crate::simulation::states::{ContextVector, GlobalContext};

#[derive(Debug, Clone, Copy)]
pub struct ContextWindowBuilder<'a> {
    context: Option<&'a GlobalContext>,
    window: usize,
}

impl<'a> ContextWindowBuilder<'a> {
    pub fn new(context: Option<&'a GlobalContext>, window: usize) -> Self {
        Self { context, window }
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Number of rollout steps the context can drive: `L - W`
    pub fn max_steps(&self) -> Option<RolloutResult<usize>> {
        self.context.map(|ctx| {
            ctx.len()
                .checked_sub(self.window)
                .ok_or(RolloutError::ContextMisaligned {
                    context_len: ctx.len(),
                    window: self.window,
                    step: 0,
                })
        })
    }

    /// Rows of zero padding at `step`: `(L - 1) - (step + W)`.
    /// A negative value means the context does not cover the requested step.
    pub fn padding_len(&self, step: usize) -> RolloutResult<usize> {
        let ctx = match self.context {
            Some(ctx) => ctx,
            None => return Ok(0),
        };
        let misaligned = || RolloutError::ContextMisaligned {
            context_len: ctx.len(),
            window: self.window,
            step,
        };
        ctx.len()
            .checked_sub(1)
            .and_then(|usable| usable.checked_sub(step + self.window))
            .ok_or_else(misaligned)
    }

    /// Context vector for `step`, or `None` when the example has no context.
    pub fn build(&self, step: usize) -> RolloutResult<Option<ContextVector>> {
        let ctx = match self.context {
            Some(ctx) => ctx,
            None => return Ok(None),
        };
        let pad = self.padding_len(step)?;
        let known = ctx.prefix(step + self.window).ok_or_else(|| RolloutError::ContextMisaligned {
            context_len: ctx.len(),
            window: self.window,
            step,
        })?;

        let mut values = Vec::with_capacity(known.len() + pad * ctx.dim());
        values.extend_from_slice(known);
        values.resize(known.len() + pad * ctx.dim(), 0.0);

        Ok(Some(ContextVector::from_vec(values)))
    }

    /// Context used to resolve shapes before parameters are loaded:
    /// every row but the last, unpadded.
    pub fn warmup(&self) -> Option<ContextVector> {
        self.context
            .and_then(|ctx| ctx.prefix(ctx.len().saturating_sub(1)))
            .map(ContextVector::from_row_slice)
    }
}
