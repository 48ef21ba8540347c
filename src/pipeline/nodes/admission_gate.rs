//! AdmissionGateNode — credit-based admission control.
//!
//! The gate owns the only mutable shared state of the pipeline, the capacity
//! counter. It is touched from a single thread only: offers and decrement
//! pulses both arrive as messages and are handled one at a time in a
//! `select!` loop, so no lock or atomic is needed.
//!
//! While an item is held the gate stops receiving offers. The source channel
//! is a rendezvous channel, so the source then blocks in `send` and at most
//! one matrix waits outside the pipeline.

use crate::pipeline::bridge::PipelineEvent;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::Tagged;
use crate::pipeline::node::StageContext;
use crate::pipeline::packet::{DecrementPulse, Matrix};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{never, select, Receiver, Sender};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("offered", PortKind::Matrix),
    PortDescriptor::input("decrement", PortKind::Decrement),
    PortDescriptor::output("admitted", PortKind::Matrix),
];

/// Free admission slots, always within `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityCounter {
    free: usize,
    max: usize,
}

impl CapacityCounter {
    pub fn new(max: NonZeroUsize) -> Self {
        Self {
            free: max.get(),
            max: max.get(),
        }
    }

    /// Take one slot if any is free.
    pub fn try_acquire(&mut self) -> bool {
        if self.free == 0 {
            return false;
        }
        self.free -= 1;
        true
    }

    /// Give one slot back. Returning more slots than were taken is a
    /// contract violation.
    pub fn release(&mut self) -> PipelineResult<()> {
        if self.free == self.max {
            return Err(PipelineError::CapacityOverflow { max: self.max });
        }
        self.free += 1;
        Ok(())
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.free
    }

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.max - self.free
    }

    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }
}

/// Counter plus the FIFO of items waiting for a slot.
#[derive(Debug)]
pub struct GateState<T> {
    counter: CapacityCounter,
    held: VecDeque<T>,
    peak_in_flight: usize,
}

impl<T> GateState<T> {
    pub fn new(max: NonZeroUsize) -> Self {
        Self {
            counter: CapacityCounter::new(max),
            held: VecDeque::new(),
            peak_in_flight: 0,
        }
    }

    /// Handle an offered item. Returns it back if it is admitted right away,
    /// otherwise it is held.
    pub fn offer(&mut self, item: T) -> Option<T> {
        if self.held.is_empty() && self.counter.try_acquire() {
            self.note_peak();
            Some(item)
        } else {
            self.held.push_back(item);
            None
        }
    }

    /// Handle a decrement pulse. The oldest held item, if any, takes over the
    /// returned slot and is returned for forwarding.
    pub fn release(&mut self) -> PipelineResult<Option<T>> {
        self.counter.release()?;
        match self.held.pop_front() {
            Some(item) => {
                self.counter.try_acquire();
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.counter.in_flight()
    }

    #[inline]
    pub fn held(&self) -> usize {
        self.held.len()
    }

    #[inline]
    pub fn counter(&self) -> CapacityCounter {
        self.counter
    }

    #[inline]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    /// Nothing admitted and nothing waiting.
    pub fn is_drained(&self) -> bool {
        self.held.is_empty() && self.counter.in_flight() == 0
    }

    fn note_peak(&mut self) {
        self.peak_in_flight = self.peak_in_flight.max(self.counter.in_flight());
    }
}

pub struct AdmissionGateNode {
    state: GateState<Arc<Matrix>>,
    offered: Receiver<Arc<Matrix>>,
    decrements: Receiver<DecrementPulse>,
    output: Sender<Arc<Matrix>>,
}

impl AdmissionGateNode {
    pub fn new(
        max_in_flight: NonZeroUsize,
        offered: Receiver<Arc<Matrix>>,
        decrements: Receiver<DecrementPulse>,
        output: Sender<Arc<Matrix>>,
    ) -> Self {
        Self {
            state: GateState::new(max_in_flight),
            offered,
            decrements,
            output,
        }
    }

    pub fn name(&self) -> &'static str {
        "admission_gate"
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    /// Runs until the source is exhausted and every admitted item has been
    /// returned through the feedback edge.
    pub fn run(mut self, ctx: &StageContext) -> PipelineResult<()> {
        let closed = never::<Arc<Matrix>>();
        let mut source_open = true;

        while source_open || !self.state.is_drained() {
            let offered = if source_open && self.state.held() == 0 {
                &self.offered
            } else {
                &closed
            };

            select! {
                recv(offered) -> msg => match msg {
                    Ok(matrix) => {
                        let item = matrix.item();
                        match self.state.offer(matrix) {
                            Some(matrix) => self.admit(ctx, matrix)?,
                            None => {
                                tracing::debug!(%item, "held at gate");
                                ctx.emit(PipelineEvent::Held { item });
                            }
                        }
                    }
                    Err(_) => {
                        tracing::debug!(in_flight = self.state.in_flight(), "source closed");
                        source_open = false;
                    }
                },
                recv(self.decrements) -> msg => match msg {
                    Ok(pulse) => {
                        let next = self.state.release()?;
                        tracing::debug!(item = %pulse.item, in_flight = self.state.in_flight(), "capacity returned");
                        ctx.emit(PipelineEvent::CapacityReturned {
                            item: pulse.item,
                            in_flight: self.state.in_flight(),
                        });
                        if let Some(matrix) = next {
                            self.admit(ctx, matrix)?;
                        }
                    }
                    Err(_) => {
                        return Err(PipelineError::FeedbackLost {
                            in_flight: self.state.in_flight(),
                        });
                    }
                },
            }
        }

        tracing::debug!(peak = self.state.peak_in_flight(), "gate drained");
        Ok(())
    }

    fn admit(&self, ctx: &StageContext, matrix: Arc<Matrix>) -> PipelineResult<()> {
        let item = matrix.item();
        let in_flight = self.state.in_flight();
        tracing::debug!(%item, in_flight, "admitted");
        ctx.emit(PipelineEvent::Admitted { item, in_flight });
        self.output
            .send(matrix)
            .map_err(|_| PipelineError::Disconnected(ctx.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::id::{ItemId, NodeId};
    use proptest::prelude::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_counter_bounds() {
        let mut c = CapacityCounter::new(nz(2));
        assert!(c.try_acquire());
        assert!(c.try_acquire());
        assert!(!c.try_acquire());
        assert_eq!(c.in_flight(), 2);
        c.release().unwrap();
        c.release().unwrap();
        assert!(matches!(
            c.release(),
            Err(PipelineError::CapacityOverflow { max: 2 })
        ));
        assert_eq!(c.free(), 2);
    }

    #[test]
    fn test_offer_admits_while_capacity_remains() {
        let mut gate = GateState::new(nz(2));
        assert_eq!(gate.offer('a'), Some('a'));
        assert_eq!(gate.offer('b'), Some('b'));
        assert_eq!(gate.offer('c'), None);
        assert_eq!(gate.held(), 1);
        assert_eq!(gate.in_flight(), 2);
    }

    #[test]
    fn test_release_forwards_oldest_held() {
        let mut gate = GateState::new(nz(1));
        assert_eq!(gate.offer(1), Some(1));
        assert_eq!(gate.offer(2), None);
        assert_eq!(gate.offer(3), None);

        assert_eq!(gate.release().unwrap(), Some(2));
        assert_eq!(gate.in_flight(), 1);
        assert_eq!(gate.release().unwrap(), Some(3));
        assert_eq!(gate.release().unwrap(), None);
        assert!(gate.is_drained());
    }

    #[test]
    fn test_release_without_admission_is_overflow() {
        let mut gate: GateState<()> = GateState::new(nz(3));
        assert!(gate.release().is_err());
    }

    #[test]
    fn test_stray_pulse_fails_the_gate() {
        let (_source, offered) = crossbeam_channel::unbounded::<Arc<Matrix>>();
        let (pulse_tx, pulses) = crossbeam_channel::unbounded();
        let (output, _admitted) = crossbeam_channel::unbounded();
        pulse_tx.send(DecrementPulse { item: ItemId(0) }).unwrap();

        let (ctx, _events) = StageContext::detached(NodeId(1), "admission_gate");
        let result = AdmissionGateNode::new(nz(1), offered, pulses, output).run(&ctx);
        assert!(matches!(
            result,
            Err(PipelineError::CapacityOverflow { max: 1 })
        ));
    }

    #[test]
    fn test_offer_does_not_jump_the_queue() {
        let mut gate = GateState::new(nz(1));
        gate.offer(1);
        gate.offer(2);
        // slot freed and immediately retaken by 2; a fresh offer must wait
        assert_eq!(gate.release().unwrap(), Some(2));
        assert_eq!(gate.offer(3), None);
    }

    proptest! {
        #[test]
        fn prop_in_flight_never_exceeds_max(
            max in 1usize..6,
            ops in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let mut gate = GateState::new(nz(max));
            let mut outstanding = 0usize;
            for offer in ops {
                if offer {
                    if gate.offer(()).is_some() {
                        outstanding += 1;
                    }
                } else if outstanding > 0 {
                    if gate.release().unwrap().is_none() {
                        outstanding -= 1;
                    }
                }
                prop_assert!(gate.in_flight() <= max);
                prop_assert_eq!(gate.in_flight(), outstanding);
                prop_assert!(gate.peak_in_flight() <= max);
            }
        }
    }
}
