//! Rank assignment for one record under one policy.
//!
//! [`Mapper::handle_ranking`] runs in two steps:
//!
//! 1. Translate the requested position (`first`, `last`, `middle`, an index)
//!    into a rank by taking the midpoint between the would-be neighbors.
//! 2. If the record is new or its rank changed, make sure no other group
//!    member holds that rank. Collisions are resolved by shifting a run of
//!    neighbors by one, or, when the rank space around the target is
//!    exhausted, by re-spacing the whole group evenly.
//!
//! Neighbor lookups and the group listing are cached for the lifetime of the
//! mapper. Bind a fresh mapper for every save; a mapper reused after a write
//! works from stale neighbor data.

use crate::{
    adapter::{Group, GroupStore, Neighbor, RankRange, Rankable},
    position::parse_index,
    Error, Position, Rank, RankBounds, RankPolicy,
};
use tracing::{debug, trace};

/// A record bound to a policy and the store holding its group.
pub struct Mapper<'a, R, S> {
    policy: &'a RankPolicy,
    record: &'a mut R,
    store: &'a mut S,
    group: Option<Group>,
    first: Option<Option<Neighbor>>,
    last: Option<Option<Neighbor>>,
    order: Option<Vec<Neighbor>>,
}

impl<'a, R, S> Mapper<'a, R, S>
where
    R: Rankable,
    S: GroupStore,
{
    pub(crate) fn new(policy: &'a RankPolicy, record: &'a mut R, store: &'a mut S) -> Self {
        Self {
            policy,
            record,
            store,
            group: None,
            first: None,
            last: None,
            order: None,
        }
    }

    pub fn policy(&self) -> &RankPolicy {
        self.policy
    }

    /// The target's current rank.
    pub fn rank(&self) -> Option<Rank> {
        self.record.rank(self.policy.column())
    }

    /// The target's pending position request.
    pub fn position(&self) -> Option<Position> {
        self.record.position(&self.policy.position_field())
    }

    /// Compute the target's rank and make it unique within the group.
    ///
    /// Sibling ranks may be rewritten directly in the store. The target's own
    /// rank is only set in memory; persisting it is up to the caller.
    pub fn handle_ranking(&mut self) -> Result<(), S::Error> {
        self.update_index_from_position()?;
        self.assure_unique_position()
    }

    /// Group member at zero-based `index` in rank order.
    pub fn current_at_position(&mut self, index: usize) -> Result<Option<Neighbor>, S::Error> {
        let group = Self::group_of(&mut self.group, self.policy, &*self.record);
        self.store.at_offset(group, index)
    }

    /// Re-space the whole group, target included, evenly across the bounds.
    ///
    /// Running it on a group that is already evenly spaced changes nothing.
    pub fn rebalance(&mut self) -> Result<(), S::Error> {
        self.rebalance_ranks()
    }

    fn update_index_from_position(&mut self) -> Result<(), S::Error> {
        let bounds = self.policy.bounds();
        let mut requested = self.position();

        loop {
            trace!(position = ?requested, rank = ?self.rank(), "translating position");

            requested = match requested {
                Some(Position::First) => match self.current_first()?.and_then(|n| n.rank) {
                    Some(first) => {
                        self.set_rank(RankBounds::midpoint(first, bounds.min()));
                        None
                    }
                    None => Some(Position::Middle),
                },
                Some(Position::Last) => match self.current_last()?.and_then(|n| n.rank) {
                    Some(last) => {
                        self.set_rank(RankBounds::midpoint(last, bounds.max()));
                        None
                    }
                    None => Some(Position::Middle),
                },
                Some(Position::Middle) => {
                    self.set_rank(bounds.median());
                    None
                }
                Some(Position::Text(raw)) => Some(Position::Index(parse_index(&raw))),
                Some(Position::Index(0)) => Some(Position::First),
                Some(Position::Index(index)) => {
                    let (lower, upper) = self.neighbors_at_position(index)?;
                    let min = lower.and_then(|n| n.rank).unwrap_or(bounds.min());
                    let max = upper.and_then(|n| n.rank).unwrap_or(bounds.max());
                    self.set_rank(RankBounds::midpoint(min, max));
                    None
                }
                None if self.rank().is_none() => Some(Position::Last),
                None => None,
            };

            if requested.is_none() {
                return Ok(());
            }
        }
    }

    fn assure_unique_position(&mut self) -> Result<(), S::Error> {
        let column = self.policy.column();
        if !(self.record.is_new() || self.record.rank_changed(column)) {
            return Ok(());
        }

        let bounds = self.policy.bounds();
        let rank = match self.rank() {
            Some(rank) if bounds.contains(rank) => rank,
            Some(rank) => {
                let clamped = rank.clamp(bounds.min(), bounds.max());
                debug!(rank, clamped, "rank outside bounds");
                self.set_rank(clamped);
                clamped
            }
            None => {
                self.set_rank(bounds.max());
                bounds.max()
            }
        };

        if self.current_at_rank(rank)?.is_some() {
            self.rearrange_ranks()?;
        }

        Ok(())
    }

    fn rearrange_ranks(&mut self) -> Result<(), S::Error> {
        let bounds = self.policy.bounds();
        let rank = self.rank().unwrap_or(bounds.max());
        let first = self.current_first()?.and_then(|n| n.rank);
        let last = self.current_last()?.and_then(|n| n.rank);

        match (first, last) {
            (Some(first), _) if first > bounds.min() && rank == bounds.max() => {
                debug!(rank, "making room at the top, shifting lower ranks down");
                self.shift(RankRange::AtMost(rank), -1)
            }
            (_, Some(last)) if last < bounds.max() - 1 && rank < last => {
                debug!(rank, "shifting ranks at or above target up");
                self.shift(RankRange::AtLeast(rank), 1)
            }
            (Some(first), _) if first > bounds.min() && rank > first => {
                debug!(rank, "shifting ranks below target down");
                self.shift(RankRange::Below(rank), -1)?;
                self.set_rank(rank - 1);
                Ok(())
            }
            _ => self.rebalance_ranks(),
        }
    }

    fn rebalance_ranks(&mut self) -> Result<(), S::Error> {
        let bounds = self.policy.bounds();
        let target = self.rank();
        let order = self.current_order()?;
        let total = order.len() + 2;

        // every member plus the target needs a rank of its own
        if order.len() >= bounds.capacity() {
            return Err(Error::GroupFull {
                members: order.len() + 1,
                capacity: bounds.capacity(),
            }
            .into());
        }

        debug!(members = order.len(), "rebalancing group");

        let group = Self::group_of(&mut self.group, self.policy, &*self.record);
        let mut placed = false;
        let mut written = 0usize;

        for slot in 1..total {
            let value = bounds.slot(slot, total);

            let member = if placed {
                &order[slot - 2]
            } else {
                match order.get(slot - 1) {
                    Some(member) if !reaches(member.rank, target) => member,
                    _ => {
                        self.record.set_rank(self.policy.column(), value);
                        placed = true;
                        continue;
                    }
                }
            };

            if member.rank != Some(value) {
                self.store.write_rank_silently(group, &member.id, value)?;
                written += 1;
            }
        }

        trace!(written, "rebalance complete");
        Ok(())
    }

    /// Lower and upper neighbors around logical position `index`.
    fn neighbors_at_position(
        &mut self,
        index: usize,
    ) -> Result<(Option<Neighbor>, Option<Neighbor>), S::Error> {
        if index == 0 {
            return Ok((None, self.current_first()?));
        }

        let group = Self::group_of(&mut self.group, self.policy, &*self.record);
        let mut window = self.store.at_offset_window(group, index - 1, 2)?.into_iter();

        match (window.next(), window.next()) {
            (Some(lower), upper) => Ok((Some(lower), upper)),
            (None, _) => Ok((self.current_last()?, None)),
        }
    }

    fn shift(&mut self, range: RankRange, delta: Rank) -> Result<(), S::Error> {
        let group = Self::group_of(&mut self.group, self.policy, &*self.record);
        let shifted = self.store.bulk_shift(group, range, delta)?;
        trace!(?range, delta, shifted, "bulk shift");
        Ok(())
    }

    fn set_rank(&mut self, rank: Rank) {
        self.record.set_rank(self.policy.column(), rank);
    }

    fn group_of<'g>(slot: &'g mut Option<Group>, policy: &RankPolicy, record: &R) -> &'g Group {
        slot.get_or_insert_with(|| policy.group_for(record))
    }

    fn current_first(&mut self) -> Result<Option<Neighbor>, S::Error> {
        if self.first.is_none() {
            let group = Self::group_of(&mut self.group, self.policy, &*self.record);
            self.first = Some(self.store.first(group)?);
        }
        Ok(self.first.clone().flatten())
    }

    fn current_last(&mut self) -> Result<Option<Neighbor>, S::Error> {
        if self.last.is_none() {
            let group = Self::group_of(&mut self.group, self.policy, &*self.record);
            self.last = Some(self.store.last(group)?);
        }
        Ok(self.last.clone().flatten())
    }

    fn current_order(&mut self) -> Result<Vec<Neighbor>, S::Error> {
        if self.order.is_none() {
            let group = Self::group_of(&mut self.group, self.policy, &*self.record);
            self.order = Some(self.store.ordered(group)?);
        }
        Ok(self.order.clone().unwrap_or_default())
    }

    fn current_at_rank(&mut self, rank: Rank) -> Result<Option<Neighbor>, S::Error> {
        let group = Self::group_of(&mut self.group, self.policy, &*self.record);
        self.store.at_rank(group, rank)
    }
}

/// Whether a member ranked `member` sits at or after a target ranked `target`.
fn reaches(member: Option<Rank>, target: Option<Rank>) -> bool {
    matches!((member, target), (Some(member), Some(target)) if member >= target)
}
