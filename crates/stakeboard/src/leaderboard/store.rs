use super::ranking::TopStakes;
use crate::{
    CustomerId, HistoryPolicy, LeaderboardConfig, OfferId, RankedStake, Result, Stake,
    hash::slot_index,
};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Stakes one customer placed on one offer.
#[derive(Debug)]
struct StakeRecord {
    max: Stake,
    history: Vec<Stake>,
}

impl StakeRecord {
    fn new(stake: Stake, policy: HistoryPolicy) -> Self {
        let history = match policy {
            HistoryPolicy::MaxOnly => Vec::new(),
            HistoryPolicy::Full => vec![stake],
        };
        Self {
            max: stake,
            history,
        }
    }

    /// Returns whether `stake` is a new maximum.
    fn record(&mut self, stake: Stake, policy: HistoryPolicy) -> bool {
        if policy == HistoryPolicy::Full {
            self.history.push(stake);
        }
        if stake <= self.max {
            return false;
        }
        self.max = stake;
        true
    }
}

type Segment = Mutex<HashMap<CustomerId, StakeRecord>>;

/// Per-offer state: lock segments owning the stake records, plus the
/// published ranking.
#[derive(Debug)]
struct OfferBoard {
    segments: Box<[Segment]>,
    ranking: ArcSwap<TopStakes>,
}

impl OfferBoard {
    fn new(segment_count: usize) -> Self {
        Self {
            segments: (0..segment_count)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
            ranking: ArcSwap::from_pointee(TopStakes::default()),
        }
    }

    fn segment(&self, customer_id: CustomerId) -> &Segment {
        &self.segments[slot_index(customer_id, self.segments.len())]
    }

    /// Publishes `row` into the ranking. Must be called while holding the
    /// customer's segment lock so the customer's row has a single writer.
    fn publish(&self, row: RankedStake, capacity: usize) -> bool {
        if !self.ranking.load().admits(&row, capacity) {
            return false;
        }
        let mut published = false;
        self.ranking.rcu(|current| match current.promote(row, capacity) {
            Some(next) => {
                published = true;
                Arc::new(next)
            }
            None => {
                published = false;
                Arc::clone(current)
            }
        });
        published
    }
}

/// Per-offer top stakes.
///
/// Each offer is created on its first stake. Writers lock only the segment
/// their customer hashes to, record the stake, and publish a new personal
/// maximum into the offer's ranking. The ranking is an immutable snapshot
/// swapped atomically, so readers never lock and concurrent writers from
/// different segments cannot lose each other's rows.
#[derive(Debug)]
pub struct Leaderboard {
    offers: DashMap<OfferId, Arc<OfferBoard>>,
    config: LeaderboardConfig,
}

impl Leaderboard {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    ///
    /// [`Error::InvalidConfig`]: crate::Error::InvalidConfig
    pub fn new(config: LeaderboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            offers: DashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &LeaderboardConfig {
        &self.config
    }

    /// Offers that have received at least one stake.
    pub fn offer_count(&self) -> usize {
        self.offers.len()
    }

    fn board(&self, offer_id: OfferId) -> Option<Arc<OfferBoard>> {
        self.offers.get(&offer_id).map(|board| Arc::clone(board.value()))
    }

    fn board_or_insert(&self, offer_id: OfferId) -> Arc<OfferBoard> {
        if let Some(board) = self.board(offer_id) {
            return board;
        }
        let entry = self
            .offers
            .entry(offer_id)
            .or_insert_with(|| Arc::new(OfferBoard::new(self.config.segment_count)));
        Arc::clone(entry.value())
    }

    /// Records `stake` from `customer_id` on `offer_id`.
    ///
    /// Returns `true` when the stake changed the offer's ranking. Every stake
    /// is recorded, but only a new personal maximum can move the ranking.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn submit_stake(&self, offer_id: OfferId, customer_id: CustomerId, stake: Stake) -> bool {
        let board = self.board_or_insert(offer_id);
        let mut segment = board.segment(customer_id).lock();

        let new_max = match segment.entry(customer_id) {
            Entry::Vacant(entry) => {
                entry.insert(StakeRecord::new(stake, self.config.history));
                true
            }
            Entry::Occupied(mut entry) => entry.get_mut().record(stake, self.config.history),
        };
        if !new_max {
            return false;
        }

        let changed = board.publish(RankedStake::new(customer_id, stake), self.config.capacity);

        #[cfg(feature = "tracing")]
        tracing::trace!(offer_id, customer_id, stake, changed, "new personal maximum");

        changed
    }

    /// The offer's ranking, best first. Empty for an unknown offer.
    pub fn top_stakes(&self, offer_id: OfferId) -> Vec<RankedStake> {
        self.board(offer_id)
            .map(|board| board.ranking.load().rows().to_vec())
            .unwrap_or_default()
    }

    /// The customer's highest stake on the offer.
    pub fn max_stake(&self, offer_id: OfferId, customer_id: CustomerId) -> Option<Stake> {
        let board = self.board(offer_id)?;
        let segment = board.segment(customer_id).lock();
        segment.get(&customer_id).map(|record| record.max)
    }

    /// Every stake the customer placed on the offer, oldest first.
    ///
    /// Only available under [`HistoryPolicy::Full`]; returns `None` otherwise.
    pub fn stake_history(&self, offer_id: OfferId, customer_id: CustomerId) -> Option<Vec<Stake>> {
        if self.config.history != HistoryPolicy::Full {
            return None;
        }
        let board = self.board(offer_id)?;
        let segment = board.segment(customer_id).lock();
        segment.get(&customer_id).map(|record| record.history.clone())
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self {
            offers: DashMap::new(),
            config: LeaderboardConfig::default(),
        }
    }
}
