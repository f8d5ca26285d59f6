use crate::{CustomerId, Stake};
use core::{cmp::Ordering, fmt};

/// One row of an offer's ranking: a customer and their highest stake.
///
/// Rows order by stake descending, then by customer id ascending, so sorting a
/// slice of them yields the leaderboard directly.
///
/// ```
/// use stakeboard::RankedStake;
///
/// let mut rows = vec![
///     RankedStake::new(3, 100),
///     RankedStake::new(1, 250),
///     RankedStake::new(2, 100),
/// ];
/// rows.sort();
/// assert_eq!(rows, [RankedStake::new(1, 250), RankedStake::new(2, 100), RankedStake::new(3, 100)]);
/// assert_eq!(rows[0].to_string(), "1=250");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedStake {
    pub customer_id: CustomerId,
    pub stake: Stake,
}

impl RankedStake {
    pub const fn new(customer_id: CustomerId, stake: Stake) -> Self {
        Self { customer_id, stake }
    }
}

impl Ord for RankedStake {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .stake
            .cmp(&self.stake)
            .then_with(|| self.customer_id.cmp(&other.customer_id))
    }
}

impl PartialOrd for RankedStake {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RankedStake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.customer_id, self.stake)
    }
}

/// Immutable, sorted top-K snapshot of one offer.
///
/// Holds at most one row per customer. A snapshot is never mutated once
/// published; writers derive the next one with [`TopStakes::promote`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TopStakes {
    rows: Vec<RankedStake>,
}

impl TopStakes {
    pub(crate) fn rows(&self) -> &[RankedStake] {
        &self.rows
    }

    /// Whether promoting `row` could change this snapshot.
    ///
    /// Rows only ever move up, so the cut-off of a full snapshot never drops:
    /// a row rejected here is rejected by every later snapshot too.
    pub(crate) fn admits(&self, row: &RankedStake, capacity: usize) -> bool {
        self.rows.len() < capacity
            || self.rows.last().is_some_and(|last| row < last)
            || self.position_of(row.customer_id).is_some()
    }

    /// Returns the snapshot with `row` replacing the customer's current row,
    /// trimmed to `capacity`, or `None` when nothing would change.
    pub(crate) fn promote(&self, row: RankedStake, capacity: usize) -> Option<Self> {
        let mut rows = self.rows.clone();
        if let Some(pos) = self.position_of(row.customer_id) {
            if rows[pos].stake >= row.stake {
                return None;
            }
            rows.remove(pos);
        }

        let at = rows.binary_search(&row).unwrap_or_else(|at| at);
        if at >= capacity {
            return None;
        }
        rows.insert(at, row);
        rows.truncate(capacity);
        Some(Self { rows })
    }

    fn position_of(&self, customer_id: CustomerId) -> Option<usize> {
        self.rows.iter().position(|r| r.customer_id == customer_id)
    }
}
