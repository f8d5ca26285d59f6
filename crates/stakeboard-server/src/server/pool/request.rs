use stakeboard::{BettingService, CustomerId, OfferId, RankedStake, Stake, Token};
use tokio::sync::oneshot;

/// A store operation plus the channel its result goes back on.
#[derive(Debug)]
pub enum Job {
    Session {
        customer_id: CustomerId,
        response: oneshot::Sender<Token>,
    },
    /// Resolves `token` to the customer of a live session, refreshing it.
    /// Answers `None` for an unauthenticated caller.
    Authenticate {
        token: String,
        response: oneshot::Sender<Option<CustomerId>>,
    },
    /// Answers whether the stake moved the offer's ranking.
    Stake {
        offer_id: OfferId,
        customer_id: CustomerId,
        stake: Stake,
        response: oneshot::Sender<bool>,
    },
    HighStakes {
        offer_id: OfferId,
        response: oneshot::Sender<Vec<RankedStake>>,
    },
}

impl Job {
    /// Executes the job. A dropped receiver only means the client went away.
    pub fn run(self, service: &BettingService) {
        match self {
            Self::Session {
                customer_id,
                response,
            } => {
                let _ = response.send(service.get_or_create_session(customer_id));
            }
            Self::Authenticate { token, response } => {
                let _ = response.send(service.validate_session(&token));
            }
            Self::Stake {
                offer_id,
                customer_id,
                stake,
                response,
            } => {
                let _ = response.send(service.submit_stake(offer_id, customer_id, stake));
            }
            Self::HighStakes { offer_id, response } => {
                let _ = response.send(service.top_stakes(offer_id));
            }
        }
    }
}

/// Messages a worker receives.
#[derive(Debug)]
pub enum WorkRequest {
    Job(Job),
    /// Stop after acknowledging on `response`.
    Shutdown { response: oneshot::Sender<()> },
}
