use rand::Rng;
use series_scraper::table::Candidate;
use tracing::info;

use crate::sent_log::SentLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every candidate has already been posted.
    Exhausted,
    Picked(Candidate),
}

/// Picks one candidate uniformly at random among those whose id is not in
/// the sent log.
pub fn select_unsent<R: Rng + ?Sized>(
    candidates: Vec<Candidate>,
    sent: &SentLog,
    rng: &mut R,
) -> Selection {
    let mut unsent: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !sent.contains(&c.id))
        .collect();

    if unsent.is_empty() {
        return Selection::Exhausted;
    }

    info!(available = unsent.len(), already_sent = sent.len(), "found unsent series");
    let picked = unsent.swap_remove(rng.random_range(0..unsent.len()));
    info!(id = %picked.id, name = %picked.name, "picked series");
    Selection::Picked(picked)
}
