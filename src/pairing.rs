use crate::error::{ScheduleError, ScheduleResult};
use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPairs<T> {
    /// 1-based.
    pub round: u32,
    pub pairs: Vec<(T, T)>,
}

/// Every team meets every other team once.
///
/// An odd roster gets a bye slot so each round has a sitting-out team; pairs
/// against the bye are dropped. The first team stays fixed while the rest
/// rotate one position per round. Pair orientation flips with the pair index
/// so home/away designation is spread out. Deterministic for a given order.
pub fn round_robin<T: Clone>(teams: &[T]) -> Vec<RoundPairs<T>> {
    let mut slots: Vec<Option<&T>> = teams.iter().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();
    if n < 2 {
        return Vec::new();
    }

    let mut rounds = Vec::with_capacity(n - 1);
    for round in 0..n - 1 {
        let pairs = (0..n / 2)
            .filter_map(|i| match (slots[i], slots[n - 1 - i]) {
                (Some(a), Some(b)) if i % 2 == 0 => Some((a.clone(), b.clone())),
                (Some(a), Some(b)) => Some((b.clone(), a.clone())),
                _ => None,
            })
            .collect();
        rounds.push(RoundPairs { round: round as u32 + 1, pairs });
        slots[1..].rotate_right(1);
    }
    rounds
}

/// Shuffle once, then pair neighbours (0–1, 2–3, …).
///
/// The caller guarantees a power-of-two entry count; an unpaired leftover is
/// reported as a configuration error.
pub fn knockout<T, R>(entries: &[T], rng: &mut R) -> ScheduleResult<Vec<(T, T)>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if entries.len() % 2 == 1 {
        return Err(ScheduleError::configuration(format!(
            "cannot pair {} knockout entries: one would be left without an opponent",
            entries.len()
        )));
    }
    let mut order = entries.to_vec();
    order.shuffle(rng);

    let mut pairs = Vec::with_capacity(order.len() / 2);
    let mut iter = order.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        pairs.push((a, b));
    }
    Ok(pairs)
}
