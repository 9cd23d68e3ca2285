use fixtures_api::{Match, Team};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const POINTS_PER_WIN: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub team_id: String,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub score_for: u32,
    pub score_against: u32,
}

impl Standing {
    fn new(team_id: &str) -> Self {
        Self { team_id: team_id.to_owned(), ..Self::default() }
    }

    pub fn differential(&self) -> i64 {
        i64::from(self.score_for) - i64::from(self.score_against)
    }
}

/// Points desc, then score differential desc, then wins desc. Team id breaks
/// any remaining tie so the order is stable.
fn compare(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.differential().cmp(&a.differential()))
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| a.team_id.cmp(&b.team_id))
}

/// Fold completed matches into a sorted table. Every approved team gets a row,
/// including those yet to play.
pub fn compute(teams: &[Team], matches: &[Match]) -> Vec<Standing> {
    let mut table: HashMap<&str, Standing> = teams
        .iter()
        .filter(|t| t.is_approved())
        .map(|t| (t.id.as_str(), Standing::new(&t.id)))
        .collect();

    for m in matches.iter().filter(|m| m.is_completed()) {
        let (Some(a), Some(b), Some(winner)) =
            (m.team_a.team_id(), m.team_b.team_id(), m.winner_team_id.as_deref())
        else {
            continue;
        };
        let score_a = m.score_a.unwrap_or_default();
        let score_b = m.score_b.unwrap_or_default();

        for (team, scored, conceded) in [(a, score_a, score_b), (b, score_b, score_a)] {
            let row = table.entry(team).or_insert_with(|| Standing::new(team));
            row.played += 1;
            row.score_for += scored;
            row.score_against += conceded;
            if team == winner {
                row.wins += 1;
                row.points += POINTS_PER_WIN;
            } else {
                row.losses += 1;
            }
        }
    }

    let mut rows: Vec<Standing> = table.into_values().collect();
    rows.sort_by(compare);
    rows
}
