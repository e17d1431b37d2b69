//! Pure projections from chain data and wall-clock time to what the user sees.

use crate::types::{
    Direction,
    Prediction,
    PredictionId,
    StakeEntry,
    StakePosition,
    wei_to_coin,
};
use alloy::primitives::U256;
use chrono::Utc;
use std::fmt;

/// `percentChange` on chain is percent × 100.
pub const BASIS_POINT_SCALE: f64 = 10_000.0;

pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

pub fn calculated_predicted_price(
    current_price: f64,
    percent_change_bps: u64,
    direction: Direction,
) -> f64 {
    let fraction = percent_change_bps as f64 / BASIS_POINT_SCALE;
    match direction {
        Direction::Up => current_price * (1.0 + fraction),
        Direction::Down => current_price * (1.0 - fraction),
    }
}

/// Direction implied by the numbers, regardless of the stored label.
pub fn actual_direction(
    current_price: f64,
    percent_change_bps: u64,
    direction: Direction,
) -> Direction {
    if calculated_predicted_price(current_price, percent_change_bps, direction) > current_price
    {
        Direction::Up
    } else {
        Direction::Down
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRemaining {
    Expired,
    Left { hours: u64, minutes: u64 },
}

impl TimeRemaining {
    pub fn until(expires_at: u64, now: u64) -> Self {
        match expires_at.checked_sub(now) {
            None | Some(0) => TimeRemaining::Expired,
            Some(seconds) => TimeRemaining::Left {
                hours: seconds / 3600,
                minutes: (seconds % 3600) / 60,
            },
        }
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRemaining::Expired => write!(f, "Expired"),
            TimeRemaining::Left { hours, minutes } if *hours > 0 => {
                write!(f, "{hours}h {minutes}m")
            }
            TimeRemaining::Left { minutes, .. } => write!(f, "{minutes}m"),
        }
    }
}

pub fn is_claimable(prediction: &Prediction, position: &StakePosition, now: u64) -> bool {
    prediction.verified
        && prediction.expires_at > 0
        && prediction.expires_at < now
        && position.has_stake()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedPredictionView {
    pub calculated_predicted_price: f64,
    pub actual_direction: Direction,
    pub time_remaining: TimeRemaining,
    pub is_claimable: bool,
}

pub fn project(
    prediction: &Prediction,
    position: &StakePosition,
    now: u64,
) -> DerivedPredictionView {
    let current_price = wei_to_coin(prediction.current_price);
    DerivedPredictionView {
        calculated_predicted_price: calculated_predicted_price(
            current_price,
            prediction.percent_change_bps,
            prediction.direction,
        ),
        actual_direction: actual_direction(
            current_price,
            prediction.percent_change_bps,
            prediction.direction,
        ),
        time_remaining: TimeRemaining::until(prediction.expires_at, now),
        is_claimable: is_claimable(prediction, position, now),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoardRow {
    pub entry: StakeEntry,
    pub view: DerivedPredictionView,
}

impl BoardRow {
    pub fn id(&self) -> PredictionId {
        self.entry.prediction.id
    }
}

/// The viewer's predictions, newest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StakeBoard {
    rows: Vec<BoardRow>,
}

impl StakeBoard {
    pub fn project(entries: Vec<StakeEntry>, now: u64) -> Self {
        let mut rows: Vec<BoardRow> = entries
            .into_iter()
            .map(|entry| {
                let view = project(&entry.prediction, &entry.position, now);
                BoardRow { entry, view }
            })
            .collect();
        rows.sort_by(|a, b| b.id().cmp(&a.id()));
        Self { rows }
    }

    pub fn rows(&self) -> &[BoardRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&BoardRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn claimable(&self) -> impl Iterator<Item = &BoardRow> {
        self.rows.iter().filter(|row| row.view.is_claimable)
    }

    pub fn find(&self, id: PredictionId) -> Option<&BoardRow> {
        self.rows.iter().find(|row| row.id() == id)
    }
}

pub fn format_coin(wei: U256) -> String {
    format!("{:.4}", wei_to_coin(wei))
}

pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

pub fn format_percent_bps(bps: u64) -> String {
    format!("{}.{:02}", bps / 100, bps % 100)
}
