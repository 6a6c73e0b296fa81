/// Shot ordering: which frame each weapon starts its sequence on
use super::FiringEvent;
use constants::animation::MAX_SEQUENCES_PER_SCHEDULE;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Order in which weapons fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum FiringOrder {
    RightToLeft,
    TopToBottom,
    #[default]
    FrontToBack,
    LeftToRight,
    BottomToTop,
    BackToFront,
    Random,
    AllAtOnce,
}

impl FiringOrder {
    pub const ALL: [FiringOrder; 8] = [
        FiringOrder::FrontToBack,
        FiringOrder::Random,
        FiringOrder::AllAtOnce,
        FiringOrder::BackToFront,
        FiringOrder::TopToBottom,
        FiringOrder::BottomToTop,
        FiringOrder::LeftToRight,
        FiringOrder::RightToLeft,
    ];

    /// Numeric preset code: 0..=2 sort an axis descending, 3..=5 ascending,
    /// -1 random, -2 all at once
    pub fn code(self) -> i32 {
        match self {
            FiringOrder::RightToLeft => 0,
            FiringOrder::TopToBottom => 1,
            FiringOrder::FrontToBack => 2,
            FiringOrder::LeftToRight => 3,
            FiringOrder::BottomToTop => 4,
            FiringOrder::BackToFront => 5,
            FiringOrder::Random => -1,
            FiringOrder::AllAtOnce => -2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            FiringOrder::RightToLeft => "Right to Left",
            FiringOrder::TopToBottom => "Top to Bottom",
            FiringOrder::FrontToBack => "Front to Back",
            FiringOrder::LeftToRight => "Left to Right",
            FiringOrder::BottomToTop => "Bottom to Top",
            FiringOrder::BackToFront => "Back to Front",
            FiringOrder::Random => "Random",
            FiringOrder::AllAtOnce => "All at once",
        }
    }

    /// Sort axis and direction for the positional orders
    fn sort_axis(self) -> Option<(usize, bool)> {
        match self.code() {
            code @ 0..=2 => Some((code as usize, false)),
            code @ 3..=5 => Some((code as usize - 3, true)),
            _ => None,
        }
    }
}

impl fmt::Display for FiringOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FiringOrder {
    type Err = String;

    /// Accepts preset names in any case with spaces, dashes or underscores, or a numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return Self::from_code(code).ok_or_else(|| format!("unknown firing order code {code}"));
        }
        let key = |name: &str| -> String {
            name.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect()
        };
        let wanted = key(s);
        Self::ALL
            .into_iter()
            .find(|o| key(o.name()) == wanted)
            .ok_or_else(|| format!("unknown firing order {s:?}"))
    }
}

impl TryFrom<String> for FiringOrder {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Start offsets of every event. An event's lifecycle state at frame `f` is `f + offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    offsets: Vec<i32>,
    total_frames: usize,
    sequence_len: usize,
}

impl Schedule {
    /// Spread `events` over the animation so that on average `N / (min(N*L, 5L) - L + 1)`
    /// shots share a start frame
    pub fn new<R: Rng + ?Sized>(
        events: &[FiringEvent],
        order: FiringOrder,
        sequence_len: usize,
        rng: &mut R,
    ) -> Schedule {
        let n = events.len();
        let len = sequence_len.max(1);
        let mut offsets = vec![0i32; n];

        if order == FiringOrder::AllAtOnce || n == 0 {
            return Schedule {
                offsets,
                total_frames: len,
                sequence_len: len,
            };
        }

        let indices: Vec<usize> = match order.sort_axis() {
            Some((axis, ascending)) => {
                let mut idx: Vec<usize> = (0..n).collect();
                idx.sort_by_key(|&i| events[i].origin[axis]);
                if !ascending {
                    idx.reverse();
                }
                idx
            }
            None => {
                let mut idx: Vec<usize> = (0..n).collect();
                idx.shuffle(rng);
                idx
            }
        };

        // Shot credit is counted in 1/available units so the spacing stays exact.
        let max_spaced = (n * len).min(MAX_SEQUENCES_PER_SCHEDULE * len);
        let available = max_spaced - len + 1;

        let mut start = 0i32;
        let mut credit = n;
        let mut next = 0;
        'spacing: loop {
            while credit < available {
                credit += n;
                start -= 1;
            }
            while credit >= available {
                offsets[indices[next]] = start;
                next += 1;
                if next >= n {
                    break 'spacing;
                }
                credit -= available;
            }
        }

        Schedule {
            offsets,
            total_frames: start.unsigned_abs() as usize + len,
            sequence_len: len,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Sprite frame of `event` at animation frame `frame`, `None` before it fires and after it ends
    pub fn state(&self, event: usize, frame: usize) -> Option<usize> {
        let state = *self.offsets.get(event)? as i64 + frame as i64;
        (0..self.sequence_len as i64).contains(&state).then_some(state as usize)
    }
}
