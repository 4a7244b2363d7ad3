use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::Role;

/// One of the four positions at the table
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Slot {
    RedAtt,
    RedDef,
    BlueAtt,
    BlueDef,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Red,
    Blue,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::RedAtt, Slot::RedDef, Slot::BlueAtt, Slot::BlueDef];

    pub fn side(self) -> Side {
        match self {
            Slot::RedAtt | Slot::RedDef => Side::Red,
            Slot::BlueAtt | Slot::BlueDef => Side::Blue,
        }
    }

    pub fn role(self) -> Role {
        match self {
            Slot::RedAtt | Slot::BlueAtt => Role::Offence,
            Slot::RedDef | Slot::BlueDef => Role::Defence,
        }
    }
}

/// Something held per slot: member ids, members, ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lineup<T> {
    pub red_att: T,
    pub red_def: T,
    pub blue_att: T,
    pub blue_def: T,
}

impl<T> Lineup<T> {
    pub fn new(red_att: T, red_def: T, blue_att: T, blue_def: T) -> Self {
        Self {
            red_att,
            red_def,
            blue_att,
            blue_def,
        }
    }

    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::RedAtt => &self.red_att,
            Slot::RedDef => &self.red_def,
            Slot::BlueAtt => &self.blue_att,
            Slot::BlueDef => &self.blue_def,
        }
    }

    pub fn as_ref(&self) -> Lineup<&T> {
        Lineup {
            red_att: &self.red_att,
            red_def: &self.red_def,
            blue_att: &self.blue_att,
            blue_def: &self.blue_def,
        }
    }

    /// Applies `f` to every slot, in `Slot::ALL` order.
    pub fn map<U>(self, mut f: impl FnMut(Slot, T) -> U) -> Lineup<U> {
        Lineup {
            red_att: f(Slot::RedAtt, self.red_att),
            red_def: f(Slot::RedDef, self.red_def),
            blue_att: f(Slot::BlueAtt, self.blue_att),
            blue_def: f(Slot::BlueDef, self.blue_def),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &T)> + '_ {
        Slot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    pub fn into_array(self) -> [(Slot, T); 4] {
        [
            (Slot::RedAtt, self.red_att),
            (Slot::RedDef, self.red_def),
            (Slot::BlueAtt, self.blue_att),
            (Slot::BlueDef, self.blue_def),
        ]
    }

    /// Exchanges the red and blue pairs, keeping each player's role.
    pub fn swapped(self) -> Self {
        Self {
            red_att: self.blue_att,
            red_def: self.blue_def,
            blue_att: self.red_att,
            blue_def: self.red_def,
        }
    }
}

impl<T> Lineup<Option<T>> {
    /// Resolves every slot or reports the first empty one.
    pub fn transpose(self) -> Result<Lineup<T>, Slot> {
        Ok(Lineup {
            red_att: self.red_att.ok_or(Slot::RedAtt)?,
            red_def: self.red_def.ok_or(Slot::RedDef)?,
            blue_att: self.blue_att.ok_or(Slot::BlueAtt)?,
            blue_def: self.blue_def.ok_or(Slot::BlueDef)?,
        })
    }
}

impl Lineup<i32> {
    pub fn red_total(&self) -> i64 {
        i64::from(self.red_att) + i64::from(self.red_def)
    }

    pub fn blue_total(&self) -> i64 {
        i64::from(self.blue_att) + i64::from(self.blue_def)
    }
}

/// Goals scored by each pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub red: i32,
    pub blue: i32,
}

impl Score {
    pub fn new(red: i32, blue: i32) -> Self {
        Self { red, blue }
    }

    pub fn is_negative(&self) -> bool {
        self.red < 0 || self.blue < 0
    }

    /// A 0-0 result is almost certainly a data-entry mistake.
    pub fn is_degenerate(&self) -> bool {
        self.red == 0 && self.blue == 0
    }

    pub fn goal_difference(&self) -> i64 {
        (i64::from(self.red) - i64::from(self.blue)).abs()
    }

    pub fn swapped(self) -> Self {
        Self {
            red: self.blue,
            blue: self.red,
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.red, self.blue)
    }
}
