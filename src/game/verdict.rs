use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_PRAISE_THRESHOLD: i64 = 865;

const TAUNTS: &[&str] = &[
    "Is that all you've got?",
    "You're hitting like a feather!",
    "Is the bag too heavy for you?",
    "Are you even trying?",
    "I've seen toddlers hit harder!",
    "You call that a punch?",
    "Come on, put some muscle into it!",
    "Were you aiming for a fly?",
    "You're going to need more than that!",
    "Maybe boxing isn't your sport!",
    "That was weak!",
    "Are you sure you're awake?",
    "Is your grandma punching for you?",
    "I've seen pillows hit harder!",
    "Was that a punch or a pat?",
];

const PRAISES: &[&str] = &[
    "You're a powerhouse!",
    "Now that's a punch!",
    "You're unstoppable!",
    "Keep it up, champ!",
    "You're on fire!",
    "That's some serious power!",
    "You're dominating the game!",
    "Impressive hit!",
    "You have fists of steel!",
    "Boxing legend in the making!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Taunt,
    Praise,
}

impl Tier {
    pub fn for_force(force: i64, praise_threshold: i64) -> Self {
        if force > praise_threshold {
            Tier::Praise
        } else {
            Tier::Taunt
        }
    }

    fn lines(self) -> &'static [&'static str] {
        match self {
            Tier::Taunt => TAUNTS,
            Tier::Praise => PRAISES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub tier: Tier,
    pub line: &'static str,
}

pub fn judge<R: Rng + ?Sized>(force: i64, praise_threshold: i64, rng: &mut R) -> Verdict {
    let tier = Tier::for_force(force, praise_threshold);
    let line = tier.lines().choose(rng).copied().unwrap_or_default();
    Verdict { tier, line }
}
