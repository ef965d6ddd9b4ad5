use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::QuizError;
use crate::game::{GameConfig, GameSummary};

const BUILTIN: &[&str] = &[
    include_str!("../games/bitcoin-boom.json"),
    include_str!("../games/bitcoin-quest.json"),
    include_str!("../games/bitcoin-treasure-hunt.json"),
    include_str!("../games/boomer-policy-simulator.json"),
    include_str!("../games/bretton-woods-collapse.json"),
    include_str!("../games/crypto-escape-room.json"),
    include_str!("../games/dollar-dilemma.json"),
    include_str!("../games/fourth-turning.json"),
    include_str!("../games/great-inflation.json"),
    include_str!("../games/historical-echoes.json"),
    include_str!("../games/millennial-escape.json"),
    include_str!("../games/time-machine.json"),
    include_str!("../games/triffin-dilemma.json"),
];

/// Read-only set of games keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    games: BTreeMap<String, Arc<GameConfig>>,
}

impl Catalog {
    /// The games compiled into the binary.
    pub fn builtin() -> Result<Self, QuizError> {
        Self::from_sources(BUILTIN)
    }

    pub fn from_sources(sources: &[&str]) -> Result<Self, QuizError> {
        let mut games = BTreeMap::new();
        for raw in sources {
            let game = GameConfig::from_json(raw)?;
            games.insert(game.id.clone(), Arc::new(game));
        }
        Ok(Self { games })
    }

    pub fn list(&self) -> Vec<GameSummary> {
        self.games.values().map(|g| g.summary()).collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<GameConfig>> {
        self.games.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
