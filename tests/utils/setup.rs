use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use foosball_ladder::{
    repository::{InMemoryLadderRepository, LadderRepository},
    settlement::FixedClock,
    LadderConfig, LadderState, Lineup, MatchInput, Member, MemberId, TeamId,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct LadderSetup {
    pub state: LadderState,
    pub repository: Arc<InMemoryLadderRepository>,
    pub team: TeamId,
    pub members: Vec<Member>,
}

impl LadderSetup {
    pub fn member(&self, username: &str) -> MemberId {
        self.members
            .iter()
            .find(|m| m.username == username)
            .map(|m| m.id)
            .unwrap_or_else(|| panic!("no member named {username}"))
    }

    /// Lineup from usernames in red attack, red defence, blue attack, blue defence order
    pub fn lineup(&self, names: [&str; 4]) -> Lineup<MemberId> {
        let [ra, rd, ba, bd] = names.map(|name| self.member(name));
        Lineup::new(ra, rd, ba, bd)
    }

    pub fn input(&self, names: [&str; 4], red: i32, blue: i32) -> MatchInput {
        MatchInput::new(self.lineup(names), red, blue)
    }

    pub async fn stored(&self, username: &str) -> Member {
        self.repository
            .get_member(self.member(username))
            .await
            .expect("repository read should succeed")
            .expect("member should be stored")
    }

    pub async fn total_exp(&self) -> i64 {
        let mut total = 0;
        for member in &self.members {
            total += i64::from(self.stored(&member.username).await.exp());
        }
        total
    }
}

/// Instant the fixed test clock reports
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
}

pub fn minutes_after_epoch(minutes: i64) -> DateTime<Utc> {
    epoch() + Duration::minutes(minutes)
}

pub struct LadderSetupBuilder {
    players: Vec<String>,
    config: LadderConfig,
}

impl LadderSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            config: LadderConfig::default(),
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "charlie", "david"])
    }

    pub fn with_six_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "charlie", "david", "erin", "frank"])
    }

    pub fn with_config(mut self, config: LadderConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> LadderSetup {
        let repository = Arc::new(InMemoryLadderRepository::new());
        let team = TeamId::new();

        let mut members = Vec::with_capacity(self.players.len());
        for name in &self.players {
            let member = Member::new(team, name.as_str(), self.config.starting_exp);
            repository.insert_member(member.clone()).await.unwrap();
            members.push(member);
        }

        let state = LadderState::new(
            repository.clone(),
            Arc::new(FixedClock(epoch())),
            self.config,
        );

        LadderSetup {
            state,
            repository,
            team,
            members,
        }
    }
}
