use std::sync::Arc;
use thiserror::Error;

use crate::config::LadderConfig;
use crate::event::EventBus;
use crate::rating::RatingError;
use crate::recalc::{RecalcError, RecalcService, StatsRecalculator};
use crate::repository::{LadderRepository, RepositoryError};
use crate::settlement::{Clock, MatchSettlement, SettlementError, SettlementService};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct LadderState {
    pub repository: Arc<dyn LadderRepository>,
    pub settlement: Arc<SettlementService>,
    pub recalc: Arc<RecalcService>,
    pub event_bus: EventBus,
    pub config: LadderConfig,
}

impl LadderState {
    pub fn new(
        repository: Arc<dyn LadderRepository>,
        clock: Arc<dyn Clock>,
        config: LadderConfig,
    ) -> Self {
        let event_bus = EventBus::new();
        let engine = MatchSettlement::new(clock, &config);

        let settlement = SettlementService::new(repository.clone(), engine.clone())
            .with_event_bus(event_bus.clone());
        let recalc = RecalcService::new(
            repository.clone(),
            StatsRecalculator::new(engine, config.starting_exp),
        )
        .with_event_bus(event_bus.clone());

        Self {
            repository,
            settlement: Arc::new(settlement),
            recalc: Arc::new(recalc),
            event_bus,
            config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Recalc(#[from] RecalcError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP-style status for callers that report errors over the wire
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Settlement(err) => settlement_status(err),
            AppError::Recalc(RecalcError::Settlement { source, .. }) => settlement_status(source),
            AppError::Recalc(RecalcError::Repository(err)) => repository_status(err),
            AppError::Recalc(RecalcError::UnknownMember { .. }) => 500,
            AppError::Repository(err) => repository_status(err),
            AppError::Ledger(_) => 400,
            AppError::Internal(_) => 500,
        }
    }
}

fn settlement_status(err: &SettlementError) -> u16 {
    match err {
        SettlementError::Rating(RatingError::InvalidScore { .. })
        | SettlementError::DegenerateScore
        | SettlementError::InvalidKFactor(_)
        | SettlementError::DuplicateMember { .. } => 400,
        SettlementError::MemberResolution { .. } => 406,
        SettlementError::MatchNotFound(_) => 404,
        SettlementError::CounterUnderflow { .. } => 409,
        SettlementError::Repository(err) => repository_status(err),
    }
}

fn repository_status(err: &RepositoryError) -> u16 {
    match err {
        RepositoryError::NotFound(_) => 404,
        RepositoryError::Conflict(_) => 409,
        RepositoryError::Storage(_) => 500,
    }
}
