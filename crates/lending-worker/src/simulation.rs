//! Concurrent reservation simulation.
//!
//! Many simulated members try to reserve the same item at nearly the same
//! moment. Each attempt is pushed into the dispatcher from its own task,
//! and the driver then collects every reply with a deadline.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time;
use tracing::{info, warn};

use lending_core::config::AppConfig;
use lending_core::config::DispatcherConfig;
use lending_core::error::{AppError, ErrorKind};
use lending_core::result::AppResult;
use lending_core::types::id::{ItemId, MemberId};
use lending_entity::member::NewMember;
use lending_registry::LibraryManager;

use crate::dispatcher::ReservationDispatcher;
use crate::request::{ReplyReceiver, ReservationRequest};

/// Knobs for one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Item every simulated member competes for.
    pub item_id: ItemId,
    /// Number of simulated members.
    pub attempts: usize,
    /// Worker pool size.
    pub workers: usize,
    /// Intake queue capacity.
    pub intake_capacity: usize,
    /// Id of the first simulated member.
    pub first_member_id: u64,
    /// Delay between launching consecutive producers.
    pub stagger: Duration,
    /// How long to wait for each reply.
    pub reply_timeout: Duration,
}

impl SimulationParams {
    /// Builds parameters from configuration for the given item.
    pub fn from_config(config: &AppConfig, item_id: ItemId) -> Self {
        Self {
            item_id,
            attempts: config.simulation.attempts,
            workers: config.dispatcher.workers,
            intake_capacity: config.dispatcher.intake_capacity,
            first_member_id: config.simulation.first_member_id,
            stagger: config.simulation.stagger(),
            reply_timeout: config.dispatcher.reply_timeout(),
        }
    }

    /// Id of the simulated member making attempt `index`.
    pub fn member_for(&self, index: usize) -> AppResult<MemberId> {
        u64::try_from(index)
            .ok()
            .and_then(|offset| self.first_member_id.checked_add(offset))
            .map(MemberId::new)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Simulated member {index} does not fit after id {}",
                    self.first_member_id
                ))
            })
    }

    fn dispatcher_config(&self) -> DispatcherConfig {
        // Rounded up so a sub-second timeout never reads as zero.
        let reply_timeout_seconds =
            u64::try_from(self.reply_timeout.as_millis().div_ceil(1000)).unwrap_or(u64::MAX);
        DispatcherConfig {
            workers: self.workers,
            intake_capacity: self.intake_capacity,
            reply_timeout_seconds,
        }
    }
}

/// What a simulated member observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReservationOutcome {
    /// The reservation went through.
    Reserved,
    /// The registry refused the reservation.
    Rejected {
        /// Error category.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
    /// No reply arrived before the deadline.
    NoResponse,
}

impl From<AppError> for ReservationOutcome {
    fn from(err: AppError) -> Self {
        Self::Rejected {
            kind: err.kind,
            message: err.message,
        }
    }
}

/// One attempt in a simulation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Simulated member.
    pub member_id: MemberId,
    /// What the member observed.
    #[serde(flatten)]
    pub outcome: ReservationOutcome,
}

/// Result of a simulation run, in member order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Contested item.
    pub item_id: ItemId,
    /// One entry per simulated member.
    pub attempts: Vec<AttemptReport>,
}

impl SimulationReport {
    /// Members whose reservation succeeded.
    pub fn winners(&self) -> Vec<MemberId> {
        self.attempts
            .iter()
            .filter(|a| a.outcome == ReservationOutcome::Reserved)
            .map(|a| a.member_id)
            .collect()
    }

    /// Number of attempts rejected with the given error kind.
    pub fn rejected_with(&self, kind: ErrorKind) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(&a.outcome, ReservationOutcome::Rejected { kind: k, .. } if *k == kind))
            .count()
    }

    /// Number of attempts that timed out.
    pub fn no_response(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome == ReservationOutcome::NoResponse)
            .count()
    }
}

/// Races `params.attempts` simulated members for one item through a fresh
/// worker pool, then shuts the pool down.
pub async fn run_simulation(
    manager: Arc<dyn LibraryManager>,
    params: &SimulationParams,
) -> AppResult<SimulationReport> {
    if params.attempts == 0 {
        return Err(AppError::validation("Simulation needs at least one attempt"));
    }
    let members = (0..params.attempts)
        .map(|index| params.member_for(index))
        .collect::<AppResult<Vec<_>>>()?;

    for &member_id in &members {
        match manager
            .add_member(NewMember::new(member_id, format!("SimMember-{member_id}")))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is(ErrorKind::Conflict) => {}
            Err(e) => return Err(e),
        }
    }

    info!(
        item_id = %params.item_id,
        attempts = params.attempts,
        workers = params.workers,
        "Starting reservation simulation"
    );

    let dispatcher = ReservationDispatcher::start(manager, &params.dispatcher_config());
    let mut replies: Vec<(MemberId, ReplyReceiver)> = Vec::with_capacity(params.attempts);
    let mut producers = Vec::with_capacity(params.attempts);

    for member_id in members {
        let (request, reply) = ReservationRequest::new(params.item_id, member_id);
        replies.push((member_id, reply));

        let intake = dispatcher.intake();
        producers.push(tokio::spawn(async move {
            if let Err(e) = intake.send(request).await {
                warn!(member_id = %member_id, error = %e, "Could not submit reservation");
            }
        }));

        if !params.stagger.is_zero() {
            time::sleep(params.stagger).await;
        }
    }

    let mut attempts = Vec::with_capacity(replies.len());
    for (member_id, reply) in replies {
        let outcome = match time::timeout(params.reply_timeout, reply).await {
            Ok(Ok(Ok(()))) => ReservationOutcome::Reserved,
            Ok(Ok(Err(e))) => ReservationOutcome::from(e),
            Ok(Err(_)) | Err(_) => ReservationOutcome::NoResponse,
        };
        attempts.push(AttemptReport { member_id, outcome });
    }

    dispatcher.shutdown().await;
    for producer in producers {
        if let Err(e) = producer.await {
            warn!(error = %e, "Reservation producer task failed");
        }
    }

    let report = SimulationReport {
        item_id: params.item_id,
        attempts,
    };
    info!(
        item_id = %report.item_id,
        winners = report.winners().len(),
        conflicts = report.rejected_with(ErrorKind::Conflict),
        no_response = report.no_response(),
        "Reservation simulation complete"
    );
    Ok(report)
}
