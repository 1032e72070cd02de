//! Provisioning engine.
//!
//! [`Provisioner::run`] sequences one provisioning run:
//!
//! 1. registry load: rejected entries end `FAILED` without network I/O;
//! 2. gateway readiness wait (skipped in dry runs), run-fatal on timeout;
//! 3. per provider, concurrently: fetch → validate → synthesize → apply;
//! 4. per provider, failure-ratio decision and rollback;
//! 5. per provider, post-run verification against the gateway listing.
//!
//! The run deadline covers every step.  When it expires, outstanding work is
//! dropped and providers still in flight are reported `FAILED` without
//! rollback.

mod config;
mod report;

pub use config::EngineSettings;
pub use report::{ProviderReport, RunReport};

use crate::spec::validate;
use crate::synth::RouteSynthesizer;
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use routeplane_kernel::{
    GatewayAdmin, ProviderConfig, ProviderPhase, ProvisionError, ProvisionResult,
    ProvisioningState, RawProviderConfig, RouteDefinition, RouteFailure, SpecSource, TrustMode,
    registry,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Mutable record of one provider while the run is in progress.
///
/// Shared between the provider's future and the run loop so that a provider
/// abandoned at the deadline still reports how far it got.  Guards are never
/// held across an `.await`.
#[derive(Debug)]
struct ProviderRun {
    state: ProvisioningState,
    error: Option<(String, &'static str)>,
    trust: Option<TrustMode>,
    verified: Option<bool>,
    planned: Vec<RouteDefinition>,
}

impl ProviderRun {
    fn new(provider_id: &str) -> Self {
        Self {
            state: ProvisioningState::new(provider_id),
            error: None,
            trust: None,
            verified: None,
            planned: Vec::new(),
        }
    }

    fn advance(&mut self, next: ProviderPhase) -> ProvisionResult<()> {
        self.state.advance(next)
    }

    /// Move to `FAILED` (if not already terminal) and record `err`.
    fn fail(&mut self, err: &ProvisionError) {
        if !self.state.phase.is_terminal() {
            if let Err(e) = self.state.advance(ProviderPhase::Failed) {
                error!(provider = %self.state.provider_id, error = %e, "cannot mark provider failed");
            }
        }
        self.error = Some((err.to_string(), err.kind()));
    }

    fn into_report(self) -> ProviderReport {
        let (error, error_kind) = match self.error {
            Some((message, kind)) => (Some(message), Some(kind.to_string())),
            None => (None, None),
        };
        ProviderReport {
            state: self.state,
            error,
            error_kind,
            trust: self.trust,
            verified: self.verified,
            planned_routes: self.planned,
        }
    }
}

type SharedRun = Mutex<ProviderRun>;

/// Orchestrates registry, fetcher, synthesizer and gateway client.
pub struct Provisioner {
    gateway: Arc<dyn GatewayAdmin>,
    source: Arc<dyn SpecSource>,
    synthesizer: RouteSynthesizer,
    settings: EngineSettings,
}

impl Provisioner {
    pub fn new(
        gateway: Arc<dyn GatewayAdmin>,
        source: Arc<dyn SpecSource>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            gateway,
            source,
            synthesizer: RouteSynthesizer::new(settings.route_prefix.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn synthesizer(&self) -> &RouteSynthesizer {
        &self.synthesizer
    }

    /// Execute one run over `raw` provider entries.
    ///
    /// Never returns an error: every failure is recorded in the report, and
    /// run-fatal ones in [`RunReport::fatal`].
    pub async fn run(&self, raw: &[RawProviderConfig]) -> RunReport {
        let started = Instant::now();
        let deadline = started + self.settings.run_deadline();
        let dry_run = self.settings.dry_run;

        let load = registry::load(raw);
        info!(
            accepted = load.accepted.len(),
            rejected = load.rejected.len(),
            disabled = load.disabled.len(),
            dry_run,
            "provider registry loaded"
        );

        let mut reports = Vec::with_capacity(load.rejected.len() + load.accepted.len());
        for rejection in &load.rejected {
            warn!(provider = %rejection.label, error = %rejection.error, "provider configuration rejected");
            let mut run = ProviderRun::new(&rejection.label);
            if let Err(e) = run.advance(ProviderPhase::Validating) {
                error!(provider = %rejection.label, error = %e, "unexpected state transition failure");
            }
            run.fail(&ProvisionError::Config(rejection.error.clone()));
            reports.push(run.into_report());
        }

        let runs: Vec<(ProviderConfig, SharedRun)> = load
            .accepted
            .into_iter()
            .map(|provider| {
                let mut run = ProviderRun::new(&provider.id);
                if let Err(e) = run.advance(ProviderPhase::Validating) {
                    error!(provider = %provider.id, error = %e, "unexpected state transition failure");
                }
                (provider, Mutex::new(run))
            })
            .collect();

        let fatal = if runs.is_empty() {
            None
        } else if let Err(err) = self.await_gateway(deadline).await {
            error!(error = %err, "gateway not ready, aborting run");
            for (_, run) in &runs {
                run.lock().fail(&err);
            }
            Some(err.to_string())
        } else {
            self.process_all(&runs, deadline).await
        };

        reports.extend(runs.into_iter().map(|(_, run)| run.into_inner().into_report()));

        let report = RunReport {
            dry_run,
            providers: reports,
            disabled: load.disabled,
            fatal,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            succeeded = report.succeeded(),
            providers = report.providers.len(),
            duration_ms = report.duration_ms,
            "provisioning run finished"
        );
        report
    }

    /// Readiness wait, bounded by both the readiness timeout and the run deadline.
    async fn await_gateway(&self, deadline: Instant) -> ProvisionResult<()> {
        if self.settings.dry_run {
            debug!("dry run, skipping gateway readiness wait");
            return Ok(());
        }
        let wait = self.gateway.wait_ready(
            self.settings.ready_timeout(),
            self.settings.ready_poll_interval(),
        );
        match tokio::time::timeout_at(deadline, wait).await {
            Ok(result) => result,
            Err(_) => Err(ProvisionError::Timeout(
                "run deadline exceeded while waiting for gateway".to_string(),
            )),
        }
    }

    /// Drive every provider to a terminal phase; returns the run-fatal error, if any.
    async fn process_all(
        &self,
        runs: &[(ProviderConfig, SharedRun)],
        deadline: Instant,
    ) -> Option<String> {
        let workers = self.settings.max_concurrent_providers.max(1);
        let mut pending = std::pin::pin!(
            stream::iter(runs)
                .map(|(provider, run)| self.process(provider, run))
                .buffer_unordered(workers)
        );

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some(())) => {}
                Ok(None) => return None,
                Err(_) => break,
            }
        }

        let in_flight: Vec<&SharedRun> = runs
            .iter()
            .map(|(_, run)| run)
            .filter(|run| !run.lock().state.phase.is_terminal())
            .collect();
        if in_flight.is_empty() {
            // Only verification was still polling; outcomes are already final.
            warn!(
                deadline_ms = self.settings.run_deadline_ms,
                "run deadline reached during verification, leaving routes unverified"
            );
            return None;
        }

        let err = ProvisionError::Timeout("run deadline exceeded".to_string());
        error!(
            deadline_ms = self.settings.run_deadline_ms,
            in_flight = in_flight.len(),
            "run deadline exceeded, abandoning in-flight providers"
        );
        for run in in_flight {
            let mut guard = run.lock();
            warn!(provider = %guard.state.provider_id, phase = %guard.state.phase, "provider aborted at deadline");
            guard.fail(&err);
        }
        Some(err.to_string())
    }

    async fn process(&self, provider: &ProviderConfig, run: &SharedRun) {
        if let Err(err) = self.drive(provider, run).await {
            warn!(provider = %provider.id, kind = err.kind(), error = %err, "provider failed");
            run.lock().fail(&err);
        }
    }

    async fn drive(&self, provider: &ProviderConfig, run: &SharedRun) -> ProvisionResult<()> {
        run.lock().advance(ProviderPhase::Fetching)?;
        let fetched = self.source.fetch(provider).await?;
        if fetched.trust == TrustMode::Relaxed {
            warn!(provider = %provider.id, url = %fetched.url, "description document fetched with relaxed trust");
        }
        run.lock().trust = Some(fetched.trust);
        let operations = validate::validate(&fetched.body)?;

        run.lock().advance(ProviderPhase::Synthesizing)?;
        let routes = self.synthesizer.synthesize(provider, &operations);
        info!(provider = %provider.id, routes = routes.len(), "routes synthesized");

        if self.settings.dry_run {
            let mut guard = run.lock();
            guard.planned = routes.iter().map(RouteDefinition::redacted).collect();
            guard.advance(ProviderPhase::Planned)?;
            return Ok(());
        }

        run.lock().advance(ProviderPhase::Applying)?;
        self.apply(provider, run, &routes).await;

        let outcome = run.lock().state.apply_outcome();
        if outcome == ProviderPhase::RolledBack {
            self.rollback(provider, run).await;
        }
        {
            let mut guard = run.lock();
            guard.advance(outcome)?;
            info!(
                provider = %provider.id,
                phase = %outcome,
                attempted = guard.state.attempted.len(),
                succeeded = guard.state.succeeded.len(),
                failed = guard.state.failed.len(),
                "provider applied"
            );
        }

        self.verify(provider, run).await;
        Ok(())
    }

    /// Upsert every route with bounded concurrency, recording each outcome as it lands.
    async fn apply(&self, provider: &ProviderConfig, run: &SharedRun, routes: &[RouteDefinition]) {
        let workers = self.settings.max_concurrent_upserts.max(1);
        let mut upserts = std::pin::pin!(
            stream::iter(routes)
                .map(|route| {
                    run.lock().state.record_attempt(route.route_id.clone());
                    async move { (route, self.gateway.upsert_route(route).await) }
                })
                .buffer_unordered(workers)
        );

        while let Some((route, result)) = upserts.next().await {
            let mut guard = run.lock();
            match result {
                Ok(()) => guard.state.record_success(route.route_id.clone()),
                Err(err) => {
                    warn!(
                        provider = %provider.id,
                        route_id = %route.route_id,
                        operation = %route.operation_label(),
                        status = ?err.status_code(),
                        error = %err,
                        "route upsert failed"
                    );
                    guard.state.record_failure(RouteFailure {
                        route_id: route.route_id.clone(),
                        operation: route.operation_label(),
                        status: err.status_code(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    /// Delete every route this run created for the provider.  Best effort.
    async fn rollback(&self, provider: &ProviderConfig, run: &SharedRun) {
        let (created, ratio) = {
            let guard = run.lock();
            (guard.state.succeeded.clone(), guard.state.failure_ratio())
        };
        warn!(
            provider = %provider.id,
            failure_ratio = ratio,
            routes = created.len(),
            "failure ratio above threshold, rolling back"
        );

        let workers = self.settings.max_concurrent_upserts.max(1);
        let mut deletes = std::pin::pin!(
            stream::iter(&created)
                .map(|route_id| async move { (route_id, self.gateway.delete_route(route_id).await) })
                .buffer_unordered(workers)
        );
        while let Some((route_id, result)) = deletes.next().await {
            if let Err(err) = result {
                warn!(provider = %provider.id, route_id = %route_id, error = %err, "rollback delete failed");
            }
        }

        run.lock().state.rolled_back = true;
    }

    /// Poll the gateway listing until it reflects this run's outcome.
    ///
    /// Never changes the provider's phase; a mismatch only sets
    /// `verified = false`.
    async fn verify(&self, provider: &ProviderConfig, run: &SharedRun) {
        let attempts = self.settings.verify_attempts;
        if attempts == 0 {
            return;
        }

        let (present, absent): (Vec<String>, Vec<String>) = {
            let guard = run.lock();
            if guard.state.rolled_back {
                (Vec::new(), guard.state.succeeded.clone())
            } else {
                (guard.state.succeeded.clone(), Vec::new())
            }
        };
        let prefix = self.synthesizer.provider_prefix(&provider.id);

        let mut verified = false;
        for attempt in 1..=attempts {
            match self.gateway.list_routes(&prefix).await {
                Ok(listed) => {
                    let ids: HashSet<&str> = listed.iter().map(|r| r.route_id.as_str()).collect();
                    let missing = present.iter().filter(|id| !ids.contains(id.as_str())).count();
                    let lingering = absent.iter().filter(|id| ids.contains(id.as_str())).count();
                    if missing == 0 && lingering == 0 {
                        verified = true;
                        break;
                    }
                    debug!(provider = %provider.id, attempt, missing, lingering, "listing not converged yet");
                }
                Err(err) => {
                    debug!(provider = %provider.id, attempt, error = %err, "verification listing failed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.verify_interval()).await;
            }
        }

        if verified {
            debug!(provider = %provider.id, "gateway listing verified");
        } else {
            warn!(
                provider = %provider.id,
                attempts,
                "gateway listing does not reflect this run"
            );
        }
        run.lock().verified = Some(verified);
    }
}
