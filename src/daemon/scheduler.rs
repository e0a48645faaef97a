use crate::core::models::{FetchOutcome, Service};
use crate::core::retry::AuthRetryState;
use crate::core::settings::Settings;
use crate::daemon::polling::{Cadence, COUNTDOWN_TICK};
use crate::daemon::publisher::{
    self, DISABLED_TEXT, LOGIN_ERROR_TEXT, NOT_CONFIGURED_TEXT, WAITING_TEXT,
};
use crate::providers::{ProviderRegistry, Session};
use crate::ui::{Countdown, DisplaySurface, Frame, ServiceLine};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub enum SchedulerEvent {
    SetEnabled(Service, bool),
    SetInterval(Duration),
    CredentialsUpdated(ProviderRegistry),
    RestartAll,
    RefreshAll,
    TimerFired { service: Service, generation: u64 },
    FetchFinished(FetchReport),
    Shutdown,
}

pub struct FetchReport {
    pub service: Service,
    pub cycle: u64,
    pub session: Session,
    pub outcome: FetchOutcome,
}

struct PendingTimer {
    handle: JoinHandle<()>,
    generation: u64,
    due_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    cycle: u64,
    superseded: bool,
    drop_token: bool,
}

pub struct ServiceRuntime {
    service: Service,
    enabled: bool,
    display: String,
    // None while lent to a worker.
    session: Option<Session>,
    timer: Option<PendingTimer>,
    in_flight: Option<InFlight>,
    auth_retries: AuthRetryState,
}

impl ServiceRuntime {
    fn new(service: Service, enabled: bool) -> Result<Self> {
        Ok(Self {
            service,
            enabled,
            display: if enabled { WAITING_TEXT } else { DISABLED_TEXT }.to_string(),
            session: Some(Session::for_service(service)?),
            timer: None,
            in_flight: None,
            auth_retries: AuthRetryState::new(),
        })
    }

    #[cfg(test)]
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn next_run_at(&self) -> Option<DateTime<Local>> {
        self.timer.as_ref().map(|t| t.due_at)
    }

    #[cfg(test)]
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.token())
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
            tracing::debug!(service = ?self.service, generation = timer.generation, "Cancelled pending refresh");
        }
    }

    fn clear_token(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.clear_token();
        }
    }

    fn line(&self, now: DateTime<Local>) -> ServiceLine {
        let countdown = if self.is_fetching() {
            Some(Countdown::Refreshing)
        } else {
            self.next_run_at().map(|due_at| match (due_at - now).to_std() {
                Ok(remaining) if !remaining.is_zero() => Countdown::NextIn(remaining),
                _ => Countdown::Refreshing,
            })
        };

        ServiceLine {
            service: self.service,
            text: self.display.clone(),
            countdown,
        }
    }
}

pub struct Scheduler<D> {
    earnapp: ServiceRuntime,
    honeygain: ServiceRuntime,
    registry: ProviderRegistry,
    honeygain_interval: Duration,
    show_countdown: bool,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    display: D,
    next_generation: u64,
    next_cycle: u64,
}

impl<D: DisplaySurface> Scheduler<D> {
    pub fn new(
        settings: &Settings,
        registry: ProviderRegistry,
        display: D,
        events: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Result<Self> {
        Ok(Self {
            earnapp: ServiceRuntime::new(Service::EarnApp, settings.services.earnapp.enabled)?,
            honeygain: ServiceRuntime::new(Service::Honeygain, settings.services.honeygain.enabled)?,
            registry,
            honeygain_interval: settings.services.honeygain.interval(),
            show_countdown: settings.display.countdown,
            events,
            display,
            next_generation: 0,
            next_cycle: 0,
        })
    }

    pub fn runtime(&self, service: Service) -> &ServiceRuntime {
        match service {
            Service::EarnApp => &self.earnapp,
            Service::Honeygain => &self.honeygain,
        }
    }

    fn runtime_mut(&mut self, service: Service) -> &mut ServiceRuntime {
        match service {
            Service::EarnApp => &mut self.earnapp,
            Service::Honeygain => &mut self.honeygain,
        }
    }

    #[cfg(test)]
    pub fn honeygain_interval(&self) -> Duration {
        self.honeygain_interval
    }

    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SchedulerEvent>) {
        self.start();

        let mut tick = tokio::time::interval(COUNTDOWN_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if !self.handle_event(event) {
                        break;
                    }
                }
                _ = tick.tick() => {
                    let fired = self.fire_overdue_timers(Local::now());
                    if fired || self.show_countdown {
                        self.render();
                    }
                }
            }
        }

        self.shutdown();
    }

    pub fn start(&mut self) {
        tracing::info!(
            earnapp = self.earnapp.enabled,
            honeygain = self.honeygain.enabled,
            honeygain_interval_secs = self.honeygain_interval.as_secs(),
            "Starting scheduler"
        );

        for service in Service::ALL {
            if self.runtime(service).enabled {
                self.launch_fetch(service);
            }
        }
        self.render();
    }

    pub fn handle_event(&mut self, event: SchedulerEvent) -> bool {
        match event {
            SchedulerEvent::SetEnabled(service, enabled) => self.set_enabled(service, enabled),
            SchedulerEvent::SetInterval(interval) => self.set_honeygain_interval(interval),
            SchedulerEvent::CredentialsUpdated(registry) => {
                tracing::info!("Credentials updated");
                self.registry = registry;
                self.restart_all();
            }
            SchedulerEvent::RestartAll => self.restart_all(),
            SchedulerEvent::RefreshAll => self.refresh_all(),
            SchedulerEvent::TimerFired {
                service,
                generation,
            } => self.on_timer_fired(service, generation),
            SchedulerEvent::FetchFinished(report) => self.on_fetch_finished(report),
            SchedulerEvent::Shutdown => {
                tracing::info!("Scheduler shutting down");
                return false;
            }
        }

        self.render();
        true
    }

    pub fn frame(&self, now: DateTime<Local>) -> Frame {
        Frame {
            lines: Service::ALL
                .iter()
                .map(|s| self.runtime(*s))
                .filter(|rt| rt.enabled)
                .map(|rt| rt.line(now))
                .collect(),
        }
    }

    fn render(&mut self) {
        let frame = self.frame(Local::now());
        self.display.render(&frame);
    }

    fn shutdown(&mut self) {
        for service in Service::ALL {
            self.runtime_mut(service).cancel_timer();
        }
    }

    fn set_enabled(&mut self, service: Service, enabled: bool) {
        let rt = self.runtime_mut(service);

        if enabled {
            if !rt.enabled {
                tracing::info!(?service, "Service enabled");
                rt.enabled = true;
                rt.display = WAITING_TEXT.to_string();
            }
            if rt.timer.is_none() && rt.in_flight.is_none() {
                self.launch_fetch(service);
            }
            return;
        }

        if !rt.enabled {
            return;
        }

        tracing::info!(?service, "Service disabled");
        rt.enabled = false;
        rt.cancel_timer();
        rt.clear_token();
        if let Some(flight) = rt.in_flight.as_mut() {
            flight.drop_token = true;
        }
        rt.auth_retries.record_settled();
        rt.display = DISABLED_TEXT.to_string();
    }

    fn set_honeygain_interval(&mut self, interval: Duration) {
        if interval.is_zero() {
            tracing::warn!("Ignoring zero refresh interval");
            return;
        }

        tracing::info!(interval_secs = interval.as_secs(), "Honeygain interval changed");
        self.honeygain_interval = interval;

        let rt = &mut self.honeygain;
        if !rt.enabled {
            return;
        }

        rt.cancel_timer();
        if rt.in_flight.is_none() {
            self.launch_fetch(Service::Honeygain);
        }
    }

    fn restart_all(&mut self) {
        tracing::info!("Restarting both services");

        for service in Service::ALL {
            let rt = self.runtime_mut(service);
            rt.cancel_timer();
            rt.clear_token();
            rt.auth_retries.record_settled();

            if let Some(flight) = rt.in_flight.as_mut() {
                flight.superseded = true;
                continue;
            }

            if rt.enabled {
                rt.display = WAITING_TEXT.to_string();
                self.launch_fetch(service);
            }
        }
    }

    fn refresh_all(&mut self) {
        tracing::info!("Manual refresh requested");

        for service in Service::ALL {
            let rt = self.runtime_mut(service);
            if !rt.enabled || rt.in_flight.is_some() {
                continue;
            }
            rt.cancel_timer();
            self.launch_fetch(service);
        }
    }

    // Sleepers use the monotonic clock and miss suspends and clock jumps.
    fn fire_overdue_timers(&mut self, now: DateTime<Local>) -> bool {
        let mut fired = false;

        for service in Service::ALL {
            let rt = self.runtime_mut(service);
            let overdue = rt.timer.as_ref().is_some_and(|t| t.due_at <= now);
            if !overdue {
                continue;
            }

            tracing::info!(?service, "Refresh overdue, starting it now");
            rt.cancel_timer();
            if rt.enabled && rt.in_flight.is_none() {
                self.launch_fetch(service);
                fired = true;
            }
        }

        fired
    }

    fn on_timer_fired(&mut self, service: Service, generation: u64) {
        let rt = self.runtime_mut(service);

        let current = rt.timer.as_ref().is_some_and(|t| t.generation == generation);
        if !current {
            tracing::debug!(?service, generation, "Ignoring stale timer");
            return;
        }
        rt.timer = None;

        if rt.enabled && rt.in_flight.is_none() {
            self.launch_fetch(service);
        }
    }

    // Callers guarantee no pending timer and no fetch in flight.
    fn launch_fetch(&mut self, service: Service) {
        let Some(provider) = self.registry.get(service) else {
            tracing::warn!(?service, "No provider registered");
            return;
        };

        let cycle = self.next_cycle;
        self.next_cycle += 1;
        let events = self.events.clone();

        let rt = self.runtime_mut(service);
        debug_assert!(rt.timer.is_none() && rt.in_flight.is_none());

        if !provider.has_valid_credentials() {
            tracing::warn!(
                ?service,
                hint = provider.credential_error_hint(),
                "Skipping fetch: credentials missing"
            );
            rt.display = NOT_CONFIGURED_TEXT.to_string();
            self.schedule_next(service);
            return;
        }

        let Some(mut session) = rt.session.take() else {
            tracing::warn!(?service, "Session already lent out, not starting another fetch");
            return;
        };
        rt.in_flight = Some(InFlight {
            cycle,
            superseded: false,
            drop_token: false,
        });

        tracing::debug!(?service, cycle, "Fetch started");
        tokio::spawn(async move {
            let outcome = provider.refresh(&mut session).await;
            let report = FetchReport {
                service,
                cycle,
                session,
                outcome,
            };
            if events.send(SchedulerEvent::FetchFinished(report)).is_err() {
                tracing::debug!(?service, cycle, "Scheduler gone, dropping result");
            }
        });
    }

    fn on_fetch_finished(&mut self, report: FetchReport) {
        let FetchReport {
            service,
            cycle,
            mut session,
            outcome,
        } = report;
        let rt = self.runtime_mut(service);

        let Some(flight) = rt.in_flight.filter(|f| f.cycle == cycle) else {
            tracing::warn!(?service, cycle, "Ignoring result of unknown fetch");
            if rt.session.is_none() {
                rt.session = Some(session);
            }
            return;
        };
        rt.in_flight = None;

        if flight.drop_token {
            session.clear_token();
        }

        if flight.superseded || !rt.enabled {
            session.clear_token();
            rt.session = Some(session);
            tracing::debug!(?service, cycle, superseded = flight.superseded, "Discarding result");

            if flight.superseded && rt.enabled {
                rt.display = WAITING_TEXT.to_string();
                self.launch_fetch(service);
            }
            return;
        }

        if outcome == FetchOutcome::AuthExpired {
            session.clear_token();
            rt.session = Some(session);

            if rt.auth_retries.record_expired() {
                tracing::info!(
                    ?service,
                    attempt = rt.auth_retries.consecutive_expired(),
                    "Token expired, logging in again"
                );
                self.launch_fetch(service);
                return;
            }

            tracing::warn!(
                ?service,
                attempts = rt.auth_retries.consecutive_expired(),
                "Token keeps expiring, falling back to normal schedule"
            );
            rt.display = LOGIN_ERROR_TEXT.to_string();
        } else {
            rt.session = Some(session);
            rt.auth_retries.record_settled();

            if let Some(text) = publisher::display_text(&outcome) {
                rt.display = text;
            }
            if outcome.is_success() {
                tracing::info!(?service, balance = %rt.display, "Balance updated");
            } else {
                tracing::warn!(?service, ?outcome, "Fetch failed");
            }
        }

        self.schedule_next(service);
    }

    fn schedule_next(&mut self, service: Service) {
        let cadence = Cadence::for_service(service, self.honeygain_interval);
        let now = Local::now();
        let delay = cadence.delay_from(&now);
        let due_at = now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        let generation = self.next_generation;
        self.next_generation += 1;
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SchedulerEvent::TimerFired {
                service,
                generation,
            });
        });

        let rt = self.runtime_mut(service);
        rt.cancel_timer();
        rt.timer = Some(PendingTimer {
            handle,
            generation,
            due_at,
        });

        tracing::debug!(
            ?service,
            next_run = %due_at.format("%H:%M:%S"),
            delay_secs = delay.as_secs(),
            "Next refresh scheduled"
        );
    }
}
