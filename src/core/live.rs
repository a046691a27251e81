//! Runs a `MatchSession` on its own task.
//!
//! The task is the only writer. Front-end commands, the match clock and the
//! raid countdown are branches of one `select!`, so the clocks are
//! cancelled together with the session and can never act on a superseded
//! state. Each clock is armed only while it has something to count.

use crate::core::raid::RaidOutcome;
use crate::core::session::{Control, MatchSession, RaidEntry};
use crate::core::setup::Registration;
use crate::domain::model::{MatchState, MatchStatus, TeamId};
use crate::utils::error::{Result, ScorerError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, Interval, MissedTickBehavior};

pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 32;

enum Request {
    AddPlayer {
        team: TeamId,
        name: String,
        phone_number: Option<String>,
        reply: oneshot::Sender<Result<Registration>>,
    },
    Control {
        control: Control,
        reply: oneshot::Sender<Result<()>>,
    },
    SubmitRaid {
        entry: RaidEntry,
        reply: oneshot::Sender<Result<RaidOutcome>>,
    },
}

enum Command {
    Request(Request),
    Shutdown { reply: oneshot::Sender<()> },
}

#[derive(Debug, Clone)]
pub struct LiveMatchHandle {
    tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<MatchState>,
}

impl LiveMatchHandle {
    pub fn snapshot(&self) -> MatchState {
        self.state_rx.borrow().clone()
    }

    /// Receives every state the session moves through.
    pub fn subscribe(&self) -> watch::Receiver<MatchState> {
        self.state_rx.clone()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Request,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Request(make(reply)))
            .await
            .map_err(|_| ScorerError::SessionClosed)?;
        response.await.map_err(|_| ScorerError::SessionClosed)?
    }

    pub async fn add_player(
        &self,
        team: TeamId,
        name: impl Into<String>,
        phone_number: Option<String>,
    ) -> Result<Registration> {
        let name = name.into();
        self.request(|reply| Request::AddPlayer {
            team,
            name,
            phone_number,
            reply,
        })
        .await
    }

    pub async fn control(&self, control: Control) -> Result<()> {
        self.request(|reply| Request::Control { control, reply })
            .await
    }

    pub async fn submit_raid(&self, entry: RaidEntry) -> Result<RaidOutcome> {
        self.request(|reply| Request::SubmitRaid { entry, reply })
            .await
    }

    /// Stops the clocks and waits for pending saves to land.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| ScorerError::SessionClosed)?;
        done.await.map_err(|_| ScorerError::SessionClosed)
    }
}

fn ticker() -> Interval {
    let mut ticker = interval(CLOCK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

struct Driver {
    session: MatchSession,
    state_tx: watch::Sender<MatchState>,
}

impl Driver {
    fn publish(&self) {
        self.state_tx.send_replace(self.session.state().clone());
    }

    fn clock_running(&self) -> bool {
        self.session.state().status == MatchStatus::Playing
    }

    fn raid_running(&self) -> bool {
        matches!(self.session.state().raid_timer, Some(remaining) if remaining > 0)
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::AddPlayer {
                team,
                name,
                phone_number,
                reply,
            } => {
                // The directory round-trip holds the loop. Rosters are built
                // during setup, when neither clock is armed.
                let result = self
                    .session
                    .add_player(team, &name, phone_number.as_deref())
                    .await;
                self.publish();
                let _ = reply.send(result);
            }
            Request::Control { control, reply } => {
                let result = self.session.control(control);
                self.publish();
                let _ = reply.send(result);
            }
            Request::SubmitRaid { entry, reply } => {
                let result = self.session.submit_raid(entry);
                self.publish();
                let _ = reply.send(result);
            }
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut clock = ticker();
        let mut raid_clock = ticker();
        let mut clock_armed = false;
        let mut raid_armed = false;

        loop {
            let clock_wanted = self.clock_running();
            if clock_wanted && !clock_armed {
                clock.reset();
            }
            clock_armed = clock_wanted;

            let raid_wanted = self.raid_running();
            if raid_wanted && !raid_armed {
                raid_clock.reset();
            }
            raid_armed = raid_wanted;

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.session.flush().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(Command::Request(request)) => self.handle(request).await,
                    None => {
                        self.session.flush().await;
                        break;
                    }
                },
                _ = clock.tick(), if clock_armed => {
                    if let Err(e) = self.session.tick() {
                        tracing::error!("Clock tick failed: {}", e);
                    }
                    self.publish();
                }
                _ = raid_clock.tick(), if raid_armed => {
                    if let Err(e) = self.session.raid_tick() {
                        tracing::error!("Raid countdown failed: {}", e);
                    }
                    self.publish();
                }
            }
        }

        tracing::debug!("Live match {} stopped", self.session.match_id());
    }
}

pub struct LiveMatch;

impl LiveMatch {
    pub fn spawn(session: MatchSession) -> LiveMatchHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(session.state().clone());
        let driver = Driver { session, state_tx };
        tokio::spawn(driver.run(rx));
        LiveMatchHandle { tx, state_rx }
    }
}
