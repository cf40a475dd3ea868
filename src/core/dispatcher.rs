//! Serial event loop that owns the [`ExportSession`].
//!
//! Host events, fetch completions and export requests all arrive on one channel,
//! so the session is never touched concurrently. Selection fetches run as
//! separate tasks and post their result back with the ticket they were issued
//! for.

use crate::core::session::{ExportSession, FetchOutcome, SelectionTicket};
use crate::domain::model::{ExportArtifact, Notice, Row};
use crate::domain::ports::{Encoder, RecordSource};
use crate::utils::error::{ExportError, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

enum Command {
    Options(Value),
    Records(Vec<Value>),
    Selection(Option<Value>),
    FetchCompleted {
        ticket: SelectionTicket,
        result: Result<Value>,
    },
    Export {
        reply: oneshot::Sender<Result<Vec<ExportArtifact>>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    DismissNotice,
}

/// Read-only view of the session at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub selection: Option<Row>,
    pub notice: Option<Notice>,
    pub in_flight: usize,
}

impl SessionSnapshot {
    fn of(session: &ExportSession) -> Self {
        Self {
            columns: session.projection().columns().to_vec(),
            row_count: session.rows().len(),
            selection: session.selection().cloned(),
            notice: session.notice().cloned(),
            in_flight: session.in_flight(),
        }
    }
}

pub struct Dispatcher {
    session: ExportSession,
    source: Arc<dyn RecordSource>,
    encoders: Vec<Box<dyn Encoder>>,
    sender: mpsc::WeakUnboundedSender<Command>,
    receiver: mpsc::UnboundedReceiver<Command>,
    in_flight: watch::Sender<usize>,
}

impl Dispatcher {
    /// Start the loop on the current runtime. It stops once every handle is dropped.
    pub fn spawn(
        session: ExportSession,
        source: Arc<dyn RecordSource>,
        encoders: Vec<Box<dyn Encoder>>,
    ) -> (DispatcherHandle, JoinHandle<ExportSession>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (in_flight_tx, in_flight_rx) = watch::channel(session.in_flight());
        let dispatcher = Dispatcher {
            session,
            source,
            encoders,
            sender: tx.downgrade(),
            receiver: rx,
            in_flight: in_flight_tx,
        };

        let task = tokio::spawn(dispatcher.run());
        let handle = DispatcherHandle {
            sender: tx,
            in_flight: in_flight_rx,
        };
        (handle, task)
    }

    async fn run(mut self) -> ExportSession {
        tracing::debug!("Dispatcher started");

        while let Some(command) = self.receiver.recv().await {
            self.handle(command);

            let in_flight = self.session.in_flight();
            self.in_flight.send_if_modified(|current| {
                let changed = *current != in_flight;
                *current = in_flight;
                changed
            });
        }

        tracing::debug!("Dispatcher stopped");
        self.session
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Options(options) => self.session.apply_options(&options),
            Command::Records(records) => self.session.apply_records(&records),
            Command::Selection(record) => {
                if let Some(ticket) = self.session.select(record.as_ref()) {
                    self.spawn_fetch(ticket);
                }
            }
            Command::FetchCompleted { ticket, result } => {
                match self.session.complete_fetch(ticket, result) {
                    FetchOutcome::Applied => {
                        tracing::debug!("Selection updated from row {}", ticket.row_id)
                    }
                    FetchOutcome::Stale | FetchOutcome::Failed => {}
                }
            }
            Command::Export { reply } => {
                let result = self.session.export(&self.encoders);
                if let Err(e) = &result {
                    tracing::warn!("Export blocked: {}", e.user_friendly_message());
                }
                // 呼叫端已經放棄等待就不用回覆
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot::of(&self.session));
            }
            Command::DismissNotice => self.session.dismiss_notice(),
        }
    }

    fn spawn_fetch(&self, ticket: SelectionTicket) {
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();

        tokio::spawn(async move {
            // fetch 任務 panic 時也要回報，否則 in_flight 永遠不會歸零
            let fetch = tokio::spawn(async move { source.fetch_record(ticket.row_id).await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => Err(ExportError::host_call("fetch_record", e)),
            };

            match sender.upgrade() {
                Some(sender) => {
                    let _ = sender.send(Command::FetchCompleted { ticket, result });
                }
                None => tracing::debug!("Dispatcher gone, dropping fetch for row {}", ticket.row_id),
            }
        });
    }
}

/// Cloneable front of a running [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::UnboundedSender<Command>,
    in_flight: watch::Receiver<usize>,
}

impl DispatcherHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| ExportError::DispatcherClosed)
    }

    pub fn options_changed(&self, options: Value) -> Result<()> {
        self.send(Command::Options(options))
    }

    pub fn records_changed(&self, records: Vec<Value>) -> Result<()> {
        self.send(Command::Records(records))
    }

    pub fn selection_changed(&self, record: Option<Value>) -> Result<()> {
        self.send(Command::Selection(record))
    }

    pub fn dismiss_notice(&self) -> Result<()> {
        self.send(Command::DismissNotice)
    }

    /// Export whatever is current when the request is reached. Two calls run two
    /// independent encodes.
    pub async fn export(&self) -> Result<Vec<ExportArtifact>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Export { reply })?;
        rx.await.map_err(|_| ExportError::DispatcherClosed)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| ExportError::DispatcherClosed)
    }

    /// Wait until no selection fetch is outstanding.
    ///
    /// The snapshot round trip makes sure every event sent before this call has
    /// been applied before the fetch count is read.
    pub async fn idle(&self) -> Result<SessionSnapshot> {
        let mut in_flight = self.in_flight.clone();
        loop {
            let snapshot = self.snapshot().await?;
            if snapshot.in_flight == 0 {
                return Ok(snapshot);
            }
            in_flight
                .wait_for(|count| *count == 0)
                .await
                .map_err(|_| ExportError::DispatcherClosed)?;
        }
    }
}
