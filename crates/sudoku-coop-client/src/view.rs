//! A mounted puzzle: room state plus everything that feeds it.
//!
//! [`PuzzleView`] owns the channel, the HTTP tasks started on the room's
//! behalf and the poll timer. All of them live exactly as long as the view:
//! [`PuzzleView::close`] tears them down in order, and dropping the view
//! without closing still shuts the channel and aborts the tasks.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use sudoku_coop_core::protocol::SolutionResponse;
use sudoku_coop_core::{
    ClientEvent, EditRejected, LocalEdit, Puzzle, PuzzleId, PuzzleRoom, RoomUpdate, Session,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::net::{ApiClient, ChannelEvent, PuzzleChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Online,
    Reconnecting { attempt: u32, delay: Duration },
    Offline,
}

/// Something the screen may need to redraw for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Room(RoomUpdate),
    Status(ConnectionStatus),
    Notice(String),
    /// The backend rejected the credential; the session is no longer usable.
    AuthFailed(String),
}

enum ViewTask {
    Refreshed(Result<Puzzle>),
    Checked(Result<SolutionResponse>),
    Persisted { edit: LocalEdit, result: Result<()> },
}

pub struct PuzzleView {
    room: PuzzleRoom,
    api: ApiClient,
    channel: PuzzleChannel,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    tasks: JoinSet<ViewTask>,
    poll: Interval,
    fetching: bool,
    checking: bool,
    focused: Option<(u8, u8)>,
    status: ConnectionStatus,
    notice: Option<String>,
}

impl PuzzleView {
    /// Mount the puzzle: connect the channel and start polling. The first
    /// poll tick fires immediately and loads the board.
    pub fn open(config: &ClientConfig, session: &Session, api: ApiClient, puzzle_id: PuzzleId) -> Self {
        let (channel, events) = PuzzleChannel::open(config, puzzle_id, session);
        let mut poll = tokio::time::interval(config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(puzzle_id, "puzzle view opened");

        Self {
            room: PuzzleRoom::new(puzzle_id, session.identity().clone()),
            api,
            channel,
            events,
            tasks: JoinSet::new(),
            poll,
            fetching: false,
            checking: false,
            focused: None,
            status: ConnectionStatus::Connecting,
            notice: None,
        }
    }

    pub fn puzzle_id(&self) -> PuzzleId {
        self.room.puzzle_id()
    }

    pub fn room(&self) -> &PuzzleRoom {
        &self.room
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn focused(&self) -> Option<(u8, u8)> {
        self.focused
    }

    /// Wait for the next change from the channel, a finished request or the
    /// poll timer.
    pub async fn next(&mut self) -> ViewUpdate {
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => {
                    if let Some(update) = self.on_channel(event) {
                        return update;
                    }
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Ok(task) => {
                            if let Some(update) = self.on_task(task) {
                                return update;
                            }
                        }
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => warn!(error = %e, "puzzle task failed"),
                    }
                }
                _ = self.poll.tick() => self.refresh(),
            }
        }
    }

    /// Re-read the puzzle and its solution status. Each request is skipped
    /// while the previous one of its kind is still running.
    pub fn refresh(&mut self) {
        let puzzle_id = self.puzzle_id();
        if !self.fetching {
            self.fetching = true;
            let api = self.api.clone();
            self.tasks
                .spawn(async move { ViewTask::Refreshed(api.get_puzzle(puzzle_id).await) });
        }
        if !self.checking {
            self.checking = true;
            let api = self.api.clone();
            self.tasks
                .spawn(async move { ViewTask::Checked(api.get_solution(puzzle_id).await) });
        }
    }

    /// Requests of each kind currently in flight: (puzzle, solution).
    pub fn refreshes_in_flight(&self) -> (bool, bool) {
        (self.fetching, self.checking)
    }

    /// Optimistically set a cell and persist it in the background.
    pub fn edit(&mut self, x: u8, y: u8, value: Option<u8>) -> std::result::Result<(), EditRejected> {
        let edit = self.room.edit(x, y, value)?;
        debug!(seq = edit.seq, x, y, ?value, "local edit");
        let api = self.api.clone();
        let puzzle_id = self.puzzle_id();
        self.tasks.spawn(async move {
            let result = api.move_piece(puzzle_id, &edit).await;
            ViewTask::Persisted { edit, result }
        });
        Ok(())
    }

    /// Move focus to a cell, releasing the previous one.
    pub fn focus(&mut self, x: u8, y: u8) {
        if self.focused == Some((x, y)) && self.room.locks.held() == Some((x, y)) {
            return;
        }
        self.blur();
        self.focused = Some((x, y));
        if let Some(event) = self.room.focus(x, y) {
            self.send(event);
        }
    }

    pub fn blur(&mut self) {
        self.focused = None;
        if let Some(event) = self.room.blur() {
            self.send(event);
        }
    }

    /// Send the draft as a chat message. Blank drafts are left alone.
    pub fn send_chat(&mut self, draft: &mut String) -> bool {
        match self.room.send_chat(draft) {
            Some(event) => {
                self.send(event);
                true
            }
            None => false,
        }
    }

    /// Release the held cell, leave the puzzle and stop every background job.
    pub async fn close(mut self) {
        if let Some(event) = self.room.blur() {
            self.send(event);
        }
        self.tasks.abort_all();
        let puzzle_id = self.puzzle_id();
        self.channel.close().await;
        info!(puzzle_id, "puzzle view closed");
    }

    fn send(&self, event: ClientEvent) {
        if let Err(e) = self.channel.send(event) {
            debug!(error = %e, "channel gone, event dropped");
        }
    }

    /// Claim the focused cell once the board it sits on has loaded.
    fn reclaim_focus(&mut self) {
        if self.room.locks.held().is_none() {
            self.announce_focus();
        }
    }

    /// Send `add_lock` for the focused cell. After a reconnect this runs
    /// even if the cell counts as held: a lock taken while offline never
    /// reached the server.
    fn announce_focus(&mut self) {
        let Some((x, y)) = self.focused else {
            return;
        };
        if let Some(event) = self.room.focus(x, y) {
            self.send(event);
        }
    }

    fn on_channel(&mut self, event: ChannelEvent) -> Option<ViewUpdate> {
        match event {
            ChannelEvent::Connected => {
                self.status = ConnectionStatus::Online;
                self.announce_focus();
                Some(ViewUpdate::Status(self.status))
            }
            ChannelEvent::Reconnecting { attempt, delay } => {
                self.room.on_disconnected();
                self.status = ConnectionStatus::Reconnecting { attempt, delay };
                Some(ViewUpdate::Status(self.status))
            }
            ChannelEvent::Rejected(message) => {
                self.room.on_disconnected();
                self.status = ConnectionStatus::Offline;
                Some(ViewUpdate::AuthFailed(message))
            }
            ChannelEvent::Closed => {
                self.room.on_disconnected();
                self.status = ConnectionStatus::Offline;
                Some(ViewUpdate::Status(self.status))
            }
            ChannelEvent::Server(event) => match self.room.apply(event) {
                RoomUpdate::Ignored => None,
                update => Some(ViewUpdate::Room(update)),
            },
        }
    }

    fn on_task(&mut self, task: ViewTask) -> Option<ViewUpdate> {
        match task {
            ViewTask::Refreshed(result) => {
                self.fetching = false;
                match result {
                    Ok(puzzle) => {
                        self.room.apply_snapshot(puzzle);
                        self.reclaim_focus();
                        Some(ViewUpdate::Room(RoomUpdate::Board))
                    }
                    Err(e) => self.on_error("Could not load puzzle", e),
                }
            }
            ViewTask::Checked(result) => {
                self.checking = false;
                match result {
                    Ok(solution) => {
                        let was_completed = self.room.board.is_completed();
                        self.room.apply_solution(&solution);
                        if self.room.board.is_completed() && !was_completed {
                            info!(puzzle_id = self.puzzle_id(), "puzzle solved");
                        }
                        Some(ViewUpdate::Room(RoomUpdate::Board))
                    }
                    Err(e) => self.on_error("Could not check solution", e),
                }
            }
            ViewTask::Persisted { edit, result } => match result {
                Ok(()) => {
                    self.room.board.confirm(&edit);
                    self.send(self.room.move_event());
                    None
                }
                Err(e) => {
                    let rolled_back = self.room.board.rollback(&edit);
                    debug!(seq = edit.seq, rolled_back, "edit failed");
                    self.on_error("Move not saved", e)
                }
            },
        }
    }

    fn on_error(&mut self, context: &str, error: ClientError) -> Option<ViewUpdate> {
        if let ClientError::Unauthorized(message) = error {
            return Some(ViewUpdate::AuthFailed(message));
        }
        warn!(puzzle_id = self.puzzle_id(), error = %error, "{}", context);
        let notice = format!("{}: {}", context, error);
        self.notice = Some(notice.clone());
        Some(ViewUpdate::Notice(notice))
    }
}
