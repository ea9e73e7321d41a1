use std::collections::VecDeque;
use std::io;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures_util::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use sudoku_coop_core::EditRejected;

use crate::config::ClientConfig;
use crate::game::{Action, Game, GameState, Outcome};
use crate::net::ApiClient;
use crate::ui;
use crate::view::{PuzzleView, ViewUpdate};

pub fn run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_run(config))
}

async fn async_run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let result = run_loop(&mut terminal, &mut app).await;
    app.shutdown().await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Everything the event loop owns besides the terminal.
struct App {
    config: ClientConfig,
    game: Game,
    api: Option<ApiClient>,
    view: Option<PuzzleView>,
    requests: JoinSet<Outcome>,
}

impl App {
    fn new(config: ClientConfig) -> Self {
        let game = Game::new(&config.prefill);
        Self {
            config,
            game,
            api: None,
            view: None,
            requests: JoinSet::new(),
        }
    }

    /// Carry out the requested actions, including any that follow from
    /// actions failing immediately.
    async fn perform(&mut self, actions: Vec<Action>) {
        let mut queue = VecDeque::from(actions);
        while let Some(action) = queue.pop_front() {
            debug!(?action, "perform");
            match action {
                Action::Register(session) => match ApiClient::new(&self.config, &session) {
                    Ok(api) => {
                        self.api = Some(api.clone());
                        self.requests
                            .spawn(async move { Outcome::Registered(api.register().await) });
                    }
                    Err(e) => queue.extend(self.game.apply(Outcome::Registered(Err(e)))),
                },
                Action::LoadPuzzles => {
                    if let Some(api) = self.api.clone() {
                        self.requests
                            .spawn(async move { Outcome::PuzzlesLoaded(api.list_puzzles().await) });
                    }
                }
                Action::CreatePuzzle(request) => {
                    if let Some(api) = self.api.clone() {
                        self.requests.spawn(async move {
                            Outcome::PuzzleCreated(api.create_puzzle(&request).await)
                        });
                    }
                }
                Action::HidePuzzle(puzzle_id) => {
                    if let Some(api) = self.api.clone() {
                        self.requests.spawn(async move {
                            let result = api.hide_puzzle(puzzle_id).await;
                            Outcome::PuzzleHidden { puzzle_id, result }
                        });
                    }
                }
                Action::LoadLeaderboard => {
                    if let Some(api) = self.api.clone() {
                        self.requests.spawn(async move {
                            Outcome::LeaderboardLoaded(api.leaderboard().await)
                        });
                    }
                }
                Action::OpenPuzzle(puzzle_id) => {
                    self.close_view().await;
                    if let (Some(session), Some(api)) = (&self.game.session, &self.api) {
                        let mut view =
                            PuzzleView::open(&self.config, session, api.clone(), puzzle_id);
                        let (x, y) = self.game.cursor;
                        view.focus(x, y);
                        self.view = Some(view);
                    }
                }
                Action::ClosePuzzle => self.close_view().await,
            }
        }

        if self.game.session.is_none() && !self.game.login.in_flight {
            self.requests.abort_all();
            self.api = None;
        }
    }

    async fn close_view(&mut self) {
        if let Some(view) = self.view.take() {
            view.close().await;
        }
    }

    async fn on_view_update(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::AuthFailed(message) => {
                warn!(%message, "session rejected");
                let actions = self.game.fail_auth(&message);
                self.perform(actions).await;
            }
            ViewUpdate::Status(status) => debug!(?status, "channel status"),
            ViewUpdate::Room(_) | ViewUpdate::Notice(_) => {}
        }
    }

    async fn shutdown(&mut self) {
        self.close_view().await;
        self.requests.abort_all();
        info!("client stopped");
    }
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut event_stream = EventStream::new();

    loop {
        terminal.draw(|f| ui::draw(f, &app.game, app.view.as_ref()))?;

        tokio::select! {
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if handle_key(app, key).await {
                            return Ok(());
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                }
            }
            update = next_view_update(&mut app.view) => {
                app.on_view_update(update).await;
            }
            Some(joined) = app.requests.join_next(), if !app.requests.is_empty() => {
                match joined {
                    Ok(outcome) => {
                        let actions = app.game.apply(outcome);
                        app.perform(actions).await;
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!(error = %e, "request task failed"),
                }
            }
        }
    }
}

async fn next_view_update(view: &mut Option<PuzzleView>) -> ViewUpdate {
    match view {
        Some(view) => view.next().await,
        None => std::future::pending::<ViewUpdate>().await,
    }
}

/// Returns `true` when the user asked to quit.
async fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    if app.game.alert.is_some() {
        app.game.dismiss_alert();
        return false;
    }

    let actions = match app.game.state {
        GameState::Login => return handle_login_key(app, key).await,
        GameState::Dashboard => handle_dashboard_key(&mut app.game, key),
        GameState::Puzzle(_) => handle_puzzle_key(app, key),
        GameState::Leaderboard => {
            handle_leaderboard_key(&mut app.game, key);
            Vec::new()
        }
    };
    app.perform(actions).await;
    false
}

async fn handle_login_key(app: &mut App, key: KeyEvent) -> bool {
    let login = &mut app.game.login;
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::Down => login.field = login.field.next(),
        KeyCode::BackTab | KeyCode::Up => {
            login.field = login.field.next().next();
        }
        KeyCode::Backspace => {
            login.input().pop();
        }
        KeyCode::Char(c) => login.input().push(c),
        KeyCode::Enter => {
            if let Some(action) = app.game.submit_login() {
                app.perform(vec![action]).await;
            }
        }
        _ => {}
    }
    false
}

fn handle_dashboard_key(game: &mut Game, key: KeyEvent) -> Vec<Action> {
    if game.hide_confirm.is_some() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                game.confirm_hide().into_iter().collect()
            }
            _ => {
                game.hide_confirm = None;
                Vec::new()
            }
        };
    }

    if let Some(form) = game.create.as_mut() {
        match key.code {
            KeyCode::Left => form.difficulty = form.difficulty.prev(),
            KeyCode::Right => form.difficulty = form.difficulty.next(),
            KeyCode::Backspace => {
                form.invitees.pop();
            }
            KeyCode::Char(c) => form.invitees.push(c),
            KeyCode::Esc => game.cancel_create_form(),
            KeyCode::Enter => return game.submit_create().into_iter().collect(),
            _ => {}
        }
        return Vec::new();
    }

    match key.code {
        KeyCode::Up => game.dashboard.select_prev(),
        KeyCode::Down => game.dashboard.select_next(),
        KeyCode::Enter => return game.open_selected_puzzle().into_iter().collect(),
        KeyCode::Char('n') => game.open_create_form(),
        KeyCode::Char('d') => game.request_hide(),
        KeyCode::Char('r') => return vec![game.refresh_dashboard()],
        KeyCode::Char('l') => return vec![game.show_leaderboard()],
        KeyCode::Char('x') => game.notice = None,
        KeyCode::Char('q') | KeyCode::Esc => return game.logout(),
        _ => {}
    }
    Vec::new()
}

fn handle_puzzle_key(app: &mut App, key: KeyEvent) -> Vec<Action> {
    let Some(view) = app.view.as_mut() else {
        return match key.code {
            KeyCode::Esc | KeyCode::Char('q') => app.game.leave_puzzle(),
            _ => Vec::new(),
        };
    };
    let game = &mut app.game;

    if game.chat_focus {
        match key.code {
            KeyCode::Enter => {
                view.send_chat(&mut game.chat_draft);
            }
            KeyCode::Backspace => {
                game.chat_draft.pop();
            }
            KeyCode::Char(c) => game.chat_draft.push(c),
            KeyCode::Tab | KeyCode::Esc => {
                game.chat_focus = false;
                let (x, y) = game.cursor;
                view.focus(x, y);
            }
            _ => {}
        }
        return Vec::new();
    }

    let (x, y) = game.cursor;
    let edit = match key.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
            let (dx, dy) = match key.code {
                KeyCode::Up => (0, -1),
                KeyCode::Down => (0, 1),
                KeyCode::Left => (-1, 0),
                _ => (1, 0),
            };
            game.move_cursor(dx, dy);
            let (x, y) = game.cursor;
            view.focus(x, y);
            None
        }
        KeyCode::Char(c @ '1'..='9') => Some(view.edit(x, y, Some(c as u8 - b'0'))),
        KeyCode::Char('0') | KeyCode::Delete | KeyCode::Backspace => Some(view.edit(x, y, None)),
        KeyCode::Tab => {
            game.chat_focus = true;
            view.blur();
            None
        }
        KeyCode::Char('r') => {
            view.refresh();
            None
        }
        KeyCode::Char('x') => {
            view.dismiss_notice();
            game.notice = None;
            None
        }
        KeyCode::Esc | KeyCode::Char('q') => return game.leave_puzzle(),
        _ => None,
    };

    match edit {
        Some(Err(rejected @ (EditRejected::LockedByOther { .. } | EditRejected::Completed))) => {
            game.notice = Some(rejected.to_string());
        }
        Some(Err(rejected)) => debug!(%rejected, "edit ignored"),
        Some(Ok(())) | None => {}
    }
    Vec::new()
}

fn handle_leaderboard_key(game: &mut Game, key: KeyEvent) {
    match key.code {
        KeyCode::Up => {
            game.leaderboard_scroll = game.leaderboard_scroll.saturating_sub(1);
        }
        KeyCode::Down => {
            if let crate::game::LeaderboardState::Loaded(entries) = &game.leaderboard {
                let max_scroll = entries.len().saturating_sub(20);
                if game.leaderboard_scroll < max_scroll {
                    game.leaderboard_scroll += 1;
                }
            }
        }
        KeyCode::Esc | KeyCode::Char('q') => {
            game.state = GameState::Dashboard;
        }
        _ => {}
    }
}
