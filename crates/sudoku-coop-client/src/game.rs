use sudoku_coop_core::protocol::{CreatePuzzleResponse, LeaderboardEntry, PuzzleDto};
use sudoku_coop_core::validation::is_plausible_email;
use sudoku_coop_core::{CreatePuzzle, Difficulty, Identity, PuzzleId, Session};

use crate::config::LoginPrefill;
use crate::error::{ClientError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    Login,
    Dashboard,
    Puzzle(PuzzleId),
    Leaderboard,
}

/// Side effects requested by the state machine, carried out by the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Register(Session),
    LoadPuzzles,
    CreatePuzzle(CreatePuzzle),
    HidePuzzle(PuzzleId),
    LoadLeaderboard,
    OpenPuzzle(PuzzleId),
    ClosePuzzle,
}

/// Finished background requests fed back into the state machine.
#[derive(Debug)]
pub enum Outcome {
    Registered(Result<()>),
    PuzzlesLoaded(Result<Vec<PuzzleDto>>),
    PuzzleCreated(Result<CreatePuzzleResponse>),
    PuzzleHidden { puzzle_id: PuzzleId, result: Result<()> },
    LeaderboardLoaded(Result<Vec<LeaderboardEntry>>),
}

// ── Login ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    Token,
    Name,
    Email,
}

impl LoginField {
    pub fn next(self) -> Self {
        match self {
            LoginField::Token => LoginField::Name,
            LoginField::Name => LoginField::Email,
            LoginField::Email => LoginField::Token,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoginForm {
    pub token: String,
    pub name: String,
    pub email: String,
    pub field: LoginField,
    pub error: Option<String>,
    pub in_flight: bool,
}

impl LoginForm {
    pub fn new(prefill: &LoginPrefill) -> Self {
        Self {
            token: prefill.access_token.clone().unwrap_or_default(),
            name: prefill.name.clone().unwrap_or_default(),
            email: prefill.email.clone().unwrap_or_default(),
            field: LoginField::Token,
            error: None,
            in_flight: false,
        }
    }

    pub fn input(&mut self) -> &mut String {
        match self.field {
            LoginField::Token => &mut self.token,
            LoginField::Name => &mut self.name,
            LoginField::Email => &mut self.email,
        }
    }

    fn session(&self) -> std::result::Result<Session, &'static str> {
        let token = self.token.trim();
        let name = self.name.trim();
        let email = self.email.trim();
        if token.is_empty() {
            return Err("An access token is required");
        }
        if name.is_empty() {
            return Err("A display name is required");
        }
        if !is_plausible_email(email) {
            return Err("Enter a valid email address");
        }
        Ok(Session::new(token, Identity::new(name, email)))
    }
}

// ── Dashboard ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum PuzzleList {
    Loading,
    Loaded(Vec<PuzzleDto>),
    /// The list request failed; nothing is known about the user's puzzles.
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct Dashboard {
    pub puzzles: PuzzleList,
    pub selected: usize,
}

impl Dashboard {
    fn new() -> Self {
        Self {
            puzzles: PuzzleList::Loading,
            selected: 0,
        }
    }

    pub fn cards(&self) -> &[PuzzleDto] {
        match &self.puzzles {
            PuzzleList::Loaded(puzzles) => puzzles,
            PuzzleList::Loading | PuzzleList::Failed(_) => &[],
        }
    }

    /// Once loaded, exactly one of the card list and the empty state shows.
    pub fn shows_empty_state(&self) -> bool {
        matches!(&self.puzzles, PuzzleList::Loaded(p) if p.is_empty())
    }

    pub fn selected_puzzle(&self) -> Option<&PuzzleDto> {
        self.cards().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.cards().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn select_prev(&mut self) {
        let len = self.cards().len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    fn set_loaded(&mut self, puzzles: Vec<PuzzleDto>) {
        self.selected = self.selected.min(puzzles.len().saturating_sub(1));
        self.puzzles = PuzzleList::Loaded(puzzles);
    }
}

#[derive(Clone, Debug)]
pub struct CreateForm {
    pub difficulty: Difficulty,
    pub invitees: String,
    pub in_flight: bool,
    pub error: Option<String>,
}

impl CreateForm {
    fn new() -> Self {
        Self {
            difficulty: Difficulty::Intermediate,
            invitees: String::new(),
            in_flight: false,
            error: None,
        }
    }
}

// ── Leaderboard ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum LeaderboardState {
    Loading,
    Loaded(Vec<LeaderboardEntry>),
}

// ── Game ────────────────────────────────────────────────────────────────

pub struct Game {
    pub state: GameState,
    pub session: Option<Session>,
    pub login: LoginForm,
    pub dashboard: Dashboard,
    pub create: Option<CreateForm>,
    /// Puzzle awaiting confirmation before it is hidden.
    pub hide_confirm: Option<PuzzleId>,
    pub leaderboard: LeaderboardState,
    pub leaderboard_scroll: usize,
    /// Blocking message; must be dismissed before anything else.
    pub alert: Option<String>,
    /// Dismissible status line.
    pub notice: Option<String>,
    pub cursor: (u8, u8),
    pub chat_draft: String,
    pub chat_focus: bool,
}

impl Game {
    pub fn new(prefill: &LoginPrefill) -> Self {
        Self {
            state: GameState::Login,
            session: None,
            login: LoginForm::new(prefill),
            dashboard: Dashboard::new(),
            create: None,
            hide_confirm: None,
            leaderboard: LeaderboardState::Loading,
            leaderboard_scroll: 0,
            alert: None,
            notice: None,
            cursor: (4, 4),
            chat_draft: String::new(),
            chat_focus: false,
        }
    }

    pub fn submit_login(&mut self) -> Option<Action> {
        if self.login.in_flight {
            return None;
        }
        match self.login.session() {
            Ok(session) => {
                self.login.error = None;
                self.login.in_flight = true;
                Some(Action::Register(session))
            }
            Err(message) => {
                self.login.error = Some(message.to_string());
                None
            }
        }
    }

    pub fn logout(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if matches!(self.state, GameState::Puzzle(_)) {
            actions.push(Action::ClosePuzzle);
        }
        self.session = None;
        self.state = GameState::Login;
        self.dashboard = Dashboard::new();
        self.create = None;
        self.hide_confirm = None;
        self.login.in_flight = false;
        actions
    }

    pub fn refresh_dashboard(&mut self) -> Action {
        self.dashboard.puzzles = PuzzleList::Loading;
        Action::LoadPuzzles
    }

    pub fn open_create_form(&mut self) {
        self.create = Some(CreateForm::new());
    }

    pub fn cancel_create_form(&mut self) {
        if self.create.as_ref().is_some_and(|form| !form.in_flight) {
            self.create = None;
        }
    }

    /// Validate the form and issue the create request. While a request is
    /// in flight further submits do nothing.
    pub fn submit_create(&mut self) -> Option<Action> {
        let form = self.create.as_mut()?;
        if form.in_flight {
            return None;
        }
        match CreatePuzzle::from_input(form.difficulty.value(), &form.invitees) {
            Ok(request) => {
                form.error = None;
                form.in_flight = true;
                Some(Action::CreatePuzzle(request))
            }
            Err(e) => {
                form.error = Some(e.to_string());
                None
            }
        }
    }

    pub fn open_puzzle(&mut self, puzzle_id: PuzzleId) -> Action {
        self.state = GameState::Puzzle(puzzle_id);
        self.cursor = (4, 4);
        self.chat_draft.clear();
        self.chat_focus = false;
        Action::OpenPuzzle(puzzle_id)
    }

    pub fn open_selected_puzzle(&mut self) -> Option<Action> {
        let puzzle_id = self.dashboard.selected_puzzle()?.puzzle_id;
        Some(self.open_puzzle(puzzle_id))
    }

    pub fn leave_puzzle(&mut self) -> Vec<Action> {
        self.state = GameState::Dashboard;
        vec![Action::ClosePuzzle, self.refresh_dashboard()]
    }

    pub fn request_hide(&mut self) {
        self.hide_confirm = self.dashboard.selected_puzzle().map(|p| p.puzzle_id);
    }

    pub fn confirm_hide(&mut self) -> Option<Action> {
        self.hide_confirm.take().map(Action::HidePuzzle)
    }

    pub fn show_leaderboard(&mut self) -> Action {
        self.state = GameState::Leaderboard;
        self.leaderboard = LeaderboardState::Loading;
        self.leaderboard_scroll = 0;
        Action::LoadLeaderboard
    }

    pub fn move_cursor(&mut self, dx: i8, dy: i8) {
        let (x, y) = self.cursor;
        self.cursor = (
            (x as i8 + dx).rem_euclid(9) as u8,
            (y as i8 + dy).rem_euclid(9) as u8,
        );
    }

    /// The session was rejected: block with an alert and return to login.
    pub fn fail_auth(&mut self, message: &str) -> Vec<Action> {
        let actions = self.logout();
        self.alert = Some(format!("Signed out: {}", message));
        actions
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn apply(&mut self, outcome: Outcome) -> Vec<Action> {
        match outcome {
            Outcome::Registered(result) => {
                self.login.in_flight = false;
                match result {
                    Ok(()) => self.enter_dashboard(),
                    Err(ClientError::Unauthorized(message)) => {
                        self.alert = Some(format!("Login rejected: {}", message));
                        Vec::new()
                    }
                    Err(e) => {
                        self.login.error = Some(e.to_string());
                        Vec::new()
                    }
                }
            }
            Outcome::PuzzlesLoaded(result) => match result {
                Ok(puzzles) => {
                    self.dashboard.set_loaded(puzzles);
                    Vec::new()
                }
                Err(e) => {
                    if !e.is_auth() {
                        self.dashboard.puzzles = PuzzleList::Failed(e.to_string());
                    }
                    self.fail(e, "Could not load puzzles")
                }
            },
            Outcome::PuzzleCreated(result) => match result {
                Ok(created) => {
                    self.create = None;
                    if !created.unregistered_emails.is_empty() {
                        self.notice = Some(format!(
                            "Not registered yet: {}",
                            created.unregistered_emails.join(", ")
                        ));
                    }
                    vec![self.open_puzzle(created.puzzle_id)]
                }
                Err(e) => {
                    if let Some(form) = self.create.as_mut() {
                        form.in_flight = false;
                        if !e.is_auth() {
                            form.error = Some(e.to_string());
                            return Vec::new();
                        }
                    }
                    self.fail(e, "Could not create puzzle")
                }
            },
            Outcome::PuzzleHidden { puzzle_id, result } => match result {
                Ok(()) => {
                    self.notice = Some(format!("Puzzle {} hidden", puzzle_id));
                    if self.state == GameState::Dashboard {
                        vec![self.refresh_dashboard()]
                    } else {
                        Vec::new()
                    }
                }
                Err(e) => self.fail(e, "Could not hide puzzle"),
            },
            Outcome::LeaderboardLoaded(result) => match result {
                Ok(entries) => {
                    self.leaderboard = LeaderboardState::Loaded(entries);
                    Vec::new()
                }
                Err(e) => {
                    self.leaderboard = LeaderboardState::Loaded(Vec::new());
                    self.fail(e, "Could not load leaderboard")
                }
            },
        }
    }

    fn enter_dashboard(&mut self) -> Vec<Action> {
        let Ok(session) = self.login.session() else {
            return Vec::new();
        };
        self.session = Some(session);
        self.state = GameState::Dashboard;
        vec![self.refresh_dashboard()]
    }

    fn fail(&mut self, error: ClientError, context: &str) -> Vec<Action> {
        if let ClientError::Unauthorized(message) = &error {
            return self.fail_auth(message);
        }
        self.notice = Some(format!("{}: {}", context, error));
        Vec::new()
    }
}
