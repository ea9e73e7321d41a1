use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Clear, Paragraph, Wrap},
};

use sudoku_coop_core::board::GRID_SIZE;
use sudoku_coop_core::{CellView, Difficulty, PALETTE_SIZE};

use crate::game::{Game, GameState, LeaderboardState, LoginField, PuzzleList};
use crate::view::{ConnectionStatus, PuzzleView};

// ── Constants ────────────────────────────────────────────────────────────────

/// Width of one cell including padding.
const CELL_WIDTH: usize = 5;
const GRID_WIDTH: u16 = 9 * CELL_WIDTH as u16 + 10 + 2;
const GRID_HEIGHT: u16 = 9 * 2 + 1 + 2;

/// Lock colours, indexed by roster position modulo the palette size.
const LOCK_PALETTE: [Color; PALETTE_SIZE] = [Color::Magenta, Color::Green, Color::Blue, Color::Red];
const UNKNOWN_HOLDER: Color = Color::DarkGray;

// ── Public entry point ───────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, game: &Game, view: Option<&PuzzleView>) {
    let area = f.area();
    let [main, notice_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);

    match game.state {
        GameState::Login => draw_login(f, game, main),
        GameState::Dashboard => draw_dashboard(f, game, main),
        GameState::Puzzle(puzzle_id) => match view {
            Some(view) => draw_puzzle(f, game, view, main),
            None => draw_message(f, main, &format!("Opening puzzle {}...", puzzle_id)),
        },
        GameState::Leaderboard => draw_leaderboard(f, game, main),
    }

    let notice = view.and_then(|v| v.notice()).or(game.notice.as_deref());
    if let Some(notice) = notice {
        let line = Line::from(vec![
            Span::styled(format!(" {} ", notice), Style::default().fg(Color::Yellow)),
            Span::styled(" (x to dismiss)", Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(Paragraph::new(line), notice_area);
    }

    if let Some(alert) = &game.alert {
        draw_alert(f, alert);
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

fn draw_login(f: &mut Frame, game: &Game, area: Rect) {
    let popup = center_rect(60, 14, area);
    let block = Block::bordered()
        .title(" Sudoku Together ")
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Cyan));

    let form = &game.login;
    let masked = "*".repeat(form.token.chars().count().min(24));
    let field = |label: &str, value: &str, which: LoginField| {
        let active = form.field == which;
        let style = if active {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        Line::from(vec![
            Span::styled(format!("  {:<14}", label), Style::default().fg(Color::Gray)),
            Span::styled(format!(" {:<34}", value), style),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field("Access token", &masked, LoginField::Token),
        Line::from(""),
        field("Display name", &form.name, LoginField::Name),
        Line::from(""),
        field("Email", &form.email, LoginField::Email),
        Line::from(""),
    ];
    if form.in_flight {
        lines.push(Line::from(Span::styled(
            "  Signing in...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));
    lines.push(key_hints(&[("Tab", "next field"), ("Enter", "sign in"), ("Esc", "quit")]));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

// ── Dashboard ────────────────────────────────────────────────────────────────

fn draw_dashboard(f: &mut Frame, game: &Game, area: Rect) {
    let name = game
        .session
        .as_ref()
        .map(|s| s.user_name().to_string())
        .unwrap_or_default();
    let block = Block::bordered()
        .title(format!(" Puzzles for {} ", name))
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::White));

    let mut lines = vec![Line::from("")];
    match &game.dashboard.puzzles {
        PuzzleList::Loading => lines.push(Line::from(Span::styled(
            "  Loading puzzles...",
            Style::default().fg(Color::DarkGray),
        ))),
        PuzzleList::Failed(_) => lines.push(Line::from(Span::styled(
            "  Could not load your puzzles. Press r to retry.",
            Style::default().fg(Color::Red),
        ))),
        PuzzleList::Loaded(_) if game.dashboard.shows_empty_state() => {
            lines.push(Line::from(Span::styled(
                "  You have no puzzles yet. Press n to start one.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        PuzzleList::Loaded(puzzles) => {
            for (i, puzzle) in puzzles.iter().enumerate() {
                let selected = i == game.dashboard.selected;
                let difficulty = Difficulty::from_value(puzzle.difficulty);
                let (status, status_color) = if puzzle.completed {
                    ("Completed", Color::Green)
                } else {
                    ("In Progress", Color::Gray)
                };
                let marker = if selected { "▶ " } else { "  " };
                let title_style = if selected {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("  {}", marker), title_style),
                    Span::styled(format!("Puzzle {:<6}", puzzle.puzzle_id), title_style),
                    Span::styled(
                        format!("{:<14}", difficulty.label()),
                        Style::default().fg(difficulty_color(difficulty)),
                    ),
                    Span::styled(
                        format!("{:>5} pts   ", puzzle.point_value),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(status, Style::default().fg(status_color)),
                ]));
            }
        }
    }
    lines.push(Line::from(""));
    lines.push(key_hints(&[
        ("↑/↓", "select"),
        ("Enter", "open"),
        ("n", "new"),
        ("d", "hide"),
        ("r", "refresh"),
        ("l", "leaderboard"),
        ("q", "sign out"),
    ]));

    f.render_widget(Paragraph::new(lines).block(block), area);

    if let Some(form) = &game.create {
        draw_create_form(f, form, area);
    }
    if let Some(puzzle_id) = game.hide_confirm {
        draw_hide_confirm(f, puzzle_id, area);
    }
}

fn draw_create_form(f: &mut Frame, form: &crate::game::CreateForm, area: Rect) {
    let popup = center_rect(56, 12, area);
    f.render_widget(Clear, popup);

    let block = Block::bordered()
        .title(" New puzzle ")
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Cyan));

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Difficulty   ", Style::default().fg(Color::Gray)),
            Span::styled("◄ ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{:^14}", form.difficulty.label()),
                Style::default()
                    .fg(difficulty_color(form.difficulty))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ►", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Invite (comma separated emails)",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            format!("  {:<50}", form.invitees),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
    ];
    if form.in_flight {
        lines.push(Line::from(Span::styled(
            "  Creating...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));
    lines.push(key_hints(&[("←/→", "difficulty"), ("Enter", "create"), ("Esc", "cancel")]));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

fn draw_hide_confirm(f: &mut Frame, puzzle_id: u64, area: Rect) {
    let popup = center_rect(40, 7, area);
    f.render_widget(Clear, popup);

    let block = Block::bordered()
        .title(" Hide puzzle? ")
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Red));

    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Hide puzzle {} from your list?", puzzle_id),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Y",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" Yes   ", Style::default().fg(Color::Gray)),
            Span::styled(
                "Any key",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" No", Style::default().fg(Color::Gray)),
        ]),
    ])
    .block(block)
    .alignment(Alignment::Center);

    f.render_widget(text, popup);
}

// ── Puzzle screen ────────────────────────────────────────────────────────────

fn draw_puzzle(f: &mut Frame, game: &Game, view: &PuzzleView, area: Rect) {
    let [grid_col, side] =
        Layout::horizontal([Constraint::Length(GRID_WIDTH), Constraint::Min(30)]).areas(area);
    let [grid_area, hints_area] =
        Layout::vertical([Constraint::Length(GRID_HEIGHT), Constraint::Min(0)]).areas(grid_col);

    draw_grid(f, game, view, grid_area);
    draw_side_panel(f, game, view, side);

    let hints = if game.chat_focus {
        key_hints(&[("Enter", "send"), ("Tab", "board"), ("Esc", "board")])
    } else {
        key_hints(&[
            ("arrows", "move"),
            ("1-9", "place"),
            ("0/Del", "clear"),
            ("Tab", "chat"),
            ("Esc", "back"),
        ])
    };
    f.render_widget(Paragraph::new(hints).wrap(Wrap { trim: true }), hints_area);
}

fn draw_grid(f: &mut Frame, game: &Game, view: &PuzzleView, area: Rect) {
    let room = view.room();
    let title = if room.board.is_completed() {
        format!(" Puzzle {}: solved ", room.puzzle_id())
    } else {
        format!(" Puzzle {} ", room.puzzle_id())
    };
    let block = Block::bordered()
        .title(title)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::White));

    if !room.board.is_loaded() {
        let loading = Paragraph::new(Line::from(Span::styled(
            "Loading board...",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(loading, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::with_capacity(GRID_HEIGHT as usize);
    lines.push(horizontal_line(BorderKind::Top));
    for y in 0..GRID_SIZE {
        let mut spans = vec![Span::styled("║", Style::default().fg(Color::White))];
        for x in 0..GRID_SIZE {
            let selected = !game.chat_focus && game.cursor == (x, y);
            spans.push(render_cell(room.cell_view(x, y), selected));
            let (sep, color) = if x % 3 == 2 {
                ("║", Color::White)
            } else {
                ("│", Color::DarkGray)
            };
            spans.push(Span::styled(sep, Style::default().fg(color)));
        }
        lines.push(Line::from(spans));
        let kind = match y {
            8 => BorderKind::Bottom,
            2 | 5 => BorderKind::Thick,
            _ => BorderKind::Thin,
        };
        lines.push(horizontal_line(kind));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// One cell as a fixed-width span.
fn render_cell(view: Option<CellView<'_>>, selected: bool) -> Span<'static> {
    let text = |value: Option<u8>| match value {
        Some(v) => format!("  {}  ", v),
        None if selected => "  ·  ".to_string(),
        None => " ".repeat(CELL_WIDTH),
    };

    let Some(view) = view else {
        return Span::raw(" ".repeat(CELL_WIDTH));
    };

    let style = match &view {
        CellView::Fixed(_) => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
        CellView::Editable(_) => Style::default().fg(Color::Cyan),
        CellView::LockedByOther { lock, .. } => {
            let color = lock
                .color_index
                .map(|i| LOCK_PALETTE[i % PALETTE_SIZE])
                .unwrap_or(UNKNOWN_HOLDER);
            Style::default().fg(Color::Black).bg(color)
        }
    };
    let style = if selected {
        style.fg(Color::Black).bg(Color::Yellow)
    } else {
        style
    };

    Span::styled(text(view.value()), style)
}

enum BorderKind {
    Top,
    Thick,
    Thin,
    Bottom,
}

fn horizontal_line(kind: BorderKind) -> Line<'static> {
    let (left, thick_cross, thin_cross, right, fill, color) = match kind {
        BorderKind::Top => ('╔', '╦', '╤', '╗', '═', Color::White),
        BorderKind::Thick => ('╠', '╬', '╪', '╣', '═', Color::White),
        BorderKind::Bottom => ('╚', '╩', '╧', '╝', '═', Color::White),
        BorderKind::Thin => ('║', '║', '┼', '║', '─', Color::DarkGray),
    };

    let mut s = String::with_capacity(64);
    s.push(left);
    for col in 0..9 {
        for _ in 0..CELL_WIDTH {
            s.push(fill);
        }
        match col {
            8 => s.push(right),
            2 | 5 => s.push(thick_cross),
            _ => s.push(thin_cross),
        }
    }
    Line::from(Span::styled(s, Style::default().fg(color)))
}

fn draw_side_panel(f: &mut Frame, game: &Game, view: &PuzzleView, area: Rect) {
    let room = view.room();
    let [info_area, chat_area, draft_area] = Layout::vertical([
        Constraint::Length(5 + room.board.players().len() as u16 + 2),
        Constraint::Min(5),
        Constraint::Length(3),
    ])
    .areas(area);

    let (status, status_color) = match view.status() {
        ConnectionStatus::Connecting => ("connecting".to_string(), Color::Yellow),
        ConnectionStatus::Online => ("live".to_string(), Color::Green),
        ConnectionStatus::Reconnecting { attempt, delay } => (
            format!("reconnecting (#{}, {:.1}s)", attempt, delay.as_secs_f32()),
            Color::Yellow,
        ),
        ConnectionStatus::Offline => ("offline".to_string(), Color::Red),
    };
    let difficulty = Difficulty::from_value(room.board.difficulty());

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" Channel  ", Style::default().fg(Color::Gray)),
            Span::styled(status, Style::default().fg(status_color)),
        ]),
        Line::from(vec![
            Span::styled(" Level    ", Style::default().fg(Color::Gray)),
            Span::styled(
                difficulty.label().to_string(),
                Style::default().fg(difficulty_color(difficulty)),
            ),
            Span::styled(
                format!("  {} pts", room.board.point_value()),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ];
    let (x, y) = game.cursor;
    if let Some(holder) = room.lock_holder_name(x, y) {
        lines.push(Line::from(vec![
            Span::styled(" Cell     ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("held by {}", holder),
                Style::default().fg(Color::Magenta),
            ),
        ]));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));
    for (i, player) in room.board.players().iter().enumerate() {
        let me = player.is(room.identity());
        lines.push(Line::from(vec![
            Span::styled(" ■ ", Style::default().fg(LOCK_PALETTE[i % PALETTE_SIZE])),
            Span::styled(
                player.display_name(),
                Style::default().fg(Color::White),
            ),
            Span::styled(
                if me { " (you)" } else { "" },
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    let info = Block::bordered()
        .title(" Players ")
        .border_type(BorderType::Rounded);
    f.render_widget(Paragraph::new(lines).block(info), info_area);

    let visible = chat_area.height.saturating_sub(2) as usize;
    let messages = room.chat.messages();
    let start = messages.len().saturating_sub(visible);
    let chat_lines: Vec<Line> = messages[start..]
        .iter()
        .map(|message| {
            let author_color = if room.chat.is_own(message) {
                Color::Cyan
            } else {
                Color::Green
            };
            Line::from(vec![
                Span::styled(
                    format!("{}: ", message.author.name),
                    Style::default()
                        .fg(author_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(message.text.clone()),
            ])
        })
        .collect();
    let chat = Block::bordered()
        .title(" Chat ")
        .border_type(BorderType::Rounded);
    f.render_widget(
        Paragraph::new(chat_lines).block(chat).wrap(Wrap { trim: false }),
        chat_area,
    );

    let draft_style = if game.chat_focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let draft = Block::bordered()
        .title(" Message ")
        .border_type(BorderType::Rounded)
        .style(draft_style);
    f.render_widget(
        Paragraph::new(game.chat_draft.as_str()).block(draft),
        draft_area,
    );
}

// ── Leaderboard ──────────────────────────────────────────────────────────────

fn draw_leaderboard(f: &mut Frame, game: &Game, area: Rect) {
    let popup = center_rect(52, 28, area);
    f.render_widget(Clear, popup);

    let block = Block::bordered()
        .title(" Leaderboard ")
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Yellow));

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  #   Player                      Score",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  ─────────────────────────────────────",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    match &game.leaderboard {
        LeaderboardState::Loading => lines.push(Line::from(Span::styled(
            "  Loading...",
            Style::default().fg(Color::DarkGray),
        ))),
        LeaderboardState::Loaded(entries) if entries.is_empty() => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  No players have finished a game.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        LeaderboardState::Loaded(entries) => {
            let visible = 20usize;
            let start = game.leaderboard_scroll.min(entries.len().saturating_sub(1));
            let end = (start + visible).min(entries.len());

            for (offset, entry) in entries[start..end].iter().enumerate() {
                let rank = start + offset + 1;
                let name = match &entry.last_name {
                    Some(last) => format!("{} {}", entry.first_name, last),
                    None => entry.first_name.clone(),
                };
                let name: String = name.chars().take(26).collect();
                let rank_color = match rank {
                    1 => Color::Yellow,
                    2 => Color::White,
                    3 => Color::Rgb(205, 127, 50),
                    _ => Color::DarkGray,
                };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  {:>3}", rank),
                        Style::default().fg(rank_color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(format!("{:<26}", name), Style::default().fg(Color::Cyan)),
                    Span::styled(format!("{:>6}", entry.score), Style::default().fg(Color::Green)),
                ]));
            }

            if entries.len() > visible {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!(
                        "  Showing {}-{} of {}  (↑/↓ to scroll)",
                        start + 1,
                        end,
                        entries.len()
                    ),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press Esc to go back",
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

// ── Overlays ─────────────────────────────────────────────────────────────────

fn draw_alert(f: &mut Frame, message: &str) {
    let popup = center_rect(50, 8, f.area());
    f.render_widget(Clear, popup);

    let block = Block::bordered()
        .title(" Attention ")
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Red));

    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(text, popup);
}

fn draw_message(f: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Center);
    f.render_widget(text, center_rect(area.width, 1, area));
}

// ── Layout helpers ───────────────────────────────────────────────────────────

fn key_hints(hints: &[(&str, &str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for (key, action) in hints {
        spans.push(Span::styled(key.to_string(), Style::default().fg(Color::Yellow)));
        spans.push(Span::styled(
            format!(" {}   ", action),
            Style::default().fg(Color::Gray),
        ));
    }
    Line::from(spans)
}

fn center_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vert = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(height),
        Constraint::Min(0),
    ])
    .split(area);

    let horiz = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(width),
        Constraint::Min(0),
    ])
    .split(vert[1]);

    horiz[1]
}

fn difficulty_color(d: Difficulty) -> Color {
    match d {
        Difficulty::Warmup | Difficulty::Beginner => Color::Green,
        Difficulty::Easy | Difficulty::Intermediate => Color::Yellow,
        Difficulty::Advanced => Color::Magenta,
        Difficulty::Expert | Difficulty::Master => Color::Red,
    }
}
