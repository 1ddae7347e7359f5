use crate::client::AppSnapshot;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use rps_client::reconciler::{
    ActionOutcome,
    Move,
    Outcome,
    ProgramInterface,
    RoundRecord,
    SessionPhase,
};
use std::io::stdout;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Connect,
    NextMove,
    PrevMove,
    Play,
    PlayMove(Move),
    Refresh,
    Redraw,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // One persistent terminal so buffers survive between draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

/// Maps a raw terminal event to what the user asked for. Raw mode swallows
/// the interrupt signal, so Ctrl-C arrives here as a key.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }

    match state.mode {
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Right | KeyCode::Char('l') => Some(UserEvent::NextMove),
            KeyCode::Left | KeyCode::Char('h') => Some(UserEvent::PrevMove),
            KeyCode::Enter => Some(UserEvent::Play),
            KeyCode::Char(c @ '1'..='3') => {
                let index = c as usize - '1' as usize;
                Move::from_index(index).map(UserEvent::PlayMove)
            }
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // session
            Constraint::Length(5), // moves
            Constraint::Min(6),    // history
            Constraint::Length(6), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], snap);
    draw_moves(f, chunks[1], snap);
    draw_history(f, chunks[2], snap);
    draw_status(f, chunks[3], snap);
    draw_help(f, chunks[4]);
    if state.mode == Mode::QuitModal {
        draw_quit_modal(f);
    }
}

fn header_text(snap: &AppSnapshot) -> String {
    match (snap.phase, &snap.identity) {
        (SessionPhase::Active, Some(identity)) => format!("Connected: {identity}"),
        (SessionPhase::Invalidated, _) => match &snap.invalidation_reason {
            Some(reason) => format!("Disconnected ({reason}) - press c to reconnect"),
            None => String::from("Disconnected - press c to reconnect"),
        },
        _ => String::from("Not connected - press c to connect"),
    }
}

fn draw_header(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let style = match snap.phase {
        SessionPhase::Active => Style::default().fg(Color::Green),
        SessionPhase::Invalidated => Style::default().fg(Color::Red),
        SessionPhase::Created => Style::default().fg(Color::DarkGray),
    };
    let widget = Paragraph::new(header_text(snap)).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(snap.interface.name),
    );
    f.render_widget(widget, area);
}

fn moves_title(snap: &AppSnapshot) -> String {
    match &snap.action {
        ActionOutcome::PendingConfirmation(player_move) => format!(
            "Moves (waiting for {} to confirm)",
            snap.interface.move_label(*player_move)
        ),
        _ if !snap.moves_enabled => String::from("Moves (sending...)"),
        _ => String::from("Moves"),
    }
}

fn draw_moves(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(moves_title(snap));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(inner);
    for (player_move, rect) in Move::ALL.into_iter().zip(cells.iter()) {
        let selected = player_move == snap.selected_move;
        let style = if !snap.moves_enabled {
            Style::default().fg(Color::DarkGray)
        } else if selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let text = format!(
            "{} {}",
            player_move.index() + 1,
            snap.interface.move_label(player_move)
        );
        let border = if selected {
            BorderType::Double
        } else {
            BorderType::Plain
        };
        let widget = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(style)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(border)
                    .border_style(style),
            );
        f.render_widget(widget, *rect);
    }
}

fn outcome_color(outcome: Outcome) -> Color {
    match outcome {
        Outcome::Win => Color::Green,
        Outcome::Lose => Color::Red,
        Outcome::Draw => Color::Yellow,
    }
}

/// `number` counts from 1 in program order.
fn format_round(interface: &ProgramInterface, number: usize, round: &RoundRecord) -> String {
    format!(
        "#{number} {}  {} vs {}  {}",
        round.player.short(),
        interface.move_label(round.player_move),
        interface.move_label(round.program_move),
        interface.outcome_label(round.outcome),
    )
}

fn history_lines(snap: &AppSnapshot) -> Vec<Line<'static>> {
    if snap.rounds.is_empty() {
        return vec![Line::styled(
            "No games yet",
            Style::default().fg(Color::DarkGray),
        )];
    }
    snap.rounds
        .iter()
        .enumerate()
        .rev()
        .map(|(i, round)| {
            Line::styled(
                format_round(&snap.interface, i + 1, round),
                Style::default().fg(outcome_color(round.outcome)),
            )
        })
        .collect()
}

fn draw_history(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let title = format!("History ({})", snap.rounds.len());
    let widget = Paragraph::new(history_lines(snap))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let widget = if snap.errors.is_empty() {
        let status = if snap.status.trim().is_empty() {
            "Ready"
        } else {
            snap.status.as_str()
        };
        let lines: Vec<Line> = status.lines().map(|l| Line::from(l.to_string())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "c connect | ←/→ select | Enter or 1/2/3 play | r refresh | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_quit_modal(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
    let p = Paragraph::new("Quit? (Y/N)");
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    horizontal[1]
}
