//! Tip jar TUI using ratatui + crossterm.
//!
//! Shows the wallet session, network, contract balance and owner, and lets
//! the user connect, switch network, tip, and (as owner) withdraw. Actions
//! run on spawned tasks; the render loop only reads state snapshots.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tipjar_gateway::HttpProvider;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::{Action, TipJar};
use crate::error::AppError;
use crate::state::{Phase, ViewState};

/// Target render interval (10 FPS).
const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Longest tip amount the input accepts.
const MAX_AMOUNT_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Key handling
// ---------------------------------------------------------------------------

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiCommand {
    Quit,
    Trigger(Action),
    AmountPush(char),
    AmountPop,
}

/// Map a key to a command given the current view.
///
/// Actions that the view does not offer (switching when already on the right
/// network, withdrawing when not the owner) map to nothing.
fn key_command(key: KeyCode, view: &ViewState) -> Option<UiCommand> {
    match key {
        KeyCode::Char('q') | KeyCode::Esc => Some(UiCommand::Quit),
        KeyCode::Char('c') => Some(UiCommand::Trigger(Action::Connect)),
        KeyCode::Char('s') if view.needs_network_switch() => {
            Some(UiCommand::Trigger(Action::SwitchNetwork))
        }
        KeyCode::Char('t') | KeyCode::Enter => Some(UiCommand::Trigger(Action::SendTip)),
        KeyCode::Char('w') if view.is_owner() => Some(UiCommand::Trigger(Action::Withdraw)),
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => Some(UiCommand::AmountPush(c)),
        KeyCode::Backspace => Some(UiCommand::AmountPop),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Run the tip jar TUI until the user quits or `cancel` fires.
///
/// `refresh_every` enables a background refresh of wallet and contract
/// state; it is skipped while an action is running.
///
/// # Errors
///
/// Returns [`AppError::Terminal`] when the terminal cannot be set up.
pub async fn run_ui(
    jar: Arc<TipJar<HttpProvider>>,
    refresh_every: Option<Duration>,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let mut state_rx = jar.subscribe();

    // Initial read, same as a background refresh.
    spawn_refresh(&jar);

    // Set up terminal.
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let mut terminal = match Terminal::new(CrosstermBackend::new(io::stdout())) {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = disable_raw_mode();
            let _ = io::stdout().execute(LeaveAlternateScreen);
            return Err(e.into());
        }
    };

    info!(wallet = jar.gateway().has_provider(), "tip jar ui started");

    let mut render_interval = tokio::time::interval(RENDER_INTERVAL);
    let mut refresh_interval = refresh_every.map(|every| {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval
    });

    let mut view = state_rx.borrow_and_update().clone();
    let mut quit = false;

    let result: Result<(), AppError> = loop {
        if quit {
            break Ok(());
        }

        tokio::select! {
            Ok(()) = state_rx.changed() => {
                view = state_rx.borrow_and_update().clone();
            }

            _ = tick(&mut refresh_interval) => {
                spawn_refresh(&jar);
            }

            // Render tick, also polls keyboard input.
            _ = render_interval.tick() => {
                while event::poll(Duration::ZERO).unwrap_or(false) {
                    if let Ok(Event::Key(key)) = event::read() {
                        if let Some(command) = press(key).and_then(|code| key_command(code, &view)) {
                            quit |= apply(command, &jar);
                        }
                    }
                }

                if !quit {
                    let _ = terminal.draw(|frame| render_ui(frame, &view, jar.gateway().has_provider()));
                }
            }

            _ = cancel.cancelled() => {
                break Ok(());
            }
        }
    };

    restore_terminal(&mut terminal);
    result
}

/// Key code of a press; Ctrl-C quits since raw mode swallows SIGINT.
fn press(key: KeyEvent) -> Option<KeyCode> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(KeyCode::Esc);
    }
    Some(key.code)
}

/// Apply a command; returns true when the UI should quit.
fn apply(command: UiCommand, jar: &Arc<TipJar<HttpProvider>>) -> bool {
    match command {
        UiCommand::Quit => return true,
        UiCommand::Trigger(action) => spawn_action(jar, action),
        UiCommand::AmountPush(c) => jar.edit_amount(|amount| {
            if amount.len() < MAX_AMOUNT_LEN {
                amount.push(c);
            }
        }),
        UiCommand::AmountPop => jar.edit_amount(|amount| {
            amount.pop();
        }),
    }
    false
}

fn spawn_action(jar: &Arc<TipJar<HttpProvider>>, action: Action) {
    let jar = Arc::clone(jar);
    tokio::spawn(async move {
        let outcome = jar.trigger(action).await;
        debug!(action = action.label(), ?outcome, "action finished");
    });
}

fn spawn_refresh(jar: &Arc<TipJar<HttpProvider>>) {
    let jar = Arc::clone(jar);
    tokio::spawn(async move {
        jar.refresh_if_idle().await;
    });
}

/// Wait for the next tick, or forever when ticking is disabled.
async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

/// Restore terminal to normal mode.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) {
    let _ = terminal.show_cursor();
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
}

// ---------------------------------------------------------------------------
// UI rendering
// ---------------------------------------------------------------------------

fn render_ui(frame: &mut Frame, view: &ViewState, has_wallet: bool) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(6), // wallet
            Constraint::Length(5), // contract
            Constraint::Length(5), // tip
            Constraint::Min(3),    // status
        ])
        .split(area);

    let header = Paragraph::new(" TIP JAR | 'q' to quit")
        .style(Style::default().fg(Color::White).bg(Color::Blue).bold())
        .alignment(Alignment::Center);
    frame.render_widget(header, layout[0]);

    render_wallet(frame, layout[1], view, has_wallet);
    render_contract(frame, layout[2], view);
    render_tip(frame, layout[3], view);
    render_status(frame, layout[4], view);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {title} "))
}

fn hint(key: &str, label: &str) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!("[{key}]"), Style::default().fg(Color::Yellow).bold()),
        Span::raw(format!(" {label}  ")),
    ]
}

fn render_wallet(frame: &mut Frame, area: Rect, view: &ViewState, has_wallet: bool) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    if !has_wallet {
        lines.push(Line::styled(
            " No wallet detected. Set TIPJAR_WALLET_URL to your wallet's RPC endpoint.",
            Style::default().fg(Color::Red),
        ));
    }

    lines.push(Line::from(vec![
        Span::raw(" Account  "),
        match &view.session.account {
            Some(account) => Span::raw(account.clone()),
            None => Span::styled("not connected", dim),
        },
    ]));

    let network = match (view.session.chain_id, &view.session.chain_name) {
        (Some(id), Some(name)) => format!("{name} ({id})"),
        (Some(id), None) => id.to_string(),
        _ => "unknown".to_string(),
    };
    let network_style = if view.needs_network_switch() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    lines.push(Line::from(vec![
        Span::raw(" Network  "),
        Span::styled(network, network_style),
    ]));

    let mut keys = vec![Span::raw(" ")];
    let connect_label = if view.session.account.is_some() {
        "Refresh wallet"
    } else {
        "Connect wallet"
    };
    keys.extend(hint("c", connect_label));
    if view.needs_network_switch() {
        keys.extend(hint("s", "Switch network"));
    }
    lines.push(Line::from(keys));

    frame.render_widget(Paragraph::new(lines).block(panel("Wallet")), area);
}

fn render_contract(frame: &mut Frame, area: Rect, view: &ViewState) {
    let owner = view.contract.owner.as_deref().unwrap_or("--");
    let mut owner_spans = vec![Span::raw(" Owner    "), Span::raw(owner.to_string())];
    if view.is_owner() {
        owner_spans.push(Span::styled("  (you)", Style::default().fg(Color::Green)));
    }

    let lines = vec![
        Line::from(vec![
            Span::raw(" Balance  "),
            Span::styled(
                format!("{} ETH", view.contract.balance),
                Style::default().fg(Color::Green).bold(),
            ),
        ]),
        Line::from(owner_spans),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel("Contract")), area);
}

fn render_tip(frame: &mut Frame, area: Rect, view: &ViewState) {
    let mut keys = vec![Span::raw(" ")];
    keys.extend(hint("t", "Send tip"));
    if view.is_owner() {
        keys.extend(hint("w", "Withdraw tips"));
    }

    let lines = vec![
        Line::from(vec![
            Span::raw(" Amount   "),
            Span::styled(
                format!("{}_", view.pending.amount),
                Style::default().fg(Color::White).bold(),
            ),
            Span::styled(" ETH  (type digits, backspace to edit)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(keys),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel("Tip")), area);
}

fn render_status(frame: &mut Frame, area: Rect, view: &ViewState) {
    let line = if view.phase() == Phase::Busy {
        Line::styled(" Working... confirm in your wallet", Style::default().fg(Color::Yellow))
    } else {
        Line::from(format!(" {}", view.pending.message))
    };
    let paragraph = Paragraph::new(line)
        .block(panel("Status"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
