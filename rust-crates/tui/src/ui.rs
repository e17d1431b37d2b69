use crate::client::AppSnapshot;
use alloy::primitives::U256;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
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
use seery_tui::staking::{
    TrackerState,
    tracker::Settlement,
    types::{
        Direction as StakeDirection,
        MIN_STAKE_WEI,
        WEI_PER_MILLI,
        wei_to_coin,
    },
    view::{
        format_coin,
        format_percent_bps,
        format_price,
    },
};
use std::io::stdout;

const DEFAULT_STAKE_MILLI: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeTarget {
    /// Row in the market table; records a prediction first when it has none.
    Market(usize),
    /// Row in the viewer's prediction board.
    Prediction(usize),
}

#[derive(Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Refresh,
    Suggest(usize),
    Claim(usize),
    ConfirmStake {
        target: StakeTarget,
        amount_milli: u64,
        direction: StakeDirection,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Panel {
    #[default]
    Market,
    Predictions,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    focus: Panel,
    market_idx: usize,
    board_idx: usize,
    market_suggestions: Vec<Option<StakeDirection>>,
    board_directions: Vec<StakeDirection>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            focus: Panel::Market,
            market_idx: 0,
            board_idx: 0,
            market_suggestions: Vec::new(),
            board_directions: Vec::new(),
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    StakeModal(StakeState),
    QuitModal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct StakeState {
    target: StakeTarget,
    amount_milli: u64,
    direction: StakeDirection,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    match input.next().await {
        Some(Ok(event)) => Ok(event),
        Some(Err(err)) => Err(err.into()),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    sync_rows(state, snap);
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Caches what key handling needs from the latest snapshot and keeps the
/// selections inside the tables.
fn sync_rows(state: &mut UiState, snap: &AppSnapshot) {
    state.market_suggestions = snap.market.iter().map(|a| a.suggestion).collect();
    state.board_directions = snap
        .board
        .rows()
        .iter()
        .map(|row| row.entry.prediction.direction)
        .collect();
    state.market_idx = clamp_index(state.market_idx, state.market_suggestions.len());
    state.board_idx = clamp_index(state.board_idx, state.board_directions.len());
}

fn clamp_index(idx: usize, len: usize) -> usize {
    idx.min(len.saturating_sub(1))
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(state, key),
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn handle_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(UserEvent::Quit);
    }
    match &mut state.mode {
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                Some(UserEvent::Quit)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::StakeModal(ss) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let event = UserEvent::ConfirmStake {
                    target: ss.target,
                    amount_milli: ss.amount_milli,
                    direction: ss.direction,
                };
                state.mode = Mode::Normal;
                Some(event)
            }
            KeyCode::Char('u') | KeyCode::Char('U') => {
                ss.direction = StakeDirection::Up;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                ss.direction = StakeDirection::Down;
                Some(UserEvent::Redraw)
            }
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
                ss.direction = ss.direction.toggled();
                Some(UserEvent::Redraw)
            }
            KeyCode::Up | KeyCode::Char('+') => {
                ss.amount_milli = ss.amount_milli.saturating_add(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('-') => {
                ss.amount_milli = ss.amount_milli.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                ss.amount_milli /= 10;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let d = u64::from(c.to_digit(10)?);
                ss.amount_milli = ss.amount_milli.saturating_mul(10).saturating_add(d);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => handle_normal_key(state, key.code),
    }
}

fn handle_normal_key(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Tab | KeyCode::BackTab => {
            state.focus = match state.focus {
                Panel::Market => Panel::Predictions,
                Panel::Predictions => Panel::Market,
            };
            Some(UserEvent::Redraw)
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let idx = match state.focus {
                Panel::Market => &mut state.market_idx,
                Panel::Predictions => &mut state.board_idx,
            };
            *idx = idx.saturating_sub(1);
            Some(UserEvent::Redraw)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let (idx, len) = match state.focus {
                Panel::Market => (&mut state.market_idx, state.market_suggestions.len()),
                Panel::Predictions => {
                    (&mut state.board_idx, state.board_directions.len())
                }
            };
            *idx = clamp_index(idx.saturating_add(1), len);
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('s') => {
            let (target, direction) = match state.focus {
                Panel::Market => {
                    let suggestion = state.market_suggestions.get(state.market_idx)?;
                    (
                        StakeTarget::Market(state.market_idx),
                        suggestion.unwrap_or(StakeDirection::Up),
                    )
                }
                Panel::Predictions => (
                    StakeTarget::Prediction(state.board_idx),
                    *state.board_directions.get(state.board_idx)?,
                ),
            };
            state.mode = Mode::StakeModal(StakeState {
                target,
                amount_milli: DEFAULT_STAKE_MILLI,
                direction,
            });
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('c') if state.focus == Panel::Predictions => {
            (state.board_idx < state.board_directions.len())
                .then_some(UserEvent::Claim(state.board_idx))
        }
        KeyCode::Char('a') if state.focus == Panel::Market => {
            (state.market_idx < state.market_suggestions.len())
                .then_some(UserEvent::Suggest(state.market_idx))
        }
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // wallet + network
            Constraint::Min(8),    // market
            Constraint::Min(8),    // my predictions
            Constraint::Length(3), // transaction tracker
            Constraint::Length(9), // status/errors + help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], snap);
    draw_market(f, state, chunks[1], snap);
    draw_predictions(f, state, chunks[2], snap);
    draw_tracker(f, chunks[3], snap);
    draw_bottom(f, chunks[4], snap);
    draw_modals(f, state, snap);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let balance = snap
        .balance_wei
        .map(|wei| format!("{} BNB", format_coin(wei)))
        .unwrap_or_else(|| String::from("N/A"));
    let refreshed = snap.last_refresh.as_deref().unwrap_or("never");
    let text = vec![
        Line::from(format!(
            "Wallet: {} | Balance: {} | Network: {}",
            snap.wallet, balance, snap.network
        )),
        Line::from(format!(
            "Contract: {} | RPC: {} | Refreshed: {}",
            snap.contract, snap.rpc_url, refreshed
        )),
    ];
    let widget = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Seery"));
    f.render_widget(widget, area);
}

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}

fn direction_style(direction: StakeDirection) -> Style {
    match direction {
        StakeDirection::Up => Style::default().fg(Color::Green),
        StakeDirection::Down => Style::default().fg(Color::Red),
    }
}

fn draw_market(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let focused = state.focus == Panel::Market;
    let header = Row::new(["Asset", "Price", "24h", "AI", "Move", "Prediction"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = snap.market.iter().enumerate().map(|(i, asset)| {
        let suggestion = match asset.suggestion {
            Some(direction) => Span::styled(
                format!("{} {}", direction.arrow(), direction),
                direction_style(direction),
            ),
            None => Span::raw("-"),
        };
        let percent = asset
            .suggestion_percent
            .map(|p| format!("{:.2}%", p.abs()))
            .unwrap_or_else(|| String::from("-"));
        let prediction = asset
            .prediction_id
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| String::from("new"));
        Row::new(vec![
            Cell::from(format!("{} ({})", asset.name, asset.symbol.to_uppercase())),
            Cell::from(format!("${}", format_price(asset.price))),
            Cell::from(format!("{:+.2}%", asset.change24h)),
            Cell::from(suggestion),
            Cell::from(percent),
            Cell::from(prediction),
        ])
        .style(row_style(focused && i == state.market_idx))
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(28),
            Constraint::Percentage(16),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
            Constraint::Percentage(12),
            Constraint::Percentage(18),
        ],
    )
    .header(header)
    .block(panel_block("Market", focused));
    f.render_widget(table, area);

    if focused
        && let Some(reasoning) = snap
            .market
            .get(state.market_idx)
            .and_then(|asset| asset.reasoning.as_deref())
        && area.height > 4
    {
        let line_area = Rect {
            x: area.x + 1,
            y: area.y + area.height - 2,
            width: area.width.saturating_sub(2),
            height: 1,
        };
        let hint = Paragraph::new(Line::from(Span::styled(
            reasoning.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
        f.render_widget(hint, line_area);
    }
}

fn draw_predictions(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let focused = state.focus == Panel::Predictions;
    let header = Row::new([
        "#", "Asset", "Call", "Entry", "Target", "My stake", "Pool", "Time", "",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = snap.board.rows().iter().enumerate().map(|(i, row)| {
        let prediction = &row.entry.prediction;
        let position = &row.entry.position;
        let call = Span::styled(
            format!(
                "{} {}%",
                row.view.actual_direction.arrow(),
                format_percent_bps(prediction.percent_change_bps)
            ),
            direction_style(row.view.actual_direction),
        );
        let mine = if position.has_stake() {
            format!(
                "↑{} ↓{}",
                format_coin(position.up_wei),
                format_coin(position.down_wei)
            )
        } else {
            String::from("-")
        };
        let pool = format!(
            "↑{} ↓{}",
            format_coin(position.total_up_wei),
            format_coin(position.total_down_wei)
        );
        let badge = if row.view.is_claimable {
            Span::styled("claim", Style::default().fg(Color::Yellow))
        } else if prediction.verified {
            Span::raw("verified")
        } else {
            Span::raw("")
        };
        Row::new(vec![
            Cell::from(prediction.id.to_string()),
            Cell::from(prediction.crypto_id.clone()),
            Cell::from(call),
            Cell::from(format!(
                "${}",
                format_price(wei_to_coin(prediction.current_price))
            )),
            Cell::from(format!(
                "${}",
                format_price(row.view.calculated_predicted_price)
            )),
            Cell::from(mine),
            Cell::from(pool),
            Cell::from(row.view.time_remaining.to_string()),
            Cell::from(badge),
        ])
        .style(row_style(focused && i == state.board_idx))
    });
    let title = format!(
        "My Predictions ({} claimable)",
        snap.board.claimable().count()
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Percentage(13),
            Constraint::Percentage(11),
            Constraint::Percentage(11),
            Constraint::Percentage(11),
            Constraint::Percentage(17),
            Constraint::Percentage(17),
            Constraint::Percentage(9),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(panel_block(&title, focused));
    f.render_widget(table, area);
}

fn draw_tracker(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let (text, color) = tracker_label(&snap.tracker);
    let widget = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Transaction"));
    f.render_widget(widget, area);
}

fn tracker_label(state: &TrackerState) -> (String, Color) {
    match state {
        TrackerState::Idle => (String::from("Idle"), Color::Gray),
        TrackerState::Submitting { kind, .. } => (
            format!("Waiting for wallet to sign {kind}..."),
            Color::Yellow,
        ),
        TrackerState::PendingConfirmation(pending) => (
            format!(
                "Confirming {} {} ({}s)",
                pending.kind,
                pending.hash,
                pending.submitted_at.elapsed().as_secs()
            ),
            Color::Yellow,
        ),
        TrackerState::Settled {
            kind,
            settlement,
            hash,
            ..
        } => {
            let hash = hash.map(|h| format!(" {h}")).unwrap_or_default();
            let (outcome, color) = match settlement {
                Settlement::Confirmed => ("confirmed", Color::Green),
                Settlement::Reverted => ("reverted", Color::Red),
                Settlement::TimedOut => ("not confirmed in time", Color::Red),
                Settlement::Rejected => ("rejected in wallet", Color::Red),
                Settlement::Abandoned => ("abandoned", Color::Red),
            };
            (format!("{kind} {outcome}{hash}"), color)
        }
    }
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let status_widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap
            .errors
            .iter()
            .rev()
            .take(5)
            .map(|e| Line::from(e.clone()))
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, chunks[0]);

    let help = Paragraph::new(
        "Tab switch panel | ↑/↓ select | s stake | a AI suggestion | c claim | r refresh | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::StakeModal(ss) => {
            let area = centered_rect(50, 35, f.area());
            let subject = match ss.target {
                StakeTarget::Market(i) => snap.market.get(i).map(|asset| {
                    let symbol = asset.symbol.to_uppercase();
                    match asset.prediction_id {
                        Some(id) => format!("{symbol} prediction #{id}"),
                        None => format!("{symbol} (records a new prediction first)"),
                    }
                }),
                StakeTarget::Prediction(i) => snap.board.get(i).map(|row| {
                    format!(
                        "prediction #{} ({})",
                        row.id(),
                        row.entry.prediction.crypto_id
                    )
                }),
            }
            .unwrap_or_else(|| String::from("unknown selection"));
            let min_milli = MIN_STAKE_WEI / U256::from(WEI_PER_MILLI);
            let block = Block::default().borders(Borders::ALL).title("Stake");
            let lines = vec![
                Line::from(format!("On: {subject}")),
                Line::from(vec![
                    Span::raw("Direction: "),
                    Span::styled(
                        format!("{} {}", ss.direction.arrow(), ss.direction),
                        direction_style(ss.direction),
                    ),
                ]),
                Line::from(format!(
                    "Amount: {:.3} BNB ({} milli, min {min_milli})",
                    ss.amount_milli as f64 / 1000.0,
                    ss.amount_milli
                )),
                Line::from(""),
                Line::from("digits/+/- amount | u/d direction | Enter=confirm Esc=cancel"),
            ];
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit");
            let p = Paragraph::new("Quit? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
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

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn state_with_rows() -> UiState {
        UiState {
            market_suggestions: vec![Some(StakeDirection::Down), None],
            board_directions: vec![StakeDirection::Up],
            ..UiState::default()
        }
    }

    #[test]
    fn interpret_event__stake_modal_digits_and_enter__confirms_stake() {
        // given
        let mut state = state_with_rows();
        interpret_event(&mut state, key(KeyCode::Char('s')));

        // when
        interpret_event(&mut state, key(KeyCode::Backspace));
        interpret_event(&mut state, key(KeyCode::Backspace));
        interpret_event(&mut state, key(KeyCode::Char('2')));
        interpret_event(&mut state, key(KeyCode::Char('5')));
        let event = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(
            event,
            Some(UserEvent::ConfirmStake {
                target: StakeTarget::Market(0),
                amount_milli: 25,
                direction: StakeDirection::Down,
            })
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__stake_modal_escape__cancels() {
        // given
        let mut state = state_with_rows();
        interpret_event(&mut state, key(KeyCode::Char('s')));

        // when
        let event = interpret_event(&mut state, key(KeyCode::Esc));

        // then
        assert_eq!(event, Some(UserEvent::Redraw));
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__predictions_panel__stakes_and_claims_selected_row() {
        // given
        let mut state = state_with_rows();
        interpret_event(&mut state, key(KeyCode::Tab));

        // when
        let claim = interpret_event(&mut state, key(KeyCode::Char('c')));
        interpret_event(&mut state, key(KeyCode::Char('s')));
        interpret_event(&mut state, key(KeyCode::Char('d')));
        let stake = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(claim, Some(UserEvent::Claim(0)));
        assert_eq!(
            stake,
            Some(UserEvent::ConfirmStake {
                target: StakeTarget::Prediction(0),
                amount_milli: DEFAULT_STAKE_MILLI,
                direction: StakeDirection::Down,
            })
        );
    }

    #[test]
    fn interpret_event__empty_board__no_claim() {
        // given
        let mut state = UiState {
            focus: Panel::Predictions,
            ..UiState::default()
        };

        // when
        let event = interpret_event(&mut state, key(KeyCode::Char('c')));

        // then
        assert_eq!(event, None);
    }

    #[test]
    fn interpret_event__selection__stays_within_rows() {
        // given
        let mut state = state_with_rows();

        // when
        for _ in 0..5 {
            interpret_event(&mut state, key(KeyCode::Down));
        }
        let suggest = interpret_event(&mut state, key(KeyCode::Char('a')));

        // then
        assert_eq!(state.market_idx, 1);
        assert_eq!(suggest, Some(UserEvent::Suggest(1)));
    }

    #[test]
    fn interpret_event__quit_requires_confirmation() {
        // given
        let mut state = state_with_rows();

        // when
        let first = interpret_event(&mut state, key(KeyCode::Char('q')));
        let declined = interpret_event(&mut state, key(KeyCode::Char('n')));
        interpret_event(&mut state, key(KeyCode::Char('q')));
        let confirmed = interpret_event(&mut state, key(KeyCode::Char('y')));

        // then
        assert_eq!(first, Some(UserEvent::Redraw));
        assert_eq!(declined, Some(UserEvent::Redraw));
        assert_eq!(confirmed, Some(UserEvent::Quit));
    }

    #[test]
    fn tracker_label__settled_revert__red() {
        // given
        let state = TrackerState::Settled {
            kind: seery_tui::staking::types::TxKind::Stake,
            settlement: Settlement::Reverted,
            hash: None,
            release_at: tokio::time::Instant::now(),
        };

        // when
        let (text, color) = tracker_label(&state);

        // then
        assert_eq!(text, "stake reverted");
        assert_eq!(color, Color::Red);
    }

    proptest::proptest! {
        #[test]
        fn interpret_event__typed_amount__matches_digits(amount in 0u64..10_000_000) {
            let mut state = state_with_rows();
            interpret_event(&mut state, key(KeyCode::Char('s')));
            interpret_event(&mut state, key(KeyCode::Backspace));
            interpret_event(&mut state, key(KeyCode::Backspace));
            for c in amount.to_string().chars() {
                interpret_event(&mut state, key(KeyCode::Char(c)));
            }
            let event = interpret_event(&mut state, key(KeyCode::Enter));
            let typed = match event {
                Some(UserEvent::ConfirmStake { amount_milli, .. }) => Some(amount_milli),
                _ => None,
            };
            proptest::prop_assert_eq!(typed, Some(amount));
        }
    }

    #[test]
    fn centered_rect__half_size__is_centered() {
        let area = centered_rect(50, 50, Rect::new(0, 0, 100, 40));
        assert_eq!(area, Rect::new(25, 10, 50, 20));
    }
}
