use auction_dapp::view::{
    Slot,
    View,
    ViewState,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
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
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Refresh,
    SubmitBid,
    Withdraw,
    CancelAuction,
    DismissAlert,
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    BidModal,
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

/// Terminal input read on a dedicated thread, since `event::read` blocks.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let event = event::read();
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(input_events: &mut InputEventReceiver) -> Result<Event> {
    match input_events.recv().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input closed")),
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, view: &ViewState) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, view))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to a user action. Edits of the bid amount are
/// written straight to the view's bid input.
pub fn interpret_event(state: &mut UiState, view: &View, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            interpret_key(state, view, key)
        }
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, view: &View, key: KeyEvent) -> Option<UserEvent> {
    // raw mode swallows SIGINT
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    // an open alert swallows input until acknowledged
    if view.state().current_alert().is_some() {
        return match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => Some(UserEvent::DismissAlert),
            _ => None,
        };
    }

    match state.mode {
        Mode::BidModal => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                state.mode = Mode::Normal;
                Some(UserEvent::SubmitBid)
            }
            KeyCode::Backspace => {
                let mut input = view.bid_input();
                input.pop();
                view.set_bid_input(input);
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                let mut input = view.bid_input();
                input.push(c);
                view.set_bid_input(input);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            KeyCode::Char('b') => {
                state.mode = Mode::BidModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('w') => Some(UserEvent::Withdraw),
            KeyCode::Char('c') if view.owner_operations_visible() => {
                Some(UserEvent::CancelAuction)
            }
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, view: &ViewState) {
    f.render_widget(Clear, f.area());
    let owner_height = if view.owner_operations_visible() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),            // auction info
            Constraint::Length(5),            // my bid + statuses
            Constraint::Length(3),            // activity
            Constraint::Length(owner_height), // owner operations
            Constraint::Min(1),               // help
        ])
        .split(f.area());

    draw_slots(
        f,
        chunks[0],
        "Auction",
        view,
        &[
            Slot::AuctionEnd,
            Slot::HighestBidder,
            Slot::HighestBid,
            Slot::State,
            Slot::CarBrand,
            Slot::RegistrationNumber,
        ],
    );
    draw_slots(
        f,
        chunks[1],
        "My bid",
        view,
        &[Slot::MyBid, Slot::BiddingStatus, Slot::WithdrawStatus],
    );
    draw_slots(f, chunks[2], "Activity", view, &[Slot::EventsLog]);
    if view.owner_operations_visible() {
        let p = Paragraph::new("c  cancel auction").block(
            Block::default()
                .borders(Borders::ALL)
                .title("Owner operations"),
        );
        f.render_widget(p, chunks[3]);
    }
    draw_help(f, chunks[4], view);
    draw_modals(f, state, view);
}

fn draw_slots(f: &mut Frame, area: Rect, title: &str, view: &ViewState, slots: &[Slot]) {
    let lines: Vec<Line> = slots
        .iter()
        .map(|slot| {
            Line::from(vec![
                Span::styled(
                    format!("{}: ", slot.label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(view.slot(*slot).unwrap_or("-").to_string()),
            ])
        })
        .collect();
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}

fn draw_help(f: &mut Frame, area: Rect, view: &ViewState) {
    let mut help = String::from("b bid  w withdraw  r refresh");
    if view.owner_operations_visible() {
        help.push_str("  c cancel auction");
    }
    help.push_str("  q quit");
    let p = Paragraph::new(help).style(Style::default().fg(Color::Gray));
    f.render_widget(p, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, view: &ViewState) {
    if state.mode == Mode::BidModal {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Place Bid");
        let p = Paragraph::new(format!(
            "Amount (ETH): {}_\nEnter=confirm Esc=cancel",
            view.bid_input()
        ));
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }

    // alerts sit above everything else
    if let Some(alert) = view.current_alert() {
        let area = centered_rect(50, 20, f.area());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Alert");
        let p = Paragraph::new(format!("{}\n\nEnter=ok", alert.message))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
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

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
