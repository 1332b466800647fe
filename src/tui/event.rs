use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    // Global browser commands (passed to core::update)
    ForceQuit,
    GoBack,
    GoForward,
    Reload,
    GoHome,
    ToggleMute,
    NewRootTab,
    CloseTab,

    // Focus
    FocusNext,
    FocusPrev,
    FocusAddress,
    Escape,

    // Pane-local events (handled by the focused component)
    InputChar(char),
    Paste(String), // Bracketed paste
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    CursorHome,
    CursorEnd,
    Submit,
    /// Enter with Alt or Shift held: follow a link natively.
    SubmitModified,
    ScrollPageUp,
    ScrollPageDown,
    Resize,
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(std::time::Duration::ZERO)
}

/// Poll for an event, blocking up to `timeout`. Terminal read errors are
/// logged and treated as "no event".
pub fn poll_event_timeout(timeout: std::time::Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            log::warn!("Terminal poll failed: {e}");
            return None;
        }
    }
    match event::read() {
        Ok(Event::Key(key_event)) => map_key(key_event),
        Ok(Event::Mouse(mouse_event)) => match mouse_event.kind {
            MouseEventKind::ScrollUp => Some(TuiEvent::CursorUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::CursorDown),
            _ => None,
        },
        Ok(Event::Paste(data)) => Some(TuiEvent::Paste(data)),
        Ok(Event::Resize(..)) => Some(TuiEvent::Resize),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Terminal read failed: {e}");
            None
        }
    }
}

/// Translate one key press into a `TuiEvent`.
pub fn map_key(key_event: KeyEvent) -> Option<TuiEvent> {
    if key_event.kind == KeyEventKind::Release {
        return None;
    }
    log::debug!(
        "Key event: {:?} with modifiers {:?}",
        key_event.code,
        key_event.modifiers
    );

    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key_event.modifiers.contains(KeyModifiers::ALT);
    let shift = key_event.modifiers.contains(KeyModifiers::SHIFT);

    match key_event.code {
        KeyCode::Char('c' | 'q') if ctrl => Some(TuiEvent::ForceQuit),
        KeyCode::Char('l') if ctrl => Some(TuiEvent::FocusAddress),
        KeyCode::Char('r') if ctrl => Some(TuiEvent::Reload),
        KeyCode::Char('t') if ctrl => Some(TuiEvent::NewRootTab),
        KeyCode::Char('w') if ctrl => Some(TuiEvent::CloseTab),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Left if alt => Some(TuiEvent::GoBack),
        KeyCode::Right if alt => Some(TuiEvent::GoForward),
        KeyCode::Home if alt => Some(TuiEvent::GoHome),
        KeyCode::Enter if alt || shift => Some(TuiEvent::SubmitModified),
        KeyCode::F(5) => Some(TuiEvent::Reload),
        KeyCode::F(2) => Some(TuiEvent::ToggleMute),
        KeyCode::Char(c) => Some(TuiEvent::InputChar(c)),
        KeyCode::Backspace => Some(TuiEvent::Backspace),
        KeyCode::Delete => Some(TuiEvent::Delete),
        KeyCode::Enter => Some(TuiEvent::Submit),
        KeyCode::Esc => Some(TuiEvent::Escape),
        KeyCode::Tab => Some(TuiEvent::FocusNext),
        KeyCode::BackTab => Some(TuiEvent::FocusPrev),
        KeyCode::Left => Some(TuiEvent::CursorLeft),
        KeyCode::Right => Some(TuiEvent::CursorRight),
        KeyCode::Up => Some(TuiEvent::CursorUp),
        KeyCode::Down => Some(TuiEvent::CursorDown),
        KeyCode::Home => Some(TuiEvent::CursorHome),
        KeyCode::End => Some(TuiEvent::CursorEnd),
        KeyCode::PageUp => Some(TuiEvent::ScrollPageUp),
        KeyCode::PageDown => Some(TuiEvent::ScrollPageDown),
        _ => None,
    }
}
