//! UI rendering and layout utilities

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::overlay::Severity;

/// Snapshot of everything the renderer needs for one frame
#[derive(Clone)]
pub struct UiState {
    pub device_name: String,
    pub status: String,
    pub level: Option<f32>,
    pub warning_level: f32,
    pub alarm_level: f32,
    pub running: bool,
    pub overlay: Option<Severity>,
}

/// Color for an overlay indicator (amber for warning, red for alarm)
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Warning => Color::Yellow,
        Severity::Alarm => Color::Red,
    }
}

fn threshold_pos(width: usize, level: f32) -> usize {
    let ratio = (f64::from(level) / 100.0).clamp(0.0, 1.0);
    (ratio * width.saturating_sub(1) as f64).round() as usize
}

/// Create a bar showing the smoothed level, colored by threshold band
pub fn create_level_bar(width: usize, state: &UiState) -> Line<'static> {
    let level = state.level.unwrap_or(0.0).clamp(0.0, 100.0);
    let filled = (f64::from(level) / 100.0 * width as f64) as usize;
    let warning_pos = threshold_pos(width, state.warning_level);
    let alarm_pos = threshold_pos(width, state.alarm_level);

    let mut spans = Vec::new();
    for i in 0..width {
        let color = if i >= alarm_pos {
            Color::Red
        } else if i >= warning_pos {
            Color::Yellow
        } else {
            Color::Green
        };

        let ch = if i < filled { '█' } else { '░' };
        spans.push(Span::styled(ch.to_string(), Style::default().fg(color)));
    }

    Line::from(spans)
}

/// Label line marking the warning and alarm threshold positions
pub fn create_threshold_labels(width: usize, state: &UiState) -> Line<'static> {
    let warning_pos = threshold_pos(width, state.warning_level);
    let alarm_pos = threshold_pos(width, state.alarm_level);

    let mut spans = Vec::new();
    for i in 0..width {
        if i == alarm_pos {
            spans.push(Span::styled("▲", Style::default().fg(Color::Red)));
        } else if i == warning_pos {
            spans.push(Span::styled("▲", Style::default().fg(Color::Yellow)));
        } else if i == 0 {
            spans.push(Span::raw("0"));
        } else if i == width - 1 {
            spans.push(Span::raw("100"));
        } else {
            spans.push(Span::raw(" "));
        }
    }

    Line::from(spans)
}

/// Render the complete UI, wrapped in a border overlay when one is active
pub fn render_ui(f: &mut Frame, state: &UiState) {
    let size = f.size();

    // Full-frame border in the severity color, the terminal counterpart of
    // the original screen-edge overlay
    let inner = if let Some(severity) = state.overlay {
        let overlay_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .border_style(Style::default().fg(severity_color(severity)));
        let inner = overlay_block.inner(size);
        f.render_widget(overlay_block, size);
        inner
    } else {
        size
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    // Device
    let device_block = Block::default().title("Device").borders(Borders::ALL);
    let device_text = Paragraph::new(state.device_name.as_str()).block(device_block);
    f.render_widget(device_text, chunks[0]);

    // Status, tinted to match the active overlay
    let status_style = match state.overlay {
        Some(severity) => Style::default().fg(severity_color(severity)),
        None => Style::default(),
    };
    let status_block = Block::default().title("Status").borders(Borders::ALL);
    let status_text = Paragraph::new(state.status.as_str())
        .style(status_style)
        .block(status_block);
    f.render_widget(status_text, chunks[1]);

    // Key hints
    let hints = if state.running {
        "x: stop    q/Esc: quit"
    } else {
        "s: start    q/Esc: quit"
    };
    f.render_widget(Paragraph::new(hints), chunks[2]);

    // Level gauge with threshold markers
    let bar_width =
        (chunks[3].width as usize).saturating_sub(crate::constants::ui::BAR_BORDER_WIDTH);
    let bar_line = create_level_bar(bar_width, state);
    let label_line = create_threshold_labels(bar_width, state);
    let title = match state.level {
        Some(level) => format!("Level: {:.2}%", level),
        None => "Level".to_string(),
    };
    let gauge = Paragraph::new(vec![bar_line, label_line])
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(gauge, chunks[3]);
}
