//! The status panel: CPU, RAM and GPU gauges, connection state, quit hint.

use hostpulse_agent::{status::StatusSnapshot, ConnectionState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::ui::util::{gauge_pct, truncate_middle};

pub fn draw_status(f: &mut ratatui::Frame<'_>, snap: &StatusSnapshot, endpoint: &str) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(3), // cpu
            Constraint::Length(3), // ram
            Constraint::Length(3), // gpu
            Constraint::Length(4), // connection
            Constraint::Min(0),
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    let target = if endpoint.is_empty() {
        "no endpoint configured".to_string()
    } else {
        truncate_middle(endpoint, rows[0].width.saturating_sub(12) as usize)
    };
    f.render_widget(
        Block::default()
            .title(format!("hostpulse: {target}"))
            .borders(Borders::BOTTOM),
        rows[0],
    );

    // All text below comes from the same snapshot.
    let lines = snap.menu_lines();
    let sample = snap.last_sample.as_ref();

    draw_gauge(f, rows[1], "CPU", &lines.cpu, sample.map(|s| s.cpu), Color::Cyan);
    draw_gauge(f, rows[2], "Memory", &lines.ram, sample.map(|s| s.ram), Color::Magenta);
    draw_gauge(f, rows[3], "GPU", &lines.gpu, sample.and_then(|s| s.gpu), Color::Green);

    let last = snap
        .last_sample_at
        .map(|t| format!("Last sample: {}", t.format("%H:%M:%S")))
        .unwrap_or_else(|| "Last sample: never".into());
    let conn = Paragraph::new(vec![
        Line::styled(lines.status, Style::default().fg(state_color(snap.state))),
        Line::raw(format!("{last} | attempts: {}", snap.attempts)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Collector"));
    f.render_widget(conn, rows[4]);

    f.render_widget(
        Paragraph::new("[q] Quit").style(Style::default().fg(Color::Gray)),
        rows[6],
    );
}

fn draw_gauge(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    label: &str,
    pct: Option<f64>,
    color: Color,
) {
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .gauge_style(Style::default().fg(color))
        .percent(pct.map(gauge_pct).unwrap_or(0))
        .label(label.to_string());
    f.render_widget(g, area);
}

fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting | ConnectionState::Authenticating => Color::Yellow,
        ConnectionState::Disconnected => Color::Gray,
        ConnectionState::Error => Color::Red,
    }
}
