// SPDX-License-Identifier: GPL-3.0-only

//! Terminal rendering of the scanner page
//!
//! The camera preview uses Unicode half-blocks, two image rows per cell,
//! with viewfinder corners marking the region the decoder searches.

use crate::app::frame_processor::qr_detector::detection_region;
use crate::app::presenter::ResultView;
use crate::app::session::SessionState;
use crate::app::state::AppModel;
use crate::backends::camera::CameraFrame;
use crate::constants::{INSTRUCTIONS, scan};
use crate::errors::ScanError;
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap},
};
use std::time::Instant;

const ACCENT: Color = Color::Cyan;
const SUCCESS: Color = Color::Green;
const DANGER: Color = Color::Red;

impl AppModel {
    /// Draw the whole page
    pub fn view(&self, f: &mut Frame, now: Instant) {
        let result = self.result_view(now);
        let bottom_height = match &result {
            Some(view) => result_panel_height(view),
            None => INSTRUCTIONS.len() as u16 + 2,
        };

        let [title_area, main_area, bottom_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(bottom_height),
            Constraint::Length(1),
        ])
        .areas(f.area());

        f.render_widget(self.title_line(), title_area);

        let preview_area = if self.scanner.show_device_selector() {
            let [selector_area, preview_area] =
                Layout::horizontal([Constraint::Length(30), Constraint::Min(10)]).areas(main_area);
            self.render_device_selector(f, selector_area);
            preview_area
        } else {
            main_area
        };
        self.render_preview(f, preview_area, now);

        match &result {
            Some(view) => render_result(f, bottom_area, view),
            None => render_instructions(f, bottom_area),
        }

        f.render_widget(hint_line(&control_hints(self)), footer_area);
    }

    fn title_line(&self) -> Line<'static> {
        let device = self
            .scanner
            .selected_device()
            .zip(self.scanner.selected_index())
            .map(|(device, index)| device.display_label(index))
            .unwrap_or_else(|| "No camera".to_string());

        let mut spans = vec![
            Span::styled(" QR Scanner ", Style::default().fg(Color::Black).bg(ACCENT)),
            Span::raw(" "),
            state_span(self.scanner.state()),
            Span::raw(format!("  {device}")),
        ];
        if self.scanner.torch_on() {
            spans.push(Span::styled("  Torch on", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    }

    fn render_device_selector(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .scanner
            .devices()
            .iter()
            .enumerate()
            .map(|(index, device)| ListItem::new(device.display_label(index)))
            .collect();

        let list = List::new(items)
            .block(Block::bordered().title(" Camera "))
            .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(self.scanner.selected_index());
        f.render_stateful_widget(list, area, &mut state);
    }

    fn render_preview(&self, f: &mut Frame, area: Rect, now: Instant) {
        let block = Block::bordered().title(" Camera ");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let state = self.scanner.state();
        let placeholder = match state {
            SessionState::Idle if self.scanner.restart_pending() => "Switching camera...",
            SessionState::Idle => "Camera stopped",
            SessionState::Requesting => "Starting camera...",
            SessionState::Active => "Waiting for camera...",
            SessionState::Error => "",
        };
        let detection_box = self.scanner.config().detection_box;
        f.render_widget(
            PreviewWidget {
                frame: self.scanner.latest_frame(),
                detection_box,
                placeholder,
            },
            inner,
        );

        if let Some(text) = self.scanner.indicator(now) {
            let banner = Line::from(vec![
                Span::styled(" Scanned ", Style::default().fg(Color::Black).bg(SUCCESS)),
                Span::raw(" "),
                Span::styled(
                    truncate(text, inner.width.saturating_sub(10) as usize),
                    Style::default().fg(SUCCESS),
                ),
            ]);
            let banner_area = Rect { height: 1, ..inner };
            f.render_widget(banner, banner_area);
        }

        if let Some(error) = self.scanner.error() {
            render_error(f, inner, error, state == SessionState::Error);
        }
    }
}

fn state_span(state: SessionState) -> Span<'static> {
    let (label, color) = match state {
        SessionState::Idle => ("Stopped", Color::Gray),
        SessionState::Requesting => ("Starting", Color::Yellow),
        SessionState::Active => ("Scanning", SUCCESS),
        SessionState::Error => ("Error", DANGER),
    };
    Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

/// Centered error box; the retry hint only applies to failed sessions
fn render_error(f: &mut Frame, area: Rect, error: &ScanError, retryable: bool) {
    let mut lines = vec![Line::from(error.to_string())];
    if retryable {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press r to try again",
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    let width = area.width.saturating_sub(4).min(60);
    let height = (lines.len() as u16 + 4).min(area.height);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(DANGER))
            .block(Block::bordered().title(" Error ")),
        rect,
    );
}

fn result_panel_height(view: &ResultView) -> u16 {
    let text_lines = view.text.lines().count().clamp(1, 4) as u16;
    let options = view.options.as_ref().map_or(0, |(_, details)| details.len() as u16 + 1);
    // borders + text + meta + actions
    2 + text_lines + 2 + options
}

fn render_result(f: &mut Frame, area: Rect, view: &ResultView) {
    let text_style = if view.is_url {
        Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default()
    };
    let mut lines: Vec<Line> = view
        .text
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), text_style)))
        .collect();

    lines.push(Line::from(Span::styled(
        format!(
            "{} | {} | {}",
            if view.is_url { "URL" } else { "Text" },
            view.format,
            view.scanned_at
        ),
        Style::default().fg(Color::DarkGray),
    )));

    let mut actions = vec![("y", view.copy_label)];
    if view.show_open {
        actions.push(("o", "Open"));
    }
    actions.push(("s", "Share"));
    actions.push(("m", view.options_label));
    actions.push(("Esc", "Clear"));
    lines.push(hint_line(&actions));

    if let Some((label, details)) = &view.options {
        lines.push(Line::from(Span::styled(
            label.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (name, value) in details {
            lines.push(Line::from(vec![
                Span::styled(format!("  {name}: "), Style::default().fg(Color::DarkGray)),
                Span::raw(value.clone()),
            ]));
        }
    }

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(" Scan Result ")),
        area,
    );
}

fn render_instructions(f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = INSTRUCTIONS
        .iter()
        .enumerate()
        .map(|(i, step)| Line::from(format!("{}. {step}", i + 1)))
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" How to scan ")),
        area,
    );
}

/// Key hints for the current state, as (key, action)
pub fn control_hints(model: &AppModel) -> Vec<(&'static str, &'static str)> {
    let scanner = &model.scanner;
    let mut hints = Vec::new();

    match scanner.state() {
        SessionState::Requesting | SessionState::Active => {
            hints.push(("x", "Stop"));
            if scanner.can_switch() {
                hints.push(("n", "Switch camera"));
            }
            if scanner.state() == SessionState::Active {
                hints.push((
                    "f",
                    if scanner.torch_on() { "Torch off" } else { "Torch on" },
                ));
            }
        }
        SessionState::Idle if scanner.restart_pending() => hints.push(("x", "Stop")),
        SessionState::Idle | SessionState::Error => {
            if scanner.selected_device().is_some() {
                hints.push(("Enter", "Start scanning"));
            }
            if scanner.state() == SessionState::Error {
                hints.push(("r", "Retry"));
            }
            if scanner.show_device_selector() && scanner.devices().len() > 1 {
                hints.push(("↑/↓", "Camera"));
            }
        }
    }

    hints.push(("q", "Quit"));
    hints
}

fn hint_line(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(hints.len() * 3);
    for (i, (key, action)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            format!("[{key}]"),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {action}")));
    }
    Line::from(spans)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_chars && first_line.len() == text.len() {
        return first_line.to_string();
    }
    let kept: String = first_line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Camera frame drawn with half-block characters
struct PreviewWidget<'a> {
    frame: Option<&'a CameraFrame>,
    /// Detection box in decode pixels
    detection_box: u32,
    placeholder: &'a str,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let Some(frame) = self.frame.filter(|f| f.width > 0 && f.height > 0) else {
            let x = area.x + area.width.saturating_sub(self.placeholder.chars().count() as u16) / 2;
            let y = area.y + area.height / 2;
            buf.set_string(x, y, self.placeholder, Style::default().fg(Color::DarkGray));
            return;
        };

        // Each cell shows two vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;
        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let w = term_height * frame_aspect;
            ((w as u16).max(1), area.height)
        } else {
            let h = term_width / frame_aspect;
            (area.width, ((h / 2.0) as u16).max(1))
        };

        let x_offset = area.x + area.width.saturating_sub(display_width) / 2;
        let y_offset = area.y + area.height.saturating_sub(display_height) / 2;
        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height as f64 * 2.0);

        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let top = frame.luma(src_x, (ty as f64 * 2.0 * y_scale) as u32);
                let bottom = frame.luma(src_x, ((ty as f64 * 2.0 + 1.0) * y_scale) as u32);

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(Color::Rgb(top, top, top));
                    cell.set_bg(Color::Rgb(bottom, bottom, bottom));
                }
            }
        }

        // Viewfinder corners around the detection region
        let region = detection_region(frame, self.detection_box, scan::MAX_DECODE_DIMENSION);
        if region.is_empty() {
            return;
        }
        let left = x_offset + (region.x as f64 / x_scale) as u16;
        let right = x_offset + (((region.x + region.width) as f64 / x_scale) as u16).saturating_sub(1);
        let top = y_offset + (region.y as f64 / (y_scale * 2.0)) as u16;
        let bottom =
            y_offset + (((region.y + region.height) as f64 / (y_scale * 2.0)) as u16).saturating_sub(1);
        if right <= left || bottom <= top {
            return;
        }

        let style = Style::default().fg(ACCENT).bg(Color::Reset);
        for (x, y, corner) in [
            (left, top, "┏"),
            (right, top, "┓"),
            (left, bottom, "┗"),
            (right, bottom, "┛"),
        ] {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_symbol(corner).set_style(style);
            }
        }
    }
}
