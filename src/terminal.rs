// SPDX-License-Identifier: GPL-3.0-only

//! Terminal photobooth interface
//!
//! Renders the camera preview using Unicode half-block characters for
//! improved vertical resolution, with a gallery strip and status bar
//! below it. All booth state lives in the [`PhotoboothController`];
//! this module only draws it and translates key presses into intents.

use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Instant;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tracing::info;

use crate::booth::{
    BoothEvent, ConfirmationPrompt, PhotoboothController, export::export_filename,
};
use crate::camera::{CameraFrame, GstCamera};
use crate::config::BoothConfig;
use crate::constants::{capture, get_resolution_label, timing};

/// Run the interactive booth
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Background work (camera startup, encoding, export timers) runs on
    // this runtime; the event loop itself stays on the main thread.
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn run_app(terminal: &mut Term) -> Result<(), Box<dyn std::error::Error>> {
    let config = BoothConfig::load();
    let (mut controller, mut events) = PhotoboothController::new(Arc::new(GstCamera), config);

    let mut cursor: usize = 0;
    let mut show_help = false;
    let mut flash_until: Option<Instant> = None;
    let mut notice: Option<(String, Instant)> = None;

    loop {
        controller.pump();

        // Drain controller events before drawing so the frame reflects
        // the most recently completed operation
        while let Ok(booth_event) = events.try_recv() {
            match booth_event {
                BoothEvent::SessionChanged(_) => {}
                BoothEvent::GalleryChanged => {
                    cursor = cursor.min(controller.gallery().len().saturating_sub(1));
                }
                BoothEvent::Flash => {
                    flash_until = Some(Instant::now() + capture::FLASH_DURATION);
                }
                BoothEvent::Notice(n) => {
                    notice = Some((n.message(), Instant::now() + timing::NOTICE_DURATION));
                }
                BoothEvent::PhotoExported { path, .. } => {
                    notice = Some((
                        format!("Saved: {}", path.display()),
                        Instant::now() + timing::NOTICE_DURATION,
                    ));
                }
                BoothEvent::ExportFinished { total, skipped } => {
                    notice = Some((
                        format!("Export finished: {} photo(s) saved", total - skipped),
                        Instant::now() + timing::NOTICE_DURATION,
                    ));
                }
                BoothEvent::ExportCancelled { remaining } => {
                    notice = Some((
                        format!("Export cancelled, {} photo(s) not saved", remaining),
                        Instant::now() + timing::NOTICE_DURATION,
                    ));
                }
            }
        }

        if notice.as_ref().is_some_and(|(_, until)| *until < Instant::now()) {
            notice = None;
        }
        if flash_until.is_some_and(|until| until < Instant::now()) {
            flash_until = None;
        }

        // Draw
        terminal.draw(|f| {
            let area = f.area();

            // Preview fills everything above the gallery and status lines
            let preview_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(2),
            };
            let preview = PreviewWidget {
                frame: controller.current_frame(),
                mirror: controller.mirror_preview(),
                flash: flash_until.is_some(),
                placeholder: preview_placeholder(&controller),
            };
            f.render_widget(preview, preview_area);

            let gallery_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(2),
                width: area.width,
                height: 1,
            };
            let strip = GalleryStrip {
                controller: &controller,
                cursor,
            };
            f.render_widget(strip, gallery_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let message = match (&notice, show_help) {
                (Some((text, _)), _) => text.clone(),
                (None, true) => help_message(),
                (None, false) => status_message(),
            };
            let status = StatusBar {
                message: &message,
                info: &session_info(&controller),
            };
            f.render_widget(status, status_area);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::TICK_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C, 'q' and Esc quit with teardown
            let ctrl_c =
                key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl_c || key.code == KeyCode::Char('q') || key.code == KeyCode::Esc {
                controller.shutdown();
                break;
            }

            match key.code {
                // Capture trigger and its keyboard shortcut, gated on an
                // active session inside the controller
                KeyCode::Enter | KeyCode::Char(' ') => controller.capture(),

                KeyCode::Char('t') => controller.toggle_session(),

                KeyCode::Left => cursor = cursor.saturating_sub(1),
                KeyCode::Right => {
                    cursor = (cursor + 1).min(controller.gallery().len().saturating_sub(1));
                }

                KeyCode::Char('e') => {
                    if let Some(photo) = controller.gallery().photos().get(cursor) {
                        let id = photo.id;
                        if let Err(e) = controller.export_photo(id) {
                            notice =
                                Some((e.to_string(), Instant::now() + timing::NOTICE_DURATION));
                        }
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(photo) = controller.gallery().photos().get(cursor) {
                        let id = photo.id;
                        if let Err(e) = controller.delete_photo(id) {
                            notice =
                                Some((e.to_string(), Instant::now() + timing::NOTICE_DURATION));
                        }
                    }
                }
                KeyCode::Char('a') => controller.export_all(),
                KeyCode::Char('x') => controller.cancel_export(),
                KeyCode::Char('c') => {
                    let mut prompt = TerminalConfirm {
                        terminal: &mut *terminal,
                    };
                    controller.clear_gallery(&mut prompt);
                }

                KeyCode::Char('m') => controller.toggle_mirror(),
                KeyCode::Char('o') => controller.open_export_dir(),
                KeyCode::Char('h') => show_help = !show_help,
                _ => {}
            }
        }
    }

    info!("Leaving the booth");
    Ok(())
}

fn preview_placeholder(controller: &PhotoboothController) -> &'static str {
    if controller.is_starting() {
        "Starting camera..."
    } else if controller.is_active() {
        "Waiting for camera..."
    } else {
        "Camera off, press 't' to start"
    }
}

fn status_message() -> String {
    "space: capture | 't' camera | 'a' save all | 'c' clear | 'h' help | 'q' quit".to_string()
}

fn help_message() -> String {
    "space/enter: Capture | t: Camera on/off | left/right: Select | e: Save | d: Delete | \
     a: Save all | x: Cancel saving | c: Clear | m: Mirror | o: Open folder | q: Quit"
        .to_string()
}

/// Right-hand side of the status bar
fn session_info(controller: &PhotoboothController) -> String {
    let mut parts: Vec<String> = Vec::new();

    if controller.is_active() {
        match controller.device_name() {
            Some(name) => parts.push(name.to_string()),
            None => parts.push("Camera on".to_string()),
        }
        if let Some(frame) = controller.current_frame() {
            let label = get_resolution_label(frame.width)
                .map(|l| format!(" {}", l))
                .unwrap_or_default();
            parts.push(format!("{}x{}{}", frame.width, frame.height, label));
        }
    } else {
        parts.push("Camera off".to_string());
    }

    let count = controller.gallery().len();
    parts.push(format!(
        "{} photo{}",
        count,
        if count == 1 { "" } else { "s" }
    ));
    if controller.export_running() {
        parts.push("saving...".to_string());
    }

    parts.join(" | ")
}

/// Blocking yes/no modal over the preview
struct TerminalConfirm<'a> {
    terminal: &'a mut Term,
}

impl ConfirmationPrompt for TerminalConfirm<'_> {
    fn confirm(&mut self, question: &str) -> bool {
        confirm_modal(self.terminal, question).unwrap_or(false)
    }
}

fn confirm_modal(terminal: &mut Term, question: &str) -> io::Result<bool> {
    loop {
        terminal.draw(|f| {
            let area = f.area();
            let width = (question.len() as u16 + 6).min(area.width);
            let modal = Rect {
                x: area.x + (area.width.saturating_sub(width)) / 2,
                y: area.y + area.height / 2,
                width,
                height: 2.min(area.height),
            };
            f.render_widget(ConfirmBox { question }, modal);
        })?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
                    return Ok(false);
                }
                _ => {}
            }
        }
    }
}

struct ConfirmBox<'a> {
    question: &'a str,
}

impl Widget for ConfirmBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(Color::Black).bg(Color::White);
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_char(' ');
                    cell.set_style(style);
                }
            }
        }
        buf.set_string(area.x + 2, area.y, self.question, style);
        if area.height > 1 {
            buf.set_string(
                area.x + 2,
                area.y + 1,
                "y: yes | n: no",
                style.add_modifier(Modifier::DIM),
            );
        }
    }
}

/// Widget that renders a camera frame using half-block characters
struct PreviewWidget<'a> {
    frame: Option<&'a CameraFrame>,
    mirror: bool,
    flash: bool,
    placeholder: &'a str,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.flash {
            // The capture flash cue washes out the whole preview
            for y in area.y..area.y + area.height {
                for x in area.x..area.x + area.width {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(' ');
                        cell.set_bg(Color::White);
                    }
                }
            }
            return;
        }

        let Some(frame) = self.frame else {
            // No frame - show placeholder
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Calculate display dimensions maintaining aspect ratio
        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64; // *2 because half-blocks

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        // Scale factors
        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Render using half-block characters
        // Each terminal cell represents 2 vertical pixels:
        // - Upper half (▀) colored with fg
        // - Lower half colored with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let mut src_x = (tx as f64 * x_scale) as u32;
                if self.mirror {
                    let max_x = frame.width.saturating_sub(1);
                    src_x = max_x - src_x.min(max_x);
                }
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let top_color = sample_pixel(frame, src_x, src_y_top);
                let bottom_color = sample_pixel(frame, src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width.saturating_sub(1));
    let y = y.min(frame.height.saturating_sub(1));
    match frame.rgb_at(x, y) {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => Color::Black,
    }
}

/// One-line gallery listing with a selection cursor
struct GalleryStrip<'a> {
    controller: &'a PhotoboothController,
    cursor: usize,
}

impl Widget for GalleryStrip<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let photos = self.controller.gallery().photos();

        if photos.is_empty() {
            buf.set_string(
                area.x,
                area.y,
                "No photos yet",
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let mut x = area.x;
        for (index, photo) in photos.iter().enumerate() {
            let marker = format!("[{}]", index + 1);
            if x + marker.len() as u16 > area.x + area.width {
                break;
            }
            let style = if index == self.cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            buf.set_string(x, area.y, &marker, style);
            x += marker.len() as u16 + 1;
        }

        // Selected photo's export name on the right
        if let Some(photo) = photos.get(self.cursor) {
            let name = export_filename(photo.captured_at);
            let width = name.len() as u16;
            if area.width > width && area.x + area.width - width > x {
                buf.set_string(
                    area.x + area.width - width,
                    area.y,
                    &name,
                    Style::default().fg(Color::DarkGray),
                );
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    info: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let style = Style::default().fg(Color::White).bg(Color::DarkGray);

        // Render message, truncated to fit
        let text = truncate_chars(self.message, area.width as usize);
        buf.set_string(area.x, area.y, text, style);

        // Right-aligned session info when there is room
        let info_width = self.info.chars().count() as u16;
        if area.width > info_width && area.width - info_width > text.chars().count() as u16 + 2 {
            buf.set_string(area.x + area.width - info_width, area.y, self.info, style);
        }
    }
}

/// Truncate to at most `width` characters, never splitting a code point
///
/// Messages carry export paths, which can contain non-ASCII directory
/// or user names; a plain byte slice would panic mid-character.
fn truncate_chars(message: &str, width: usize) -> &str {
    match message.char_indices().nth(width) {
        Some((index, _)) => &message[..index],
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let message = "Saved: /home/u/Imágenes/photobooth-1712345678901.jpg";

        // Byte 18 falls inside 'á'; character truncation keeps it whole
        let cut = truncate_chars(message, 18);
        assert_eq!(cut, "Saved: /home/u/Imá");
        assert_eq!(cut.chars().count(), 18);

        assert_eq!(truncate_chars(message, 0), "");
        assert_eq!(truncate_chars(message, 1_000), message);
        assert_eq!(truncate_chars("año", 2), "añ");
    }

    #[test]
    fn test_status_bar_renders_multibyte_message_in_narrow_area() {
        let area = Rect::new(0, 0, 18, 1);
        let mut buf = Buffer::empty(area);

        let status = StatusBar {
            message: "Saved: /home/u/Imágenes/photobooth-1712345678901.jpg",
            info: "1 photo",
        };
        status.render(area, &mut buf);

        let rendered: String = (0..area.width)
            .map(|x| buf.cell((x, 0)).map(|c| c.symbol()).unwrap_or_default())
            .collect();
        assert!(rendered.starts_with("Saved: /home/u/Im"));
    }
}
