use cupi_core::frame::FrameBuffer;
use cupi_core::stage::OverlayLayer;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::canvas;

/// Données de la ligne de statut.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusInfo {
    /// Resolved hero layout (`wide`, `compact`, `custom`).
    pub layout: String,
    /// Automaton grid size, if the background runs.
    pub grid: Option<(u32, u32)>,
    /// Generations computed so far.
    pub generations: u64,
    /// ASCII grid size, if the pipeline runs.
    pub ascii: Option<(u32, u32)>,
    /// Current ASCII font size.
    pub ascii_font_size: f32,
    /// Hue rotation in degrees.
    pub hue_deg: f32,
    /// Wave displacement on.
    pub waves: bool,
    /// Presentation state: scrolled away from the top.
    pub scrolled: bool,
    /// Loop rate.
    pub fps: f64,
}

/// Everything one terminal frame needs.
pub struct ViewModel<'a> {
    /// Background canvas sampled to one pixel per cell.
    pub background: Option<&'a FrameBuffer>,
    /// Overlay layers in stacking order.
    pub overlays: Vec<&'a OverlayLayer>,
    /// Viewport size in pixels.
    pub viewport_px: (f32, f32),
    /// Pixels covered by one terminal cell.
    pub cell_px: (f32, f32),
    /// Status line contents, `None` once the debug chrome is hidden.
    pub status: Option<StatusInfo>,
}

/// Draw the full frame: background, overlays, then the status line.
pub fn draw(frame: &mut Frame, view: &ViewModel<'_>) {
    let area = frame.area();
    render_scene(frame.buffer_mut(), area, view);
    if let Some(status) = &view.status {
        let [_, bottom] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
        frame.render_widget(status_line(status), bottom);
    }
}

/// Composite background and overlays into `buf`.
pub fn render_scene(buf: &mut Buffer, area: Rect, view: &ViewModel<'_>) {
    if let Some(bg) = view.background {
        canvas::render_background(buf, area, bg);
    }
    for layer in &view.overlays {
        canvas::render_overlay(buf, area, layer, view.viewport_px, view.cell_px, view.background);
    }
}

fn status_line(status: &StatusInfo) -> Paragraph<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let key = Style::default().fg(Color::Yellow);
    let grid = status
        .grid
        .map_or_else(|| "off".to_string(), |(c, r)| format!("{c}×{r} gen {}", status.generations));
    let ascii = status.ascii.map_or_else(
        || "off".to_string(),
        |(c, r)| format!("{c}×{r} @{:.2}px", status.ascii_font_size),
    );
    let spans = vec![
        Span::styled(format!(" {} ", status.layout), key),
        Span::styled(format!("grid {grid} "), dim),
        Span::styled(format!("ascii {ascii} "), dim),
        Span::styled(format!("hue {:.1}° ", status.hue_deg), dim),
        Span::styled(if status.waves { "waves on " } else { "waves off " }, dim),
        Span::styled(if status.scrolled { "scrolled " } else { "" }, dim),
        Span::styled(format!("{:.0} fps ", status.fps), Style::default().fg(Color::Green)),
        Span::styled("q quit  d debug  w waves  r reseed  +/- font", dim),
    ];
    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cupi_core::stage::BlendMode;

    #[test]
    fn scene_stacks_overlay_over_background() {
        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        let mut bg = FrameBuffer::new(3, 1);
        bg.fill((26, 26, 26, 255));
        let layer = OverlayLayer {
            text: "#".to_string(),
            font_size: 10.0,
            font_family: "IBM Plex Mono".to_string(),
            color: (253, 249, 243),
            hue_rotate_deg: 0.0,
            blend: BlendMode::Difference,
        };
        let view = ViewModel {
            background: Some(&bg),
            overlays: vec![&layer],
            viewport_px: (18.0, 10.0),
            cell_px: (6.0, 10.0),
            status: None,
        };
        render_scene(&mut buf, area, &view);
        assert_eq!(buf[(1, 0)].symbol(), "#");
        assert_eq!(buf[(1, 0)].fg, Color::Rgb(227, 223, 217));
        assert_eq!(buf[(0, 0)].bg, Color::Rgb(26, 26, 26));
    }

    #[test]
    fn status_line_mentions_fps() {
        let status = StatusInfo {
            layout: "wide".to_string(),
            fps: 30.0,
            ..StatusInfo::default()
        };
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        ratatui::widgets::Widget::render(status_line(&status), area, &mut buf);
        let text: String = (0..area.width).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(text.contains("30 fps"), "{text}");
        assert!(text.starts_with(" wide"));
    }
}
