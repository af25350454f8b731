use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};

use quartier_map::district::Transaction;
use quartier_map::map::{MapFrame, MarkerGlyph, PopupPlacement};
use quartier_map::overlay::OverlayPhase;
use quartier_map::popup::{DetailView, PopupContent, TypeTable, NO_PROPERTIES};

use crate::app::{App, InputMode};

/// Width of the selection detail panel
const DETAIL_WIDTH: u16 = 46;

/// Below this zoom level marker names are not drawn
const LABEL_MIN_ZOOM: f64 = 13.0;

/// Screen regions for one frame
#[derive(Debug, Clone, Copy)]
pub struct Areas {
    pub search: Rect,
    pub map: Rect,
    /// Map drawing area inside the border
    pub map_inner: Rect,
    pub detail: Option<Rect>,
    pub status: Rect,
}

pub fn layout(area: Rect, with_detail: bool) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search bar
            Constraint::Min(3),    // Map (and detail panel)
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let (map, detail) = if with_detail {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(DETAIL_WIDTH)])
            .split(chunks[1]);
        (body[0], Some(body[1]))
    } else {
        (chunks[1], None)
    };

    Areas {
        search: chunks[0],
        map,
        map_inner: map.inner(Margin::new(1, 1)),
        detail,
        status: chunks[2],
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let areas = layout(frame.area(), app.selection.is_some());

    render_map(frame, app, areas.map);
    if let Some(detail) = areas.detail {
        render_detail(frame, app, detail);
    }
    render_search(frame, app, areas.search);
    render_suggestions(frame, app, areas.search, areas.map);
    render_status_bar(frame, app, areas.status);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Districts ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(map) = app.overlay.provider() else {
        let message = match app.overlay.phase() {
            OverlayPhase::Unavailable(reason) => format!("Map unavailable: {reason}"),
            OverlayPhase::Disposed => "Map closed".to_string(),
            _ => "Loading map...".to_string(),
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: true });
        let middle = Rect {
            y: inner.y + inner.height / 2,
            height: inner.height.min(2),
            ..inner
        };
        frame.render_widget(paragraph, middle);
        return;
    };

    let map_frame = map.render(app.hovered());
    let show_labels = map.viewport().zoom_level() >= LABEL_MIN_ZOOM;
    let labels: Vec<(MarkerGlyph, String)> = if show_labels {
        map_frame
            .markers
            .iter()
            .filter_map(|glyph| Some((*glyph, app.overlay.district_for(glyph.id)?.name.clone())))
            .collect()
    } else {
        Vec::new()
    };

    let popups = map_frame.popups.clone();
    frame.render_widget(MapWidget { map_frame, labels }, inner);

    for placement in &popups {
        render_popup(frame, placement, inner);
    }
}

/// Braille outlines with marker glyphs and labels overlaid
struct MapWidget<'a> {
    map_frame: MapFrame<'a>,
    labels: Vec<(MarkerGlyph, String)>,
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let outline_style = Style::default().fg(Color::DarkGray);
        for (col, row, ch) in self.map_frame.canvas.glyphs() {
            let (x, y) = (area.x + col as u16, area.y + row as u16);
            if x < area.right() && y < area.bottom() {
                buf[(x, y)].set_char(ch).set_style(outline_style);
            }
        }

        let label_style = Style::default().fg(Color::White);
        for (glyph, name) in &self.labels {
            let x = area.x + glyph.col + 2;
            let y = area.y + glyph.row;
            if y >= area.bottom() {
                continue;
            }
            for (i, ch) in name.chars().take(24).enumerate() {
                let px = x + i as u16;
                if px >= area.right() {
                    break;
                }
                buf[(px, y)].set_char(ch).set_style(label_style);
            }
        }

        for glyph in &self.map_frame.markers {
            let (x, y) = (area.x + glyph.col, area.y + glyph.row);
            if x >= area.right() || y >= area.bottom() {
                continue;
            }
            let style = if glyph.hovered {
                Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Yellow)
            };
            buf[(x, y)].set_char('●').set_style(style);
        }
    }
}

/// Box next to the anchor, flipped to stay inside the map
fn popup_rect(placement: &PopupPlacement<'_>, lines: &[String], map: Rect) -> Rect {
    let text_width = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(placement.content.title.chars().count()))
        .max()
        .unwrap_or(0) as u16;
    let width = (text_width + 4).min(map.width);
    let height = (lines.len() as u16 + 2).min(map.height);

    let anchor_x = map.x + placement.col;
    let anchor_y = map.y + placement.row;
    let x = if anchor_x + 2 + width <= map.right() {
        anchor_x + 2
    } else {
        anchor_x.saturating_sub(width + 1).max(map.x)
    };
    let y = if anchor_y >= map.y + height {
        anchor_y - height
    } else {
        (anchor_y + 1).min(map.bottom().saturating_sub(height))
    };
    Rect::new(x, y, width, height)
}

fn render_popup(frame: &mut Frame, placement: &PopupPlacement<'_>, map: Rect) {
    let content: &PopupContent = placement.content;
    let lines = content.summary_lines();
    let rect = popup_rect(placement, &lines, map);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            format!(" {} ", content.title),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(text).block(block), rect);
}

fn render_search(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.mode == InputMode::Search;
    let border = if active { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(" Search (/) ", Style::default().fg(border)));

    let query = app.overlay.search().query();
    let text = if query.is_empty() && !active {
        Span::styled("Type / to search districts", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(query)
    };
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);

    if active {
        let x = (inner.x + query.chars().count() as u16).min(inner.right().saturating_sub(1));
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}

/// Suggestion dropdown drawn over the top of the map
fn render_suggestions(frame: &mut Frame, app: &App, search: Rect, map: Rect) {
    let search_state = app.overlay.search();
    let suggestions = search_state.suggestions();
    if suggestions.is_empty() {
        return;
    }

    let districts = app.overlay.districts();
    let items: Vec<ListItem> = suggestions
        .iter()
        .enumerate()
        .filter_map(|(pos, &index)| {
            let district = districts.get(index)?;
            let mut spans = vec![Span::raw(district.name.clone())];
            if let Some(commune) = &district.commune {
                spans.push(Span::styled(format!("  {commune}"), Style::default().fg(Color::DarkGray)));
            }
            let style = if pos == search_state.highlighted_position() {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Some(ListItem::new(Line::from(spans)).style(style))
        })
        .collect();

    let height = (items.len() as u16 + 2).min(map.height);
    let rect = Rect::new(search.x + 1, map.y, search.width.saturating_sub(2).min(48), height);
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(Clear, rect);
    frame.render_widget(list, rect);
}

fn price_table<'a>(rows: Vec<Row<'a>>, first: &'a str) -> Table<'a> {
    Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new([first, "n", "min", "avg", "max"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
}

fn type_table_rows(table: &TypeTable) -> Option<Vec<Row<'static>>> {
    match table {
        TypeTable::Rows(rows) => Some(
            rows.iter()
                .map(|row| {
                    Row::new([
                        Cell::from(row.label.clone()),
                        Cell::from(row.count.to_string()),
                        Cell::from(row.range.min.clone()),
                        Cell::from(row.range.avg.clone()),
                        Cell::from(row.range.max.clone()),
                    ])
                })
                .collect(),
        ),
        TypeTable::NoProperties => None,
    }
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = DetailView::from_selection(app.selection.as_ref(), app.overlay.formatter()) else {
        return;
    };
    let content = &view.content;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", content.title),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" x/Esc: close ").right_aligned());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut header = Vec::new();
    if let Some(commune) = &content.commune {
        header.push(Line::from(vec![
            Span::styled("Commune  ", Style::default().fg(Color::DarkGray)),
            Span::raw(commune.clone()),
        ]));
    }
    if let Some(c) = view.coordinate {
        header.push(Line::from(Span::styled(
            format!("{:.4}, {:.4}", c.lat, c.lng),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(count) = &content.property_count {
        header.push(Line::from(vec![
            Span::styled("Properties  ", Style::default().fg(Color::DarkGray)),
            Span::raw(count.clone()),
        ]));
    }
    let header_height = header.len() as u16 + 1;

    let [head, body] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(header_height), Constraint::Min(0)])
        .areas(inner);
    frame.render_widget(Paragraph::new(header), head);

    match &content.breakdown {
        Some(breakdown) => {
            let [rental, sale] = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(body);
            for (tx, rect, title) in [
                (Transaction::Rental, rental, "Rental"),
                (Transaction::Sale, sale, "Sale"),
            ] {
                match type_table_rows(breakdown.table(tx)) {
                    Some(rows) => frame.render_widget(price_table(rows, title), rect),
                    None => {
                        let text = vec![
                            Line::from(Span::styled(title, Style::default().fg(Color::Cyan))),
                            Line::from(Span::styled(NO_PROPERTIES, Style::default().fg(Color::DarkGray))),
                        ];
                        frame.render_widget(Paragraph::new(text), rect);
                    }
                }
            }
        }
        None => {
            let rows = [("Rental", &content.rental), ("Sale", &content.sale)]
                .into_iter()
                .map(|(label, range)| {
                    Row::new([
                        Cell::from(label),
                        Cell::from(""),
                        Cell::from(range.min.clone()),
                        Cell::from(range.avg.clone()),
                        Cell::from(range.max.clone()),
                    ])
                })
                .collect();
            frame.render_widget(price_table(rows, "Prices"), body);
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let markers = app.overlay.markers().len();
    let hovered = app
        .hovered()
        .and_then(|id| app.overlay.district_for(id))
        .map(|d| d.name.clone())
        .unwrap_or_default();

    let help = match app.mode {
        InputMode::Normal => " | /:search hjkl:pan +/-:zoom f:fit q:quit",
        InputMode::Search => " | ↑↓:choose Enter:go Esc:cancel",
    };

    let status = Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.phase_label(), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(format!(" | {markers} markers "), Style::default().fg(Color::DarkGray)),
        Span::styled(hovered, Style::default().fg(Color::White)),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_without_detail() {
        let areas = layout(Rect::new(0, 0, 100, 30), false);
        assert_eq!(areas.search.height, 3);
        assert_eq!(areas.status.y, 29);
        assert_eq!(areas.map_inner, Rect::new(1, 4, 98, 24));
        assert!(areas.detail.is_none());
    }

    #[test]
    fn test_layout_with_detail() {
        let areas = layout(Rect::new(0, 0, 100, 30), true);
        let detail = areas.detail.unwrap();
        assert_eq!(detail.width, DETAIL_WIDTH);
        assert_eq!(areas.map.width + detail.width, 100);
    }

    #[test]
    fn test_popup_stays_inside_map() {
        use quartier_map::district::District;
        use quartier_map::format::PriceFormatter;
        use quartier_map::geo::LngLat;

        let content = PopupContent::build(&District::new("1", "Cocody"), &PriceFormatter::default());
        let lines = content.summary_lines();
        let map = Rect::new(1, 4, 60, 20);
        for (col, row) in [(0, 0), (59, 19), (30, 10)] {
            let placement = PopupPlacement {
                id: quartier_map::overlay::PopupId(1),
                anchor: LngLat::new(0.0, 0.0),
                col,
                row,
                content: &content,
            };
            let rect = popup_rect(&placement, &lines, map);
            assert!(rect.x >= map.x && rect.right() <= map.right(), "{rect:?}");
            assert!(rect.y >= map.y && rect.bottom() <= map.bottom(), "{rect:?}");
        }
    }

    #[test]
    fn test_detail_panel_without_listings() {
        use quartier_map::config::OverlayConfig;
        use quartier_map::district::{District, PriceSummary};
        use quartier_map::overlay::MarkerOverlay;
        use ratatui::{backend::TestBackend, Terminal};

        let mut app = App::new(MarkerOverlay::new(OverlayConfig::default()));
        app.selection = Some(
            District::new("4", "Plateau")
                .with_commune("Abidjan")
                .with_prices(PriceSummary::Breakdown(Vec::new())),
        );

        let mut terminal = Terminal::new(TestBackend::new(DETAIL_WIDTH, 20)).unwrap();
        terminal.draw(|frame| render_detail(frame, &app, frame.area())).unwrap();

        let buffer = terminal.backend().buffer();
        let rows: Vec<String> = (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect()
            })
            .collect();
        assert!(rows[0].contains("Plateau"));
        assert!(rows.iter().any(|r| r.contains("Abidjan")));
        assert_eq!(rows.iter().filter(|r| r.contains(NO_PROPERTIES)).count(), 2);
        assert!(rows.iter().any(|r| r.contains("Rental")));
        assert!(rows.iter().any(|r| r.contains("Sale")));
    }
}
