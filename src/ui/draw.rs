use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
};
use ratatui::{Frame, Terminal};

use crate::config::{RgbColor, TopBarButton};
use crate::contact::{Contact, INTIMACY_LEVELS};
use crate::filter::InviteTab;

use super::app::App;
use super::panes::Screen;

const REVIEW_HELP: &str =
    "1-5: intimacy  g: group  Space: invited  n/p: next/prev  :: go to  F1: help";
const RESULTS_HELP: &str =
    "/: search  Tab: invite tab  i/g: filter  Enter: review  x: export  F1: help";
const SEARCH_HELP_INPUT: &str = "Type to filter  Esc/Enter: back to results";
const GROUP_MODAL_HELP: &str = "j/k: nav  Enter: pick  a: new group  q/Esc: close";
const EDITOR_HELP: &str = "Enter: confirm  Esc: cancel";
const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App<'_>) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App<'_>) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    match app.screen {
        Screen::Review => draw_review_card(frame, layout[1], app),
        Screen::Results => draw_results(frame, layout[1], app),
    }
    draw_footer(frame, layout[2], app);
    draw_group_modal(frame, size, app);
    draw_editor_modal(frame, size, app);
    draw_help_modal(frame, size, app);
    draw_share_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let buttons = app.top_bar_buttons();
    let total_buttons_width = calculate_buttons_width(buttons);

    // Split area: left for screens and counts, right for buttons
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(total_buttons_width),
        ])
        .split(area);

    draw_header_left(frame, chunks[0], app);
    draw_top_bar_buttons(frame, chunks[1], app);
}

fn draw_header_left(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let header_style = header_text_style(app);
    let mut spans: Vec<Span> = Vec::new();

    for (idx, screen) in Screen::ALL.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" | ", header_style));
        }
        let style = if *screen == app.screen {
            selection_style(app)
        } else {
            header_style
        };
        spans.push(Span::styled(screen.title(), style));
    }

    let summary = app.summary();
    spans.push(Span::raw("   "));
    if summary.total == 0 {
        spans.push(Span::styled("No contacts uploaded", header_style));
    } else {
        spans.push(Span::styled(
            format!(
                "{} GUESTS  {} INVITED  {} COMPLETE",
                summary.total, summary.invited, summary.complete
            ),
            header_style,
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn calculate_buttons_width(buttons: &[TopBarButton]) -> u16 {
    if buttons.is_empty() {
        return 0;
    }

    let max_title_len = buttons
        .iter()
        .map(|b| b.action.title().len())
        .max()
        .unwrap_or(0);

    // " F1: TITLE ", keys are F1-F12 so 3 chars at most
    let button_width = (1 + 3 + 2 + max_title_len + 1) as u16;

    let num_buttons = buttons.len() as u16;
    let separators = num_buttons.saturating_sub(1);
    button_width * num_buttons + separators
}

fn draw_top_bar_buttons(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let buttons = app.top_bar_buttons();
    if buttons.is_empty() || area.width == 0 {
        return;
    }

    let max_title_len = buttons
        .iter()
        .map(|b| b.action.title().len())
        .max()
        .unwrap_or(0);
    let button_content_width = (1 + 3 + 2 + max_title_len + 1) as u16;

    let colors = app.ui_colors();
    let button_style = Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
        .add_modifier(Modifier::BOLD);

    let mut x = area.x;
    for (idx, button) in buttons.iter().enumerate() {
        if x + button_content_width > area.x + area.width {
            break;
        }

        let text = format!(
            " {}: {:^width$} ",
            button.key,
            button.action.title(),
            width = max_title_len
        );
        let button_area = Rect {
            x,
            y: area.y,
            width: button_content_width,
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(text).style(button_style).alignment(Alignment::Center),
            button_area,
        );
        x += button_content_width;

        if idx < buttons.len() - 1 && x < area.x + area.width {
            frame.render_widget(Paragraph::new(" "), Rect::new(x, area.y, 1, 1));
            x += 1;
        }
    }
}

// =========================================================================
// Review
// =========================================================================

fn draw_review_card(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let cursor = app.session.cursor();
    let title = if cursor.is_empty() {
        " CONTACT ".to_string()
    } else {
        format!(" CONTACT {} / {} ", cursor.position() + 1, cursor.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(title, header_text_style(app)))
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let Some(contact) = app.session.current() else {
        render_centered_words(frame, inner, "Upload a contact list to start reviewing");
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let name = Line::from(Span::styled(
        contact.name.to_uppercase(),
        header_text_style(app).add_modifier(Modifier::BOLD),
    ));
    render_header_with_separator(frame, layout[0], name, app, area.width);

    let buffer = app.session.buffer();
    let label_width = "INTIMACY:".len();
    let mut lines = vec![
        field_line(app, "PHONE", &contact.phone, label_width),
        intimacy_line(app, &buffer.intimacy, label_width),
        field_line(
            app,
            "GROUP",
            if buffer.group.is_empty() { "-" } else { buffer.group.as_str() },
            label_width,
        ),
        invited_line(app, contact, label_width),
    ];
    if !contact.contact.is_empty() && contact.contact != contact.intimacy {
        lines.push(field_line(app, "NOTE", &contact.contact, label_width));
    }
    frame.render_widget(Paragraph::new(lines), layout[1]);

    let summary = app.summary();
    let progress = format!(
        "{} of {} complete ({}%)",
        summary.complete,
        summary.total,
        summary.percent(summary.complete)
    );
    frame.render_widget(
        Paragraph::new(progress)
            .style(header_text_style(app))
            .alignment(Alignment::Right),
        layout[2],
    );
}

fn field_line(app: &App<'_>, label: &str, value: &str, label_width: usize) -> Line<'static> {
    let label = format!("{:width$} ", format!("{label}:"), width = label_width);
    Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::raw(value.to_string()),
    ])
}

/// Intimacy as a row of level buttons with the chosen one highlighted.
fn intimacy_line(app: &App<'_>, value: &str, label_width: usize) -> Line<'static> {
    let label = format!("{:width$} ", "INTIMACY:", width = label_width);
    let mut spans = vec![Span::styled(label, header_text_style(app))];
    for level in INTIMACY_LEVELS {
        let style = if level == value {
            selection_style(app)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {level} "), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn invited_line(app: &App<'_>, contact: &Contact, label_width: usize) -> Line<'static> {
    let label = format!("{:width$} ", "INVITED:", width = label_width);
    let colors = app.ui_colors();
    let (text, fg) = if contact.is_invited() {
        ("YES", colors.invited)
    } else {
        ("NO", colors.not_invited)
    };
    Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(text, Style::default().fg(color(fg)).add_modifier(Modifier::BOLD)),
    ])
}

// =========================================================================
// Results
// =========================================================================

fn draw_results(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    draw_search_header(frame, layout[0], app, area.width);
    frame.render_widget(Paragraph::new(build_tab_header(app)), layout[1]);
    frame.render_widget(Paragraph::new(build_filter_line(app)), layout[2]);
    draw_results_table(frame, layout[3], app);
}

fn draw_search_header(frame: &mut Frame<'_>, area: Rect, app: &App<'_>, outer_width: u16) {
    let active = app.search_focused;
    let label = "SEARCH: ";
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(app.search_input.value().to_string(), value_style),
    ]);
    render_header_with_separator(frame, area, line, app, outer_width);

    if active {
        let column = Span::raw(label).width() + app.search_input.visual_cursor();
        frame.set_cursor_position((area.x.saturating_add(column as u16), area.y));
    }
}

fn build_tab_header(app: &App<'_>) -> Line<'static> {
    let counts = app.invite_counts();
    let mut spans: Vec<Span> = Vec::new();
    for (idx, tab) in InviteTab::ALL.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" | ", header_text_style(app)));
        }
        let text = format!("{} ({})", tab.title(), counts.for_tab(*tab));
        let style = if *tab == app.filter.tab {
            selection_style(app)
        } else {
            header_text_style(app)
        };
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

fn build_filter_line(app: &App<'_>) -> Line<'static> {
    let style = header_text_style(app);
    let intimacy = app.filter.intimacy.clone().unwrap_or_else(|| "ALL".to_string());
    let group = app.filter.group.clone().unwrap_or_else(|| "ALL".to_string());
    Line::from(vec![
        Span::styled("INTIMACY: ", style),
        Span::raw(intimacy),
        Span::styled("   GROUP: ", style),
        Span::raw(group),
    ])
}

fn draw_results_table(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let rows_data = app.filtered();
    if rows_data.is_empty() {
        let message = if app.session.contacts().is_empty() {
            "No contacts uploaded"
        } else {
            "No contacts match"
        };
        render_centered_words(frame, area, message);
        return;
    }

    let colors = app.ui_colors();
    let rows: Vec<Row> = rows_data
        .iter()
        .map(|row| {
            let contact = row.contact;
            let invited = if contact.is_invited() {
                Span::styled("O", Style::default().fg(color(colors.invited)))
            } else {
                Span::styled("X", Style::default().fg(color(colors.not_invited)))
            };
            Row::new(vec![
                Cell::from(format!("{}", row.index + 1)),
                Cell::from(contact.name.clone()),
                Cell::from(contact.phone.clone()),
                Cell::from(contact.intimacy.clone()),
                Cell::from(contact.group.clone()),
                Cell::from(invited),
            ])
        })
        .collect();

    let header = Row::new(vec!["#", "NAME", "PHONE", "INTIMACY", "GROUP", "INVITED"])
        .style(header_text_style(app).add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(5),
        Constraint::Min(12),
        Constraint::Length(16),
        Constraint::Length(9),
        Constraint::Min(8),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(selection_style(app));

    let mut state = TableState::default().with_selected(Some(app.results_selected));
    frame.render_stateful_widget(table, area, &mut state);
}

// =========================================================================
// Footer and modals
// =========================================================================

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let message: String = if app.editor.active {
        EDITOR_HELP.to_string()
    } else if app.group_modal.is_some() {
        GROUP_MODAL_HELP.to_string()
    } else if let Some(status) = &app.status {
        status.clone()
    } else {
        match app.screen {
            Screen::Review => REVIEW_HELP.to_string(),
            Screen::Results if app.search_focused => SEARCH_HELP_INPUT.to_string(),
            Screen::Results => RESULTS_HELP.to_string(),
        }
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn modal_block<'b>(app: &App<'_>, title: &str, footer: &str) -> Block<'b> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Line::from(Span::styled(format!(" {title} "), header_text_style(app))))
        .title_bottom(Line::from(Span::styled(format!(" {footer} "), header_text_style(app))))
        .title_alignment(Alignment::Center)
}

fn draw_group_modal(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let Some(modal) = &app.group_modal else {
        return;
    };

    let longest = modal
        .options
        .iter()
        .map(|g| Span::raw(g.as_str()).width())
        .max()
        .unwrap_or(0) as u16;
    let width = (longest + 6).max(30);
    let height = (modal.options.len() as u16 + 2).max(5);
    let modal_area = centered_rect(area, width, height);
    frame.render_widget(Clear, modal_area);

    let block = modal_block(app, "GROUP", "a: new");
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let items: Vec<ListItem> = if modal.options.is_empty() {
        vec![ListItem::new(Line::from("No groups yet, press a"))]
    } else {
        modal
            .options
            .iter()
            .map(|g| ListItem::new(Line::from(g.clone())))
            .collect()
    };

    let mut state = ListState::default();
    if !modal.options.is_empty() {
        state.select(Some(modal.selected));
    }
    let list = List::new(items).highlight_style(selection_style(app));
    frame.render_stateful_widget(list, inner, &mut state);
}

fn draw_editor_modal(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    if !app.editor.active {
        return;
    }
    let Some(target) = app.editor.target() else {
        return;
    };

    let width = area.width.saturating_mul(2).saturating_div(3).max(30);
    let modal_area = centered_rect(area, width, 3);
    frame.render_widget(Clear, modal_area);

    let block = modal_block(app, target.title(), EDITOR_HELP);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let label = target.label();
    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::raw(app.editor.value().to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    let column = Span::raw(label).width() + app.editor.visual_cursor();
    frame.set_cursor_position((inner.x.saturating_add(column as u16), inner.y));
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App<'_>) {
    if app.help_modal.is_none() {
        return;
    }

    // 2/3 width, 80% height
    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);
    let modal_area = centered_rect(area, width, height);
    frame.render_widget(Clear, modal_area);

    // Get styles before any mutable borrows
    let header_style = header_text_style(app);
    let border_s = border_style(app);

    let sections = app.help_entries();
    let mut lines: Vec<Line> = Vec::new();
    let content_width = width.saturating_sub(4) as usize;
    let action_width = 20usize;

    for (section_idx, section) in sections.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        let right_pad = padding_total - left_pad;
        let header_line = format!(
            "{}{}{}",
            LINE.horizontal.to_string().repeat(left_pad),
            header_text,
            LINE.horizontal.to_string().repeat(right_pad)
        );
        lines.push(Line::from(Span::styled(header_line, header_style)));

        for entry in &section.entries {
            let action = format!("{:<width$}", entry.action, width = action_width);
            lines.push(Line::from(vec![
                Span::styled(action, Style::default()),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }

        if section_idx < sections.len() - 1 {
            lines.push(Line::from(""));
        }
    }

    let total_lines = lines.len();
    // borders (2) + footer line (1)
    let inner_height = height.saturating_sub(3) as usize;

    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    modal.total_lines = total_lines;
    modal.viewport_height = inner_height;
    let max_scroll = modal.total_lines.saturating_sub(modal.viewport_height);
    if modal.scroll > max_scroll {
        modal.scroll = max_scroll;
    }

    let scroll = modal.scroll;
    let scroll_indicator = match (modal.can_scroll_up(), modal.can_scroll_down()) {
        (true, true) => "▲▼",
        (true, false) => "▲ ",
        (false, true) => " ▼",
        (false, false) => "  ",
    };

    let visible_lines: Vec<Line> = lines
        .into_iter()
        .skip(scroll)
        .take(inner_height)
        .collect();

    let title = Line::from(vec![
        Span::styled(" HELP ", header_style),
        Span::styled(scroll_indicator, header_style),
    ]);
    let footer = Line::from(Span::styled(format!(" {} ", HELP_MODAL_FOOTER), header_style));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(title)
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(visible_lines), inner);
}

fn draw_share_modal(frame: &mut Frame<'_>, area: Rect, app: &App<'_>) {
    let Some(modal) = &app.share_modal else {
        return;
    };

    let qr_width = modal
        .qr_lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as u16;
    let qr_height = modal.qr_lines.len() as u16;

    // The link wraps under the code
    let width = qr_width.max(40).saturating_add(4).min(area.width);
    let link_rows = (modal.link.chars().count() as u16).div_ceil(width.saturating_sub(2).max(1));
    let height = qr_height + link_rows + 3;
    let modal_area = centered_rect(area, width, height);
    frame.render_widget(Clear, modal_area);

    let block = modal_block(app, "SHARE", "Esc: close");
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(qr_height), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    // Dense1x2 draws light modules as blocks, so paint them in the selection color
    let colors = app.ui_colors();
    let qr_style = Style::default()
        .fg(color(colors.selection_bg))
        .bg(Color::Reset);
    let qr_text: Vec<Line> = modal
        .qr_lines
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), qr_style)))
        .collect();
    frame.render_widget(Paragraph::new(qr_text).alignment(Alignment::Center), layout[0]);

    frame.render_widget(
        Paragraph::new(modal.link.clone()).wrap(ratatui::widgets::Wrap { trim: false }),
        layout[2],
    );
}

// =========================================================================
// Styles
// =========================================================================

fn selection_style(app: &App<'_>) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App<'_>) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App<'_>) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App<'_>) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn render_centered_words(frame: &mut Frame<'_>, area: Rect, text: &str) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let mut lines: Vec<Line> = text
        .split_whitespace()
        .map(|word| Line::from(word.to_string()))
        .collect();
    if lines.is_empty() {
        return;
    }
    if lines.len() as u16 > area.height {
        lines.truncate(area.height as usize);
    }

    let height = lines.len() as u16;
    let start_y = area.y + (area.height.saturating_sub(height)) / 2;
    let target = Rect {
        x: area.x,
        y: start_y,
        width: area.width,
        height,
    };
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), target);
}

/// Render a header line with a separator below it.
/// `outer_width` is the full pane width including borders, so the separator
/// joins the side borders.
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    content: Line<'static>,
    app: &App<'_>,
    outer_width: u16,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if area.height == 1 {
        frame.render_widget(Paragraph::new(content), area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);
    frame.render_widget(Paragraph::new(content), layout[0]);

    // ├───┤
    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.to_string().repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, separator_style(app)));

    let separator_area = Rect {
        x: layout[1].x.saturating_sub(1),
        y: layout[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
