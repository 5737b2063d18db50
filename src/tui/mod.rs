//! Ratatui-based dashboard.
//!
//! Three tabs over the artifacts the batch stages wrote: an overview of the
//! dataset and held-out metrics, the explanation (importance chart and
//! insights), and the targeting list next to a single-customer prediction
//! form. Everything is loaded once at startup; nothing here recomputes a
//! stage except scoring the form.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap},
};

use crate::cli::DashboardArgs;
use crate::domain::{AlignMode, RiskBand};
use crate::error::AppError;
use crate::models::{Prediction, predict_customer};
use crate::report::{fmt_pct, truncate};

mod form;
mod plotters_chart;
mod state;

pub use form::{FieldKind, FormField, PredictForm};
pub use state::{DashboardState, TARGETS_SHOWN};

use plotters_chart::ImportanceChart;

/// Features drawn in the importance chart.
const CHART_FEATURES: usize = 12;
/// Insights listed next to the chart.
const INSIGHTS_SHOWN: usize = 6;
/// Encoded rows and columns in the Overview preview.
const PREVIEW_ROWS: usize = 5;
const PREVIEW_COLUMNS: usize = 8;
/// Targeting columns shown when present, in this order.
const TARGET_COLUMNS: [&str; 5] = ["tenure", "MonthlyCharges", "churn_prob", "expected_revenue", "expected_profit"];

/// Load the artifacts and run the dashboard until the user quits.
pub fn run(args: DashboardArgs) -> Result<(), AppError> {
    // Load before touching the terminal so a missing artifact prints normally.
    let state = DashboardState::load(&args)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(state);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Overview,
    Explain,
    Targeting,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Overview, Tab::Explain, Tab::Targeting];

    fn title(self) -> &'static str {
        match self {
            Tab::Overview => "1 Overview",
            Tab::Explain => "2 Explainability",
            Tab::Targeting => "3 Optimize & Predict",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn step(self, delta: isize) -> Tab {
        let n = Tab::ALL.len() as isize;
        Tab::ALL[(self.index() as isize + delta).rem_euclid(n) as usize]
    }
}

struct App {
    state: DashboardState,
    tab: Tab,
    form: PredictForm,
    selected_field: usize,
    status: String,
    prediction: Option<Prediction>,
}

impl App {
    fn new(state: DashboardState) -> Self {
        let form = PredictForm::from_schema(&state.artifact.schema);
        let status = match state.warnings.len() {
            0 => "All artifacts loaded.".to_string(),
            n => format!("{n} artifact(s) missing; see Overview."),
        };
        Self {
            state,
            tab: Tab::Overview,
            form,
            selected_field: 0,
            status,
            prediction: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the dashboard should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.tab = self.tab.step(1),
            KeyCode::BackTab => self.tab = self.tab.step(-1),
            KeyCode::Char('1') => self.tab = Tab::Overview,
            KeyCode::Char('2') => self.tab = Tab::Explain,
            KeyCode::Char('3') => self.tab = Tab::Targeting,
            _ if self.tab == Tab::Targeting => self.handle_form_key(code),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < self.form.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => self.predict(),
            _ => {}
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        self.form.adjust(self.selected_field, delta);
        // Edited inputs invalidate the last score.
        self.prediction = None;
    }

    fn predict(&mut self) {
        match predict_customer(&self.state.artifact, &self.form.to_input(), AlignMode::Tolerant) {
            Ok(p) => {
                self.status = format!("Scored customer: {}", fmt_pct(p.churn_prob));
                self.prediction = Some(p);
            }
            Err(e) => {
                self.status = format!("Prediction failed: {e}");
                self.prediction = None;
            }
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        match self.tab {
            Tab::Overview => self.draw_overview(frame, chunks[1]),
            Tab::Explain => self.draw_explain(frame, chunks[1]),
            Tab::Targeting => self.draw_targeting(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
        let tabs = Tabs::new(titles)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Churn dashboard | {}", self.state.artifact.variant.display_name())),
            )
            .select(self.tab.index())
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn draw_overview(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(10), Constraint::Length(PREVIEW_ROWS as u16 + 3)])
            .split(area);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[0]);

        let s = &self.state;
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Customers: ", Style::default().fg(Color::Gray)),
                Span::raw(s.snapshot.rows.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Features: ", Style::default().fg(Color::Gray)),
                Span::raw(s.snapshot.features.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Churn rate: ", Style::default().fg(Color::Gray)),
                Span::raw(s.snapshot.churn_rate.map(fmt_pct).unwrap_or_else(|| "-".to_string())),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Model: ", Style::default().fg(Color::Gray)),
                Span::raw(s.model_path.display().to_string()),
            ]),
            Line::from(vec![
                Span::styled("Trained: ", Style::default().fg(Color::Gray)),
                Span::raw(s.artifact.trained_at.format("%Y-%m-%d %H:%M UTC").to_string()),
            ]),
        ];
        if !s.warnings.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Missing artifacts:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            for w in &s.warnings {
                lines.push(Line::from(Span::styled(w.as_str(), Style::default().fg(Color::Yellow))));
            }
        }
        let p = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Dataset").borders(Borders::ALL));
        frame.render_widget(p, chunks[0]);

        self.draw_metrics(frame, chunks[1]);
        self.draw_preview(frame, rows[1]);
    }

    fn draw_preview(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let table = &self.state.table;
        let shown = table.columns.len().min(PREVIEW_COLUMNS);
        let header = Row::new(table.columns[..shown].iter().map(|c| Cell::from(truncate(c, 14))))
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = table
            .rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| Row::new(row[..shown].iter().map(|v| Cell::from(format!("{v}")))));
        let widths = vec![Constraint::Length(15); shown];

        let title = format!("First rows ({} of {} columns)", shown, table.columns.len());
        let t = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(t, area);
    }

    fn draw_metrics(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Held-out metrics").borders(Borders::ALL);
        let Some(report) = &self.state.report else {
            let p = Paragraph::new("No train report. Run: churn train")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(p, area);
            return;
        };

        let mut lines = vec![Line::from(Span::styled(
            format!("{:<22}{:>9}{:>9}{:>9}", "variant", "ROC-AUC", "F1", "recall"),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for m in &report.variants {
            let style = if m.variant == self.state.artifact.variant {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{:<22}{:>9.4}{:>9.4}{:>9.4}", m.variant.display_name(), m.roc_auc, m.f1, m.recall),
                style,
            )));
        }
        if let Some(deployed) = report.variant(self.state.artifact.variant) {
            lines.push(Line::from(""));
            lines.extend(deployed.report.render().lines().map(|l| Line::from(l.to_string())));
        }

        let p = Paragraph::new(Text::from(lines)).block(block);
        frame.render_widget(p, area);
    }

    fn draw_explain(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(summary) = &self.state.summary else {
            let p = Paragraph::new("No explanation yet. Run: churn explain")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().title("Explainability").borders(Borders::ALL));
            frame.render_widget(p, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let block = Block::default()
            .title(format!("Feature importance ({})", summary.units.label()))
            .borders(Borders::ALL);
        let inner = block.inner(chunks[0]);
        frame.render_widget(block, chunks[0]);
        frame.render_widget(Clear, inner);
        frame.render_widget(
            ImportanceChart {
                features: summary.top(CHART_FEATURES),
                x_label: "mean |attribution|",
                name_width: 18,
            },
            inner,
        );

        let mut lines: Vec<Line> = vec![Line::from(Span::styled(
            "Red raises churn risk, blue lowers it.",
            Style::default().fg(Color::Gray),
        ))];
        lines.push(Line::from(""));
        for insight in summary.insights(&self.state.artifact.schema, INSIGHTS_SHOWN) {
            lines.push(Line::from(format!("• {insight}")));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Base value: {:.4} over {} customers", summary.base_value, summary.n_rows),
            Style::default().fg(Color::Gray),
        )));
        let plot = match &self.state.png {
            Some(path) => format!("Full plot: {}", path.display()),
            None => "Full plot not rendered.".to_string(),
        };
        lines.push(Line::from(Span::styled(plot, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Insights").borders(Borders::ALL));
        frame.render_widget(p, chunks[1]);
    }

    fn draw_targeting(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(16)])
            .split(area);
        self.draw_targets(frame, chunks[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);
        self.draw_form(frame, bottom[0]);
        self.draw_prediction(frame, bottom[1]);
    }

    fn draw_targets(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!("Top {TARGETS_SHOWN} retention targets");
        let Some(targets) = &self.state.targets else {
            let p = Paragraph::new("No targeting list. Run: churn optimize")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(p, area);
            return;
        };

        let shown: Vec<(&str, usize)> = TARGET_COLUMNS
            .iter()
            .filter_map(|c| targets.column_index(c).map(|i| (*c, i)))
            .collect();

        let header = Row::new(
            std::iter::once(Cell::from("#")).chain(shown.iter().map(|(c, _)| Cell::from(truncate(c, 16)))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = targets.rows.iter().enumerate().map(|(rank, row)| {
            let cells = shown.iter().map(|(column, i)| Cell::from(target_cell(column, row[*i])));
            Row::new(std::iter::once(Cell::from((rank + 1).to_string())).chain(cells))
        });
        let widths = std::iter::once(Constraint::Length(4)).chain(shown.iter().map(|_| Constraint::Length(17)));

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .form
            .fields
            .iter()
            .map(|f| ListItem::new(format!("{:<20} {}", f.label, f.display_value())))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Predict a customer").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.form.is_empty() {
            state.select(Some(self.selected_field));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_prediction(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Churn probability").borders(Borders::ALL);
        let Some(p) = &self.prediction else {
            let hint = Paragraph::new("Adjust the fields, then press Enter.")
                .style(Style::default().fg(Color::Gray))
                .block(block);
            frame.render_widget(hint, area);
            return;
        };

        let mut lines = vec![
            Line::from(Span::styled(
                fmt_pct(p.churn_prob),
                Style::default().fg(band_color(p.band)).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(p.band.label(), Style::default().fg(band_color(p.band)))),
            Line::from(p.band.action()),
        ];
        if !p.ignored.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Ignored: {}", p.ignored.join(", ")),
                Style::default().fg(Color::Gray),
            )));
        }
        let para = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }).block(block);
        frame.render_widget(para, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = match self.tab {
            Tab::Targeting => "Tab/1-3 switch  ↑/↓ select  ←/→ adjust  Enter predict  q quit",
            _ => "Tab/1-3 switch  q quit",
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn target_cell(column: &str, v: f64) -> String {
    match column {
        "churn_prob" => fmt_pct(v),
        "MonthlyCharges" | "expected_revenue" | "expected_profit" => format!("${v:.2}"),
        _ => format!("{v}"),
    }
}

fn band_color(band: RiskBand) -> Color {
    match band {
        RiskBand::High => Color::Red,
        RiskBand::Medium => Color::Yellow,
        RiskBand::Low => Color::Green,
    }
}
